//! Workout domain types: sessions, plan days, sets, and the weekly schedule

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{LiftlogError, Result};

/// Broad category used for workout-mix statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Weights,
    Cardio,
    Mobility,
}

impl WorkoutType {
    pub const ALL: [WorkoutType; 3] = [
        WorkoutType::Weights,
        WorkoutType::Cardio,
        WorkoutType::Mobility,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WorkoutType::Weights => "weights",
            WorkoutType::Cardio => "cardio",
            WorkoutType::Mobility => "mobility",
        }
    }
}

/// What kind of workout a session records.
///
/// Weights sessions follow a structured plan day; cardio and mobility
/// sessions are instances of a reusable template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "session_type", rename_all = "snake_case")]
pub enum SessionKind {
    Weights {
        day_id: String,
        day_name: String,
    },
    Cardio {
        template_id: String,
        template_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance_km: Option<f64>,
    },
    Mobility {
        template_id: String,
        template_name: String,
    },
}

impl SessionKind {
    pub fn workout_type(&self) -> WorkoutType {
        match self {
            SessionKind::Weights { .. } => WorkoutType::Weights,
            SessionKind::Cardio { .. } => WorkoutType::Cardio,
            SessionKind::Mobility { .. } => WorkoutType::Mobility,
        }
    }

    /// Plan day or template name, for display
    pub fn title(&self) -> &str {
        match self {
            SessionKind::Weights { day_name, .. } => day_name,
            SessionKind::Cardio { template_name, .. }
            | SessionKind::Mobility { template_name, .. } => template_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub kind: SessionKind,
}

impl Session {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn workout_type(&self) -> WorkoutType {
        self.kind.workout_type()
    }

    /// Start date in the local timezone, so calendar matching follows the
    /// user's own days rather than UTC.
    pub fn local_date(&self) -> NaiveDate {
        self.started_at.with_timezone(&Local).date_naive()
    }
}

/// A single exercise within a plan day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub target_sets: u32,
    pub target_reps: u32,
    #[serde(default)]
    pub rest_seconds: u32,
}

/// A structured plan day (weights)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutDay {
    pub id: String,
    pub name: String,
    /// 1..=7 position in the repeating weekly cycle
    pub cycle_day: u8,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl WorkoutDay {
    pub fn exercise(&self, exercise_id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == exercise_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSet {
    pub id: String,
    pub exercise_id: String,
    pub set_number: u32,
    pub reps: u32,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

/// A workout placed on a cycle day of the weekly schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledWorkout {
    pub name: String,
    pub workout_type: WorkoutType,
}

/// What the schedule says about one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleProjection {
    Rest,
    Workout(ScheduledWorkout),
}

impl ScheduleProjection {
    pub fn is_workout(&self) -> bool {
        matches!(self, ScheduleProjection::Workout(_))
    }
}

/// The user's repeating seven-day cycle.
///
/// Cycle days count from `start_date`, not from the calendar weekday, so a
/// cycle that began on a Thursday has cycle day 1 on every seventh Thursday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeeklySchedule")]
pub struct WeeklySchedule {
    pub start_date: NaiveDate,
    /// cycle day (1..=7) → workout; missing cycle days are rest days
    pub slots: BTreeMap<u8, ScheduledWorkout>,
}

/// Unchecked schedule as read from JSON
#[derive(Deserialize)]
struct RawWeeklySchedule {
    start_date: NaiveDate,
    #[serde(default)]
    slots: BTreeMap<u8, ScheduledWorkout>,
}

impl TryFrom<RawWeeklySchedule> for WeeklySchedule {
    type Error = LiftlogError;

    fn try_from(raw: RawWeeklySchedule) -> Result<Self> {
        raw.slots
            .into_iter()
            .try_fold(WeeklySchedule::new(raw.start_date), |schedule, (day, workout)| {
                schedule.with_slot(day, workout)
            })
    }
}

impl WeeklySchedule {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            slots: BTreeMap::new(),
        }
    }

    /// Every cycle day is a workout day
    pub fn daily(start_date: NaiveDate) -> Self {
        let slots = (1..=7)
            .map(|d| {
                (
                    d,
                    ScheduledWorkout {
                        name: "Workout".into(),
                        workout_type: WorkoutType::Weights,
                    },
                )
            })
            .collect();
        Self { start_date, slots }
    }

    pub fn with_slot(mut self, cycle_day: u8, workout: ScheduledWorkout) -> Result<Self> {
        if !(1..=7).contains(&cycle_day) {
            return Err(LiftlogError::Parse(format!(
                "cycle day must be 1-7, got {}",
                cycle_day
            )));
        }
        self.slots.insert(cycle_day, workout);
        Ok(self)
    }

    /// Cycle day (1..=7) for a calendar date. Dates before the start date
    /// wrap backwards, so the cycle extends in both directions.
    pub fn cycle_day_for(&self, date: NaiveDate) -> u8 {
        let offset = date.signed_duration_since(self.start_date).num_days();
        (offset.rem_euclid(7) + 1) as u8
    }

    pub fn projection_for(&self, date: NaiveDate) -> ScheduleProjection {
        match self.slots.get(&self.cycle_day_for(date)) {
            Some(workout) => ScheduleProjection::Workout(workout.clone()),
            None => ScheduleProjection::Rest,
        }
    }
}

/// One calendar date with its schedule projection and logged sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub projection: Option<ScheduleProjection>,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

impl CalendarDay {
    pub fn is_scheduled(&self) -> bool {
        self.projection
            .as_ref()
            .is_some_and(ScheduleProjection::is_workout)
    }

    pub fn is_completed(&self) -> bool {
        self.sessions.iter().any(Session::is_completed)
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }
}

// ========== database rows ==========

/// Flat `workout_sessions` row as returned by the hosted database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub session_type: String,
    #[serde(default)]
    pub workout_day_id: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TryFrom<SessionRow> for Session {
    type Error = LiftlogError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let missing = |field: &str| {
            LiftlogError::Parse(format!(
                "{} session {} has no {}",
                row.session_type, row.id, field
            ))
        };
        let name = row.name.clone().unwrap_or_default();

        let kind = match row.session_type.as_str() {
            "weights" => SessionKind::Weights {
                day_id: row
                    .workout_day_id
                    .clone()
                    .ok_or_else(|| missing("workout_day_id"))?,
                day_name: name,
            },
            "cardio" => SessionKind::Cardio {
                template_id: row
                    .template_id
                    .clone()
                    .ok_or_else(|| missing("template_id"))?,
                template_name: name,
                distance_km: row.distance_km,
            },
            "mobility" => SessionKind::Mobility {
                template_id: row
                    .template_id
                    .clone()
                    .ok_or_else(|| missing("template_id"))?,
                template_name: name,
            },
            other => {
                return Err(LiftlogError::Parse(format!(
                    "unknown session type: {}",
                    other
                )))
            }
        };

        Ok(Session {
            id: row.id,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_seconds: row.duration_seconds,
            notes: row.notes,
            kind,
        })
    }
}

/// Flat `workout_sets` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRow {
    pub id: String,
    pub session_id: String,
    pub exercise_id: String,
    pub set_number: u32,
    pub reps: u32,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

impl From<SetRow> for CompletedSet {
    fn from(row: SetRow) -> Self {
        CompletedSet {
            id: row.id,
            exercise_id: row.exercise_id,
            set_number: row.set_number,
            reps: row.reps,
            weight_kg: row.weight_kg,
            completed_at: row.completed_at,
        }
    }
}
