//! Aggregator for training statistics over calendar days

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::types::{CalendarDay, WorkoutType};

/// Share of completed sessions for one workout type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutMix {
    pub workout_type: WorkoutType,
    pub count: u32,
    /// Integer percent of all completed sessions
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutStats {
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub scheduled_days: u32,
    pub completed_days: u32,
    /// Integer percent of scheduled days that were completed
    pub completion_rate: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    /// Completed sessions per weekday, Monday first
    pub weekday_counts: [u32; 7],
    pub completed_sessions: u32,
    pub total_duration_seconds: u64,
    pub average_duration_seconds: u64,
    pub mix: Vec<WorkoutMix>,
}

/// How a day affects a streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayOutcome {
    Done,
    Missed,
    /// Rest, unscheduled, today-not-yet-done or future
    Neutral,
}

fn outcome(day: &CalendarDay, today: NaiveDate) -> DayOutcome {
    if day.is_completed() {
        DayOutcome::Done
    } else if day.is_scheduled() && day.date < today {
        DayOutcome::Missed
    } else {
        DayOutcome::Neutral
    }
}

/// Integer percent, rounded; 0 when `whole` is 0
fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) * 100.0 / f64::from(whole)).round() as u32
}

fn sorted(days: &[CalendarDay]) -> Vec<&CalendarDay> {
    let mut refs: Vec<&CalendarDay> = days.iter().collect();
    refs.sort_by_key(|d| d.date);
    refs
}

/// Aggregator for computing workout statistics
pub struct Aggregator;

impl Aggregator {
    /// Every statistic for the period at once
    pub fn stats(days: &[CalendarDay], today: NaiveDate) -> WorkoutStats {
        let (scheduled_days, completed_days) = Self::scheduled_and_completed(days, today);
        let (completed_sessions, total_duration_seconds, average_duration_seconds) =
            Self::durations(days);

        WorkoutStats {
            period_start: days.iter().map(|d| d.date).min(),
            period_end: days.iter().map(|d| d.date).max(),
            scheduled_days,
            completed_days,
            completion_rate: percent(completed_days, scheduled_days),
            current_streak: Self::current_streak(days, today),
            best_streak: Self::best_streak(days, today),
            weekday_counts: Self::weekday_histogram(days),
            completed_sessions,
            total_duration_seconds,
            average_duration_seconds,
            mix: Self::workout_mix(days),
        }
    }

    /// (scheduled days up to today, how many of those were completed)
    pub fn scheduled_and_completed(days: &[CalendarDay], today: NaiveDate) -> (u32, u32) {
        days.iter()
            .filter(|d| d.date <= today && d.is_scheduled())
            .fold((0, 0), |(scheduled, completed), d| {
                (scheduled + 1, completed + u32::from(d.is_completed()))
            })
    }

    /// Completed / scheduled as an integer percent
    pub fn completion_rate(days: &[CalendarDay], today: NaiveDate) -> u32 {
        let (scheduled, completed) = Self::scheduled_and_completed(days, today);
        percent(completed, scheduled)
    }

    /// Walk back from today; stop at the first scheduled day that was missed.
    /// Rest and unscheduled days neither extend nor break the streak, and an
    /// unfinished today does not break it.
    pub fn current_streak(days: &[CalendarDay], today: NaiveDate) -> u32 {
        let mut streak = 0;
        for day in sorted(days).into_iter().rev() {
            if day.date > today {
                continue;
            }
            match outcome(day, today) {
                DayOutcome::Done => streak += 1,
                DayOutcome::Missed => break,
                DayOutcome::Neutral => {}
            }
        }
        streak
    }

    /// Longest run within the period, by the same rules as the current streak
    pub fn best_streak(days: &[CalendarDay], today: NaiveDate) -> u32 {
        let mut best = 0;
        let mut run = 0;
        for day in sorted(days) {
            match outcome(day, today) {
                DayOutcome::Done => {
                    run += 1;
                    best = best.max(run);
                }
                DayOutcome::Missed => run = 0,
                DayOutcome::Neutral => {}
            }
        }
        best
    }

    /// Completed sessions per weekday (Monday = index 0)
    pub fn weekday_histogram(days: &[CalendarDay]) -> [u32; 7] {
        let mut counts = [0u32; 7];
        for day in days {
            let n = day.sessions.iter().filter(|s| s.is_completed()).count() as u32;
            counts[day.date.weekday().num_days_from_monday() as usize] += n;
        }
        counts
    }

    /// (completed sessions, total seconds, average seconds per timed session)
    pub fn durations(days: &[CalendarDay]) -> (u32, u64, u64) {
        let mut completed: u32 = 0;
        let mut timed: u64 = 0;
        let mut total: u64 = 0;

        for session in days.iter().flat_map(|d| &d.sessions) {
            if !session.is_completed() {
                continue;
            }
            completed = completed.saturating_add(1);
            if let Some(secs) = session.duration_seconds {
                total = total.saturating_add(u64::from(secs));
                timed += 1;
            }
        }

        let average = if timed == 0 { 0 } else { total / timed };
        (completed, total, average)
    }

    /// Completed sessions per workout type, in `WorkoutType::ALL` order
    pub fn workout_mix(days: &[CalendarDay]) -> Vec<WorkoutMix> {
        let mut counts = [0u32; 3];
        for session in days.iter().flat_map(|d| &d.sessions) {
            if session.is_completed() {
                let idx = WorkoutType::ALL
                    .iter()
                    .position(|t| *t == session.workout_type())
                    .unwrap_or(0);
                counts[idx] += 1;
            }
        }
        let total: u32 = counts.iter().sum();

        WorkoutType::ALL
            .iter()
            .zip(counts)
            .map(|(workout_type, count)| WorkoutMix {
                workout_type: *workout_type,
                count,
                percent: percent(count, total),
            })
            .collect()
    }
}
