//! In-progress workout state
//!
//! `WorkoutStore` is a cloneable handle to one owned `WorkoutState`. Every
//! change is published to subscribers, which receive the whole state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::types::{CompletedSet, Session, WorkoutDay};

/// Rest countdown between sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestTimer {
    pub seconds: u32,
    pub initial_seconds: u32,
    pub active: bool,
}

/// Everything about the workout in progress. Serializable so a workout can
/// span several CLI invocations; the rest timer is not carried over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutState {
    pub active_session: Option<Session>,
    pub active_day: Option<WorkoutDay>,
    /// exercise id → sets in completion order. Lists are replaced, never
    /// edited, so an `Arc` handed out earlier keeps its contents.
    #[serde(default)]
    pub completed_sets: HashMap<String, Arc<Vec<CompletedSet>>>,
    #[serde(skip)]
    pub rest_timer: RestTimer,
}

#[derive(Debug, Clone)]
pub struct WorkoutStore {
    tx: Arc<watch::Sender<WorkoutState>>,
}

impl Default for WorkoutStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkoutStore {
    pub fn new() -> Self {
        Self::from_state(WorkoutState::default())
    }

    /// Resume from a saved state
    pub fn from_state(state: WorkoutState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    /// Receive a notification after every change
    pub fn subscribe(&self) -> watch::Receiver<WorkoutState> {
        self.tx.subscribe()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> WorkoutState {
        self.tx.borrow().clone()
    }

    fn update(&self, f: impl FnOnce(&mut WorkoutState)) {
        self.tx.send_modify(f);
    }

    // ========== session / day ==========

    pub fn active_session(&self) -> Option<Session> {
        self.tx.borrow().active_session.clone()
    }

    pub fn set_active_session(&self, session: Option<Session>) {
        self.update(|s| s.active_session = session);
    }

    pub fn active_day(&self) -> Option<WorkoutDay> {
        self.tx.borrow().active_day.clone()
    }

    pub fn set_active_day(&self, day: Option<WorkoutDay>) {
        self.update(|s| s.active_day = day);
    }

    // ========== sets ==========

    /// Sets completed for one exercise; empty when none
    pub fn completed_sets(&self, exercise_id: &str) -> Arc<Vec<CompletedSet>> {
        self.tx
            .borrow()
            .completed_sets
            .get(exercise_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn add_completed_set(&self, set: CompletedSet) {
        self.update(|s| {
            let existing = s.completed_sets.get(&set.exercise_id);
            let mut next = Vec::with_capacity(existing.map_or(1, |v| v.len() + 1));
            if let Some(existing) = existing {
                next.extend(existing.iter().cloned());
            }
            let key = set.exercise_id.clone();
            next.push(set);
            s.completed_sets.insert(key, Arc::new(next));
        });
    }

    pub fn total_completed_sets(&self) -> usize {
        self.tx
            .borrow()
            .completed_sets
            .values()
            .map(|v| v.len())
            .sum()
    }

    /// Set number the next set of this exercise gets (1-based)
    pub fn next_set_number(&self, exercise_id: &str) -> u32 {
        self.completed_sets(exercise_id).len() as u32 + 1
    }

    // ========== rest timer ==========

    pub fn rest_timer(&self) -> RestTimer {
        self.tx.borrow().rest_timer
    }

    pub fn is_rest_timer_active(&self) -> bool {
        self.tx.borrow().rest_timer.active
    }

    pub fn start_rest_timer(&self, seconds: u32) {
        self.update(|s| {
            s.rest_timer = RestTimer {
                seconds,
                initial_seconds: seconds,
                active: seconds > 0,
            }
        });
    }

    pub fn pause_rest_timer(&self) {
        self.update(|s| s.rest_timer.active = false);
    }

    /// Resume counting; a timer already at zero stays stopped
    pub fn resume_rest_timer(&self) {
        self.update(|s| s.rest_timer.active = s.rest_timer.seconds > 0);
    }

    /// Back to the initial value, stopped
    pub fn reset_rest_timer(&self) {
        self.update(|s| {
            s.rest_timer.seconds = s.rest_timer.initial_seconds;
            s.rest_timer.active = false;
        });
    }

    /// One tick down, clamped at zero. Reaching zero stops the timer; a
    /// paused timer still counts down but is never reactivated here.
    pub fn decrement_rest_timer(&self) {
        self.update(|s| {
            let timer = &mut s.rest_timer;
            timer.seconds = timer.seconds.saturating_sub(1);
            if timer.seconds == 0 {
                timer.active = false;
            }
        });
    }

    /// Reset every field to its zero value in one change
    pub fn clear_workout(&self) {
        self.update(|s| *s = WorkoutState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionKind;
    use chrono::Utc;

    fn set(exercise_id: &str, n: u32) -> CompletedSet {
        CompletedSet {
            id: format!("set-{}-{}", exercise_id, n),
            exercise_id: exercise_id.into(),
            set_number: n,
            reps: 10,
            weight_kg: Some(40.0),
            completed_at: Utc::now(),
        }
    }

    fn session() -> Session {
        Session {
            id: "session-1".into(),
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            notes: None,
            kind: SessionKind::Weights {
                day_id: "day-a".into(),
                day_name: "Pull".into(),
            },
        }
    }

    // ========== completed set tests ==========

    #[test]
    fn test_add_completed_set_counts_per_exercise() {
        let store = WorkoutStore::new();
        for n in 1..=3 {
            store.add_completed_set(set("row", n));
        }
        store.add_completed_set(set("curl", 1));

        assert_eq!(store.completed_sets("row").len(), 3);
        assert_eq!(store.completed_sets("curl").len(), 1);
        assert!(store.completed_sets("squat").is_empty());
        assert_eq!(store.total_completed_sets(), 4);
        assert_eq!(store.next_set_number("row"), 4);
    }

    #[test]
    fn test_add_completed_set_never_mutates_old_snapshot() {
        let store = WorkoutStore::new();
        store.add_completed_set(set("row", 1));
        let before = store.completed_sets("row");

        store.add_completed_set(set("row", 2));

        assert_eq!(before.len(), 1);
        assert_eq!(store.completed_sets("row").len(), 2);
        assert!(!Arc::ptr_eq(&before, &store.completed_sets("row")));
    }

    // ========== rest timer tests ==========

    #[test]
    fn test_decrement_from_one_stops_timer() {
        let store = WorkoutStore::new();
        store.start_rest_timer(1);
        assert!(store.is_rest_timer_active());

        store.decrement_rest_timer();
        assert_eq!(store.rest_timer().seconds, 0);
        assert!(!store.is_rest_timer_active());
    }

    #[test]
    fn test_decrement_at_zero_stays_zero() {
        let store = WorkoutStore::new();
        store.decrement_rest_timer();
        let timer = store.rest_timer();
        assert_eq!(timer.seconds, 0);
        assert!(!timer.active);
    }

    #[test]
    fn test_decrement_while_paused_does_not_reactivate() {
        let store = WorkoutStore::new();
        store.start_rest_timer(90);
        store.pause_rest_timer();

        store.decrement_rest_timer();
        let timer = store.rest_timer();
        assert_eq!(timer.seconds, 89);
        assert_eq!(timer.initial_seconds, 90);
        assert!(!timer.active);
    }

    #[test]
    fn test_resume_and_reset() {
        let store = WorkoutStore::new();
        store.start_rest_timer(60);
        store.decrement_rest_timer();
        store.pause_rest_timer();
        store.resume_rest_timer();
        assert!(store.is_rest_timer_active());

        store.reset_rest_timer();
        let timer = store.rest_timer();
        assert_eq!(timer.seconds, 60);
        assert!(!timer.active);

        store.start_rest_timer(0);
        store.resume_rest_timer();
        assert!(!store.is_rest_timer_active());
    }

    // ========== clear_workout tests ==========

    #[test]
    fn test_clear_workout_resets_everything() {
        let store = WorkoutStore::new();
        store.set_active_session(Some(session()));
        store.set_active_day(Some(WorkoutDay {
            id: "day-a".into(),
            name: "Pull".into(),
            cycle_day: 2,
            exercises: Vec::new(),
        }));
        store.add_completed_set(set("row", 1));
        store.start_rest_timer(45);

        store.clear_workout();

        assert!(store.active_session().is_none());
        assert!(store.active_day().is_none());
        assert!(store.completed_sets("row").is_empty());
        assert_eq!(store.rest_timer(), RestTimer::default());
        assert_eq!(store.snapshot(), WorkoutState::default());

        // Idempotent
        store.clear_workout();
        assert_eq!(store.snapshot(), WorkoutState::default());
    }

    #[test]
    fn test_state_survives_json_without_rest_timer() {
        let store = WorkoutStore::new();
        store.set_active_session(Some(session()));
        store.add_completed_set(set("row", 1));
        store.add_completed_set(set("row", 2));
        store.start_rest_timer(60);

        let json = serde_json::to_string(&store.snapshot()).unwrap();
        let restored = WorkoutStore::from_state(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.active_session().unwrap().id, "session-1");
        assert_eq!(restored.next_set_number("row"), 3);
        assert_eq!(restored.rest_timer(), RestTimer::default());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = WorkoutStore::new();
        let mut rx = store.subscribe();
        store.start_rest_timer(30);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().rest_timer.seconds, 30);
    }
}
