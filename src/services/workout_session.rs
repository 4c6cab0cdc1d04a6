//! Optimistic workout workflow
//!
//! Starts, logs and completes the active workout. Each write goes to the
//! hosted database first; a network failure parks it in the offline queue
//! and the caller gets a provisional entity carrying the client id instead.

use chrono::Utc;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::services::offline_queue::OfflineQueue;
use crate::services::toast::{ToastLevel, ToastStore};
use crate::services::{WorkoutApi, WorkoutStore};
use crate::types::{
    is_client_id, CompleteSessionPayload, CompletedSet, LiftlogError, LogSetPayload, Mutation,
    Result, Session, SessionKind, StartSessionPayload, WorkoutDay,
};

const QUEUED_MESSAGE: &str = "Saved offline. Will sync when you're back online.";

/// Where a write ended up
enum Outcome<T> {
    Sent(T),
    Queued(String),
}

pub struct WorkoutSessionService<A: ?Sized> {
    api: Arc<A>,
    queue: Arc<OfflineQueue>,
    store: WorkoutStore,
    toasts: Arc<Mutex<ToastStore>>,
}

impl<A: WorkoutApi + ?Sized> WorkoutSessionService<A> {
    pub fn new(api: Arc<A>, queue: Arc<OfflineQueue>, store: WorkoutStore) -> Self {
        Self {
            api,
            queue,
            store,
            toasts: Arc::new(Mutex::new(ToastStore::new())),
        }
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    pub fn store(&self) -> &WorkoutStore {
        &self.store
    }

    pub fn toasts(&self) -> MutexGuard<'_, ToastStore> {
        self.toasts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Send `mutation` through `send`, or queue it.
    ///
    /// Writes that reference an entity still waiting in the queue are queued
    /// directly so they replay after it. Non-network errors propagate.
    async fn attempt<T, F, Fut>(&self, mutation: Mutation, send: F) -> Result<Outcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if mutation.referenced_id().is_some_and(is_client_id) {
            let client_id = self.queue.enqueue(mutation);
            self.toasts().show(QUEUED_MESSAGE, ToastLevel::Info);
            return Ok(Outcome::Queued(client_id));
        }

        match send().await {
            Ok(value) => Ok(Outcome::Sent(value)),
            Err(err) if err.is_network() => {
                tracing::warn!(kind = mutation.label(), error = %err, "offline, queuing write");
                let client_id = self.queue.enqueue(mutation);
                self.toasts().show(QUEUED_MESSAGE, ToastLevel::Info);
                Ok(Outcome::Queued(client_id))
            }
            Err(err) => {
                tracing::error!(kind = mutation.label(), error = %err, "write rejected");
                self.toasts().show(err.to_string(), ToastLevel::Error);
                Err(err)
            }
        }
    }

    /// Begin a workout and make it the active session.
    /// Any previous in-progress state is cleared first.
    pub async fn start_session(&self, kind: SessionKind, day: Option<WorkoutDay>) -> Result<Session> {
        let payload = StartSessionPayload {
            kind,
            started_at: Utc::now(),
        };

        let outcome = self
            .attempt(Mutation::StartSession(payload.clone()), || {
                self.api.start_session(&payload)
            })
            .await?;
        let session = match outcome {
            Outcome::Sent(session) => session,
            Outcome::Queued(client_id) => Session {
                id: client_id,
                started_at: payload.started_at,
                completed_at: None,
                duration_seconds: None,
                notes: None,
                kind: payload.kind,
            },
        };

        self.store.clear_workout();
        self.store.set_active_day(day);
        self.store.set_active_session(Some(session.clone()));
        Ok(session)
    }

    /// Record a set for the active session
    pub async fn log_set(
        &self,
        exercise_id: &str,
        reps: u32,
        weight_kg: Option<f64>,
    ) -> Result<CompletedSet> {
        let active = self
            .store
            .active_session()
            .ok_or(LiftlogError::NoActiveSession)?;

        let payload = LogSetPayload {
            session_id: self.queue.resolve_id(&active.id),
            exercise_id: exercise_id.to_string(),
            set_number: self.store.next_set_number(exercise_id),
            reps,
            weight_kg,
            completed_at: Utc::now(),
        };

        let outcome = self
            .attempt(Mutation::LogSet(payload.clone()), || self.api.log_set(&payload))
            .await?;
        let set = match outcome {
            Outcome::Sent(set) => set,
            Outcome::Queued(client_id) => CompletedSet {
                id: client_id,
                exercise_id: payload.exercise_id,
                set_number: payload.set_number,
                reps: payload.reps,
                weight_kg: payload.weight_kg,
                completed_at: payload.completed_at,
            },
        };

        self.store.add_completed_set(set.clone());

        let rest = self
            .store
            .active_day()
            .and_then(|d| d.exercise(exercise_id).map(|e| e.rest_seconds))
            .unwrap_or(0);
        if rest > 0 {
            self.store.start_rest_timer(rest);
        }
        Ok(set)
    }

    /// Finish the active session and clear the in-progress state
    pub async fn complete_session(&self, notes: Option<String>) -> Result<Session> {
        let active = self
            .store
            .active_session()
            .ok_or(LiftlogError::NoActiveSession)?;

        let completed_at = Utc::now();
        let duration = (completed_at - active.started_at).num_seconds().max(0);
        let payload = CompleteSessionPayload {
            session_id: self.queue.resolve_id(&active.id),
            completed_at,
            duration_seconds: Some(u32::try_from(duration).unwrap_or(u32::MAX)),
            notes,
        };

        let outcome = self
            .attempt(Mutation::CompleteSession(payload.clone()), || {
                self.api.complete_session(&payload)
            })
            .await?;
        let session = match outcome {
            Outcome::Sent(session) => session,
            Outcome::Queued(_) => Session {
                id: payload.session_id,
                completed_at: Some(payload.completed_at),
                duration_seconds: payload.duration_seconds,
                notes: payload.notes,
                ..active
            },
        };

        self.store.clear_workout();
        Ok(session)
    }
}
