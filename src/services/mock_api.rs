//! In-memory `WorkoutApi` for tests.
//!
//! Can be switched offline (every call fails with a network error) or told
//! to reject specific operations, and records every request it served.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::services::WorkoutApi;
use crate::types::{
    CompleteSessionPayload, CompletedSet, LiftlogError, LogSetPayload, Result, Session,
    StartSessionPayload,
};

/// A request the mock served successfully
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    StartSession(String),
    CompleteSession(String),
    LogSet { set_id: String, session_id: String },
}

#[derive(Default)]
pub struct MockWorkoutApi {
    offline: AtomicBool,
    next_id: AtomicU32,
    /// Operation labels ("start-session", ...) that answer with HTTP 422
    rejected: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<RecordedCall>>,
    sessions: Mutex<Vec<Session>>,
}

impl MockWorkoutApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn reject(&self, label: &'static str) {
        self.rejected.lock().unwrap().insert(label);
    }

    pub fn accept(&self, label: &'static str) {
        self.rejected.lock().unwrap().remove(label);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, label: &'static str) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LiftlogError::Network("connection refused".into()));
        }
        if self.rejected.lock().unwrap().contains(label) {
            return Err(LiftlogError::Rejected {
                status: 422,
                message: format!("{} rejected", label),
            });
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl WorkoutApi for MockWorkoutApi {
    async fn start_session(&self, payload: &StartSessionPayload) -> Result<Session> {
        self.check("start-session")?;
        let id = self.next_id("session");
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall::StartSession(id.clone()));
        let session = Session {
            id,
            started_at: payload.started_at,
            completed_at: None,
            duration_seconds: None,
            notes: None,
            kind: payload.kind.clone(),
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn complete_session(&self, payload: &CompleteSessionPayload) -> Result<Session> {
        self.check("complete-session")?;
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == payload.session_id)
            .ok_or_else(|| LiftlogError::Rejected {
                status: 404,
                message: format!("session {} not found", payload.session_id),
            })?;
        session.completed_at = Some(payload.completed_at);
        session.duration_seconds = payload.duration_seconds;
        session.notes = payload.notes.clone();
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall::CompleteSession(payload.session_id.clone()));
        Ok(session.clone())
    }

    async fn log_set(&self, payload: &LogSetPayload) -> Result<CompletedSet> {
        self.check("log-set")?;
        let set_id = self.next_id("set");
        self.calls.lock().unwrap().push(RecordedCall::LogSet {
            set_id: set_id.clone(),
            session_id: payload.session_id.clone(),
        });
        Ok(CompletedSet {
            id: set_id,
            exercise_id: payload.exercise_id.clone(),
            set_number: payload.set_number,
            reps: payload.reps,
            weight_kg: payload.weight_kg,
            completed_at: payload.completed_at,
        })
    }

    async fn list_sessions(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Session>> {
        self.check("list-sessions")?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.started_at >= from && s.started_at < to)
            .cloned()
            .collect())
    }
}
