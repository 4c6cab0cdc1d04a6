//! Offline mutation types
//!
//! A `QueuedMutation` records a write the user made while the hosted
//! database was unreachable, together with the provisional client id that
//! stands in for the entity until the server assigns a real one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionKind;

/// Prefix that marks an id as client-generated and not yet confirmed
pub const CLIENT_ID_PREFIX: &str = "local-";

/// Generate a fresh client id for an optimistic entity
pub fn new_client_id() -> String {
    format!("{}{}", CLIENT_ID_PREFIX, uuid::Uuid::new_v4())
}

/// Whether an id was generated locally (and may still need resolving)
pub fn is_client_id(id: &str) -> bool {
    id.starts_with(CLIENT_ID_PREFIX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSessionPayload {
    pub kind: SessionKind,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteSessionPayload {
    pub session_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSetPayload {
    pub session_id: String,
    pub exercise_id: String,
    pub set_number: u32,
    pub reps: u32,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

/// A write that can be replayed against the hosted database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Mutation {
    StartSession(StartSessionPayload),
    CompleteSession(CompleteSessionPayload),
    LogSet(LogSetPayload),
}

impl Mutation {
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::StartSession(_) => "start-session",
            Mutation::CompleteSession(_) => "complete-session",
            Mutation::LogSet(_) => "log-set",
        }
    }

    /// Entity id this mutation refers to, if any
    pub fn referenced_id(&self) -> Option<&str> {
        match self {
            Mutation::StartSession(_) => None,
            Mutation::CompleteSession(p) => Some(&p.session_id),
            Mutation::LogSet(p) => Some(&p.session_id),
        }
    }

    /// Rewrite referenced ids through `resolve`
    pub fn map_ids(&mut self, resolve: impl Fn(&str) -> String) {
        match self {
            Mutation::StartSession(_) => {}
            Mutation::CompleteSession(p) => p.session_id = resolve(&p.session_id),
            Mutation::LogSet(p) => p.session_id = resolve(&p.session_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    /// Waiting for the next replay
    Pending,
    /// Being re-issued right now
    Syncing,
    /// Last attempt was rejected by the server; still retried on later replays
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMutation {
    pub client_id: String,
    #[serde(flatten)]
    pub mutation: Mutation,
    pub status: MutationStatus,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl QueuedMutation {
    pub fn new(mutation: Mutation) -> Self {
        Self {
            client_id: new_client_id(),
            mutation,
            status: MutationStatus::Pending,
            enqueued_at: Utc::now(),
            attempts: 0,
            last_error: None,
        }
    }
}
