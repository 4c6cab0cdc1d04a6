//! Offline mutation queue with optimistic id resolution
//!
//! Writes that fail with a network-class error are parked here under a
//! client-generated id. The caller keeps using that id; `resolve_id` turns
//! it into the server id once a replay has pushed the write through.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::services::WorkoutApi;
use crate::types::{is_client_id, Mutation, MutationStatus, QueuedMutation, Result};

/// Serializable queue contents (entries + id map)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueContents {
    pub entries: Vec<QueuedMutation>,
    #[serde(default)]
    pub id_map: HashMap<String, String>,
}

/// Outcome of one replay pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Entries the server acknowledged (removed from the queue)
    pub synced: usize,
    /// Entries the server rejected (kept, marked failed)
    pub rejected: usize,
    /// Entries skipped because they depend on a still-queued entity
    pub deferred: usize,
    /// Entries still queued after the pass
    pub remaining: usize,
    /// Pass stopped early on a network failure
    pub interrupted: bool,
    /// Another replay was already running; nothing was done
    pub skipped: bool,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<QueuedMutation>,
    id_map: HashMap<String, String>,
}

/// FIFO queue of mutations waiting for connectivity
#[derive(Debug, Default)]
pub struct OfflineQueue {
    state: Mutex<QueueState>,
    replay_guard: tokio::sync::Mutex<()>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a queue from persisted contents.
    /// Entries caught mid-sync go back to pending.
    pub fn restore(contents: QueueContents) -> Self {
        let entries = contents
            .entries
            .into_iter()
            .map(|mut e| {
                if e.status == MutationStatus::Syncing {
                    e.status = MutationStatus::Pending;
                }
                e
            })
            .collect();
        Self {
            state: Mutex::new(QueueState {
                entries,
                id_map: contents.id_map,
            }),
            replay_guard: tokio::sync::Mutex::new(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a mutation and return the client id that stands in for its entity
    pub fn enqueue(&self, mutation: Mutation) -> String {
        let entry = QueuedMutation::new(mutation);
        let client_id = entry.client_id.clone();
        tracing::info!(
            client_id = %client_id,
            kind = entry.mutation.label(),
            "queued mutation for offline replay"
        );
        self.state().entries.push_back(entry);
        client_id
    }

    /// Best-known server id for `id`; unknown ids come back unchanged
    pub fn resolve_id(&self, id: &str) -> String {
        self.state()
            .id_map
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    pub fn record_mapping(&self, client_id: &str, server_id: &str) {
        self.state()
            .id_map
            .insert(client_id.to_string(), server_id.to_string());
    }

    pub fn pending_count(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }

    /// Snapshot of queued entries in insertion order
    pub fn entries(&self) -> Vec<QueuedMutation> {
        self.state().entries.iter().cloned().collect()
    }

    /// Drop every queued entry. Known id mappings are kept so entities that
    /// already synced still resolve. Returns the number of entries dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.state();
        let dropped = state.entries.len();
        state.entries.clear();
        dropped
    }

    pub fn snapshot(&self) -> QueueContents {
        let state = self.state();
        QueueContents {
            entries: state.entries.iter().cloned().collect(),
            id_map: state.id_map.clone(),
        }
    }

    /// Re-issue queued mutations in insertion order.
    ///
    /// Acknowledged entries are removed and their client id mapped to the
    /// server id. A network failure puts the entry back to pending and ends
    /// the pass; a rejection marks it failed and moves on. Failed entries are
    /// retried on the next pass like any other.
    pub async fn replay<A: WorkoutApi + ?Sized>(&self, api: &A) -> ReplayReport {
        let Ok(_guard) = self.replay_guard.try_lock() else {
            tracing::debug!("replay already running, skipping");
            return ReplayReport {
                skipped: true,
                remaining: self.pending_count(),
                ..ReplayReport::default()
            };
        };

        let mut report = ReplayReport::default();
        let order: Vec<String> = self
            .state()
            .entries
            .iter()
            .map(|e| e.client_id.clone())
            .collect();

        for client_id in order {
            let Some(mutation) = self.prepare(&client_id) else {
                report.deferred += 1;
                continue;
            };

            let result = issue(api, &mutation).await;

            let mut state = self.state();
            match result {
                Ok(server_id) => {
                    tracing::info!(%client_id, %server_id, kind = mutation.label(), "replayed mutation");
                    state.id_map.insert(client_id.clone(), server_id);
                    state.entries.retain(|e| e.client_id != client_id);
                    report.synced += 1;
                }
                Err(err) => {
                    let network = err.is_network();
                    if let Some(entry) = state.entries.iter_mut().find(|e| e.client_id == client_id) {
                        entry.last_error = Some(err.to_string());
                        entry.status = if network {
                            MutationStatus::Pending
                        } else {
                            MutationStatus::Failed
                        };
                    }
                    if network {
                        tracing::warn!(%client_id, error = %err, "replay interrupted, still offline");
                        report.interrupted = true;
                        break;
                    }
                    tracing::warn!(%client_id, error = %err, "server rejected queued mutation");
                    report.rejected += 1;
                }
            }
        }

        report.remaining = self.pending_count();
        report
    }

    /// Resolve ids for one entry and mark it syncing.
    ///
    /// Returns `None` when the entry is gone or still depends on an entity
    /// that another queued entry has not created yet.
    fn prepare(&self, client_id: &str) -> Option<Mutation> {
        let mut state = self.state();
        let QueueState { entries, id_map } = &mut *state;

        let queued: HashSet<&str> = entries
            .iter()
            .filter(|e| e.client_id != client_id)
            .map(|e| e.client_id.as_str())
            .collect();

        let mut mutation = entries
            .iter()
            .find(|e| e.client_id == client_id)?
            .mutation
            .clone();
        mutation.map_ids(|id| id_map.get(id).cloned().unwrap_or_else(|| id.to_string()));

        if let Some(reference) = mutation.referenced_id() {
            if is_client_id(reference) && queued.contains(reference) {
                tracing::debug!(%client_id, %reference, "deferring until dependency syncs");
                return None;
            }
        }

        let entry = entries.iter_mut().find(|e| e.client_id == client_id)?;
        entry.mutation = mutation.clone();
        entry.status = MutationStatus::Syncing;
        entry.attempts += 1;
        Some(mutation)
    }
}

/// Send one mutation, returning the server id of the affected entity
async fn issue<A: WorkoutApi + ?Sized>(api: &A, mutation: &Mutation) -> Result<String> {
    match mutation {
        Mutation::StartSession(p) => api.start_session(p).await.map(|s| s.id),
        Mutation::CompleteSession(p) => api.complete_session(p).await.map(|s| s.id),
        Mutation::LogSet(p) => api.log_set(p).await.map(|s| s.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock_api::{MockWorkoutApi, RecordedCall};
    use crate::types::{CompleteSessionPayload, LogSetPayload, SessionKind, StartSessionPayload};
    use chrono::Utc;

    fn start() -> Mutation {
        Mutation::StartSession(StartSessionPayload {
            kind: SessionKind::Weights {
                day_id: "day-a".into(),
                day_name: "Push".into(),
            },
            started_at: Utc::now(),
        })
    }

    fn log_set(session_id: &str, set_number: u32) -> Mutation {
        Mutation::LogSet(LogSetPayload {
            session_id: session_id.into(),
            exercise_id: "bench".into(),
            set_number,
            reps: 8,
            weight_kg: Some(60.0),
            completed_at: Utc::now(),
        })
    }

    fn complete(session_id: &str) -> Mutation {
        Mutation::CompleteSession(CompleteSessionPayload {
            session_id: session_id.into(),
            completed_at: Utc::now(),
            duration_seconds: Some(1800),
            notes: None,
        })
    }

    // ========== enqueue / resolve_id tests ==========

    #[test]
    fn test_resolve_unknown_id_returns_input() {
        let queue = OfflineQueue::new();
        assert_eq!(queue.resolve_id("server-42"), "server-42");
        assert_eq!(queue.resolve_id("local-unknown"), "local-unknown");
    }

    #[test]
    fn test_enqueue_is_fifo_with_fresh_ids() {
        let queue = OfflineQueue::new();
        let a = queue.enqueue(start());
        let b = queue.enqueue(log_set("s1", 1));
        assert_ne!(a, b);

        let entries = queue.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].client_id, a);
        assert_eq!(entries[1].client_id, b);
        assert!(entries.iter().all(|e| e.status == MutationStatus::Pending));
    }

    #[test]
    fn test_clear_keeps_mappings() {
        let queue = OfflineQueue::new();
        queue.enqueue(start());
        queue.record_mapping("local-x", "server-x");
        assert_eq!(queue.clear(), 1);
        assert!(queue.is_empty());
        assert_eq!(queue.resolve_id("local-x"), "server-x");
    }

    #[test]
    fn test_restore_resets_syncing_entries() {
        let mut entry = QueuedMutation::new(start());
        entry.status = MutationStatus::Syncing;
        let queue = OfflineQueue::restore(QueueContents {
            entries: vec![entry],
            id_map: HashMap::new(),
        });
        assert_eq!(queue.entries()[0].status, MutationStatus::Pending);
    }

    // ========== replay tests ==========

    #[tokio::test]
    async fn test_replay_records_mapping_and_removes_entry() {
        let api = MockWorkoutApi::new();
        let queue = OfflineQueue::new();
        let client_id = queue.enqueue(start());

        let report = queue.replay(&api).await;

        assert_eq!(report.synced, 1);
        assert_eq!(report.remaining, 0);
        assert!(queue.is_empty());
        assert_eq!(queue.resolve_id(&client_id), "session-1");
    }

    #[tokio::test]
    async fn test_replay_rewrites_dependent_ids() {
        let api = MockWorkoutApi::new();
        let queue = OfflineQueue::new();
        let session = queue.enqueue(start());
        queue.enqueue(log_set(&session, 1));
        queue.enqueue(log_set(&session, 2));
        queue.enqueue(complete(&session));

        let report = queue.replay(&api).await;

        assert_eq!(report.synced, 4);
        assert_eq!(
            api.calls(),
            vec![
                RecordedCall::StartSession("session-1".into()),
                RecordedCall::LogSet {
                    set_id: "set-2".into(),
                    session_id: "session-1".into()
                },
                RecordedCall::LogSet {
                    set_id: "set-3".into(),
                    session_id: "session-1".into()
                },
                RecordedCall::CompleteSession("session-1".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_replay_offline_keeps_order_and_pending() {
        let api = MockWorkoutApi::new();
        api.set_offline(true);
        let queue = OfflineQueue::new();
        let a = queue.enqueue(start());
        let b = queue.enqueue(log_set(&a, 1));

        let report = queue.replay(&api).await;

        assert!(report.interrupted);
        assert_eq!(report.synced, 0);
        assert_eq!(report.remaining, 2);
        let entries = queue.entries();
        assert_eq!(entries[0].client_id, a);
        assert_eq!(entries[1].client_id, b);
        assert_eq!(entries[0].status, MutationStatus::Pending);
        assert_eq!(entries[0].attempts, 1);
        assert!(entries[0].last_error.is_some());
        // Second entry was never attempted
        assert_eq!(entries[1].attempts, 0);
        assert_eq!(queue.resolve_id(&a), a);
    }

    #[tokio::test]
    async fn test_replay_rejected_marks_failed_and_retries_later() {
        let api = MockWorkoutApi::new();
        api.reject("log-set");
        let queue = OfflineQueue::new();
        queue.enqueue(log_set("session-9", 1));
        queue.enqueue(start());

        let report = queue.replay(&api).await;
        assert_eq!(report.rejected, 1);
        assert_eq!(report.synced, 1);
        let entries = queue.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, MutationStatus::Failed);

        api.accept("log-set");
        let report = queue.replay(&api).await;
        assert_eq!(report.synced, 1);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_replay_defers_entries_whose_dependency_failed() {
        let api = MockWorkoutApi::new();
        api.reject("start-session");
        let queue = OfflineQueue::new();
        let session = queue.enqueue(start());
        queue.enqueue(log_set(&session, 1));

        let report = queue.replay(&api).await;

        assert_eq!(report.rejected, 1);
        assert_eq!(report.deferred, 1);
        assert_eq!(report.remaining, 2);
        // The set must never reach the server with a provisional id
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_replay_is_skipped() {
        let api = MockWorkoutApi::new();
        let queue = OfflineQueue::new();
        queue.enqueue(start());

        let guard = queue.replay_guard.lock().await;
        let report = queue.replay(&api).await;
        assert!(report.skipped);
        assert_eq!(report.remaining, 1);
        drop(guard);

        assert_eq!(queue.replay(&api).await.synced, 1);
    }

    #[test]
    fn test_snapshot_roundtrip_through_restore() {
        let queue = OfflineQueue::new();
        queue.enqueue(start());
        queue.record_mapping("local-a", "server-a");

        let restored = OfflineQueue::restore(queue.snapshot());
        assert_eq!(restored.entries(), queue.entries());
        assert_eq!(restored.resolve_id("local-a"), "server-a");
    }
}
