//! On-disk state between CLI runs
//!
//! The queue and the workout store live in memory. The CLI saves them here so
//! writes made offline, and a workout started in one invocation, are still
//! around for the next.

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::services::offline_queue::QueueContents;
use crate::services::runtime_store::WorkoutState;
use crate::types::{LiftlogError, QueueWarning, Result};

/// Bump when the snapshot layout changes; older files are discarded
pub const QUEUE_SNAPSHOT_VERSION: u32 = 1;

const QUEUE_FILE: &str = "offline_queue.json";
const WORKOUT_FILE: &str = "active_workout.json";

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub version: u32,
    pub saved_at: i64,
    #[serde(flatten)]
    pub contents: QueueContents,
}

pub struct StateStore {
    data_dir: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join(QUEUE_FILE)
    }

    pub fn workout_path(&self) -> PathBuf {
        self.data_dir.join(WORKOUT_FILE)
    }

    // ========== offline queue ==========

    /// Load the saved queue. Missing file → empty queue; unreadable,
    /// corrupted or outdated file → empty queue plus a warning.
    pub fn load_queue(&self) -> (QueueContents, Option<QueueWarning>) {
        let path = self.queue_path();
        if !path.exists() {
            return (QueueContents::default(), None);
        }

        let content = match read_shared(&path) {
            Ok(c) => c,
            Err(e) => {
                return (
                    QueueContents::default(),
                    Some(QueueWarning::LoadFailed(format!(
                        "Failed to read queue snapshot: {}",
                        e
                    ))),
                );
            }
        };

        let snapshot: QueueSnapshot = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                return (
                    QueueContents::default(),
                    Some(QueueWarning::Corrupted(format!(
                        "Corrupted queue snapshot: {}",
                        e
                    ))),
                );
            }
        };

        if snapshot.version != QUEUE_SNAPSHOT_VERSION {
            return (
                QueueContents::default(),
                Some(QueueWarning::VersionMismatch(format!(
                    "Queue snapshot version {} (expected {})",
                    snapshot.version, QUEUE_SNAPSHOT_VERSION
                ))),
            );
        }

        (snapshot.contents, None)
    }

    /// Save the queue, id map included, even when no entries are left
    pub fn save_queue(&self, contents: &QueueContents) -> Result<()> {
        let snapshot = QueueSnapshot {
            version: QUEUE_SNAPSHOT_VERSION,
            saved_at: Utc::now().timestamp(),
            contents: contents.clone(),
        };
        let content = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| LiftlogError::Queue(format!("Serialization failed: {}", e)))?;

        let path = self.queue_path();
        self.write_atomic(&path, &content)?;
        tracing::debug!(entries = contents.entries.len(), path = %path.display(), "saved offline queue");
        Ok(())
    }

    // ========== active workout ==========

    /// The workout left in progress by an earlier run; empty when none
    pub fn load_workout(&self) -> Result<WorkoutState> {
        let path = self.workout_path();
        if !path.exists() {
            return Ok(WorkoutState::default());
        }
        let content = read_shared(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            LiftlogError::Parse(format!("active workout file {}: {}", path.display(), e))
        })
    }

    /// Save the in-progress workout, or remove the file once none is active
    pub fn save_workout(&self, state: &WorkoutState) -> Result<()> {
        let path = self.workout_path();
        if state.active_session.is_none() {
            if path.exists() {
                fs::remove_file(&path)?;
            }
            return Ok(());
        }
        let content = serde_json::to_string_pretty(state)?;
        self.write_atomic(&path, &content)
    }

    /// Atomic write (temp file + rename) under an exclusive lock
    fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let temp_path = path.with_extension("json.tmp");

        {
            let mut file = File::create(&temp_path)
                .map_err(|e| LiftlogError::Queue(format!("Failed to create temp file: {}", e)))?;
            file.write_all(content.as_bytes())
                .map_err(|e| LiftlogError::Queue(format!("Failed to write temp file: {}", e)))?;
            file.sync_all()
                .map_err(|e| LiftlogError::Queue(format!("Failed to sync temp file: {}", e)))?;
        }

        let target = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        target
            .lock_exclusive()
            .map_err(|e| LiftlogError::Queue(format!("Failed to acquire write lock: {}", e)))?;

        fs::rename(&temp_path, path)
            .map_err(|e| LiftlogError::Queue(format!("Failed to rename temp file: {}", e)))?;

        let _ = target.unlock();
        Ok(())
    }
}

/// Read a whole file under a shared lock
fn read_shared(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    file.lock_shared()?;
    let mut content = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut content);
    let _ = file.unlock();
    read.map(|_| content)
}
