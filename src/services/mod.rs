//! Services for the workout workflow, offline sync and statistics

pub mod aggregator;
pub mod api;
pub mod calendar;
#[cfg(test)]
pub(crate) mod mock_api;
pub mod offline_queue;
pub mod rest_timer;
pub mod runtime_store;
pub mod state_store;
pub mod sync;
pub mod toast;
pub mod workout_session;

pub use aggregator::{Aggregator, WorkoutMix, WorkoutStats};
pub use api::{SupabaseClient, WorkoutApi};
pub use offline_queue::{OfflineQueue, QueueContents, ReplayReport};
pub use runtime_store::{RestTimer, WorkoutState, WorkoutStore};
pub use state_store::StateStore;
pub use sync::{Connectivity, SyncWorker};
pub use toast::{Toast, ToastLevel, ToastStore};
pub use workout_session::WorkoutSessionService;
