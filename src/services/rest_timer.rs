//! Background countdown for the rest timer

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::services::WorkoutStore;

const TICK: Duration = Duration::from_secs(1);

/// Count the store's rest timer down once per second while it is active.
///
/// One ticker serves the store for its whole life: it idles while the timer is
/// stopped and picks up again on pause/resume or a fresh start, with the
/// first tick one full second after the timer (re)starts. Abort the handle to
/// stop it, e.g. when the workout screen closes.
pub fn spawn_ticker(store: WorkoutStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut changes = store.subscribe();
        let mut interval = interval_at(Instant::now() + TICK, TICK);

        loop {
            if !store.is_rest_timer_active() {
                if changes.changed().await.is_err() {
                    break;
                }
                if store.is_rest_timer_active() {
                    interval.reset();
                }
                continue;
            }

            tokio::select! {
                _ = interval.tick() => {
                    if store.is_rest_timer_active() {
                        store.decrement_rest_timer();
                    }
                }
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    // Restarted while running
                    let timer = store.rest_timer();
                    if timer.active && timer.seconds == timer.initial_seconds {
                        interval.reset();
                    }
                }
            }
        }
        tracing::debug!("rest timer ticker stopped");
    })
}
