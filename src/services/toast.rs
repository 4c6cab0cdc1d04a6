//! Transient user notifications

use std::time::Duration;
use tokio::time::Instant;

/// Auto-dismiss delay used by `ToastStore::show`
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub level: ToastLevel,
    /// Zero means the toast stays until dismissed
    pub duration: Duration,
    pub created_at: Instant,
}

impl Toast {
    /// Visible while `now < created_at + duration`
    pub fn is_expired(&self, now: Instant) -> bool {
        !self.duration.is_zero() && now >= self.created_at + self.duration
    }
}

#[derive(Debug, Default)]
pub struct ToastStore {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl ToastStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: impl Into<String>, level: ToastLevel) -> u64 {
        self.show_with_duration(message, level, DEFAULT_TOAST_DURATION)
    }

    pub fn show_with_duration(
        &mut self,
        message: impl Into<String>,
        level: ToastLevel,
        duration: Duration,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.toasts.push(Toast {
            id,
            message: message.into(),
            level,
            duration,
            created_at: Instant::now(),
        });
        id
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    pub fn clear(&mut self) {
        self.toasts.clear();
    }

    /// Drop expired toasts and return the ones still on screen, oldest first
    pub fn visible(&mut self) -> &[Toast] {
        let now = Instant::now();
        self.toasts.retain(|t| !t.is_expired(now));
        &self.toasts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_toast_expires_exactly_at_duration() {
        let mut store = ToastStore::new();
        store.show("Saved", ToastLevel::Success);

        tokio::time::advance(Duration::from_millis(4999)).await;
        assert_eq!(store.visible().len(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(store.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_is_persistent() {
        let mut store = ToastStore::new();
        let id = store.show_with_duration("Sync failed", ToastLevel::Error, Duration::ZERO);

        tokio::time::advance(Duration::from_millis(60_000)).await;
        assert_eq!(store.visible().len(), 1);

        assert!(store.dismiss(id));
        assert!(store.visible().is_empty());
        assert!(!store.dismiss(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_keeps_order_and_ids() {
        let mut store = ToastStore::new();
        let a = store.show("first", ToastLevel::Info);
        let b = store.show_with_duration("second", ToastLevel::Warning, Duration::from_secs(1));
        let c = store.show("third", ToastLevel::Info);
        assert!(a < b && b < c);

        tokio::time::advance(Duration::from_secs(2)).await;
        let ids: Vec<u64> = store.visible().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a, c]);

        store.clear();
        assert!(store.visible().is_empty());
    }
}
