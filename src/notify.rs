use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// User-visible notifications dismiss themselves after this long.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub posted_at: Instant,
}

#[derive(Debug)]
pub struct Notifications {
    items: VecDeque<Notification>,
    ttl: Duration,
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            ttl,
        }
    }

    pub fn push(&mut self, message: impl Into<String>, now: Instant) {
        self.items.push_back(Notification {
            message: message.into(),
            posted_at: now,
        });
    }

    /// Drops expired notifications; returns whether anything was dismissed.
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.items.len();
        let ttl = self.ttl;
        self.items
            .retain(|n| now.saturating_duration_since(n.posted_at) < ttl);
        self.items.len() != before
    }

    /// Newest live notification.
    pub fn current(&self) -> Option<&Notification> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(NOTIFICATION_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_expire_after_ttl() {
        let start = Instant::now();
        let mut notifications = Notifications::default();
        notifications.push("cannot decode track", start);

        assert!(!notifications.prune(start + Duration::from_millis(4_999)));
        assert_eq!(notifications.current().unwrap().message, "cannot decode track");

        assert!(notifications.prune(start + NOTIFICATION_TTL));
        assert!(notifications.is_empty());
    }

    #[test]
    fn newest_notification_is_current() {
        let start = Instant::now();
        let mut notifications = Notifications::default();
        notifications.push("first", start);
        notifications.push("second", start + Duration::from_secs(3));

        notifications.prune(start + Duration::from_secs(6));
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications.current().unwrap().message, "second");
    }
}
