//! Latest-value broadcasting for observers of store state.
//!
//! A [`LiveValue`] holds the current value of some piece of state and wakes
//! every [`Subscription`] when it changes. Subscribers always see the newest
//! value: one that falls behind skips intermediate values instead of queueing
//! them, and never holds back the publisher or other subscribers.
//!
//! ```rust
//! use mininote_core::live::LiveValue;
//!
//! let flag = LiveValue::new(true);
//! let sub = flag.subscribe();
//! assert!(flag.publish(false));
//! assert!(!flag.publish(false));
//! assert!(!sub.latest());
//! ```

use tokio::sync::watch;

/// Publisher side of a continuously observable value.
pub struct LiveValue<T> {
    sender: watch::Sender<T>,
}

impl<T: Clone + PartialEq> LiveValue<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Replaces the current value.
    ///
    /// Returns `false` and wakes nobody when `value` equals the current one.
    pub fn publish(&self, value: T) -> bool {
        self.sender.send_if_modified(move |current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }

    /// Subscribes to this value. The first `next()` yields the current value.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            receiver: self.sender.subscribe(),
            primed: false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiver side of a [`LiveValue`]. Dropping it cancels delivery.
pub struct Subscription<T> {
    receiver: watch::Receiver<T>,
    primed: bool,
}

impl<T: Clone> Subscription<T> {
    /// Waits for the next value to deliver.
    ///
    /// The first call returns immediately with the current value. Later calls
    /// resolve once the value changes, yielding only the newest one. Returns
    /// `None` after the publisher is gone.
    pub async fn next(&mut self) -> Option<T> {
        if !self.primed {
            self.primed = true;
            return Some(self.receiver.borrow_and_update().clone());
        }

        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Returns the newest value without waiting or marking it seen.
    pub fn latest(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Whether `next()` would resolve without waiting.
    pub fn has_pending(&self) -> bool {
        !self.primed || self.receiver.has_changed().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::LiveValue;

    #[tokio::test]
    async fn first_next_replays_current_value() {
        let value = LiveValue::new(3_u32);
        let mut sub = value.subscribe();
        assert!(sub.has_pending());
        assert_eq!(sub.next().await, Some(3));
        assert!(!sub.has_pending());
    }

    #[tokio::test]
    async fn slow_subscriber_only_sees_latest() {
        let value = LiveValue::new(0_u32);
        let mut sub = value.subscribe();
        assert_eq!(sub.next().await, Some(0));

        value.publish(1);
        value.publish(2);
        value.publish(3);

        assert_eq!(sub.next().await, Some(3));
        assert!(!sub.has_pending());
    }

    #[tokio::test]
    async fn publishing_equal_value_wakes_nobody() {
        let value = LiveValue::new("same".to_string());
        let mut sub = value.subscribe();
        assert_eq!(sub.next().await.as_deref(), Some("same"));

        assert!(!value.publish("same".to_string()));
        assert!(!sub.has_pending());

        assert!(value.publish("other".to_string()));
        assert!(sub.has_pending());
        assert_eq!(value.get(), "other");
    }

    #[tokio::test]
    async fn next_returns_none_after_publisher_dropped() {
        let value = LiveValue::new(1_u8);
        let mut sub = value.subscribe();
        assert_eq!(sub.next().await, Some(1));
        drop(value);
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn subscriber_count_tracks_live_subscriptions() {
        let value = LiveValue::new(false);
        assert_eq!(value.subscriber_count(), 0);
        let first = value.subscribe();
        let _second = value.subscribe();
        assert_eq!(value.subscriber_count(), 2);
        drop(first);
        assert_eq!(value.subscriber_count(), 1);
    }
}
