//! Request generations
//!
//! Every fetch of one kind takes the next generation number. A response may
//! publish into view state only while its generation is still the latest, so
//! a slow response for an old symbol can never overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Tag handed to one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    #[cfg(test)]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic generation counter for one operation kind
#[derive(Debug, Default)]
pub struct RequestGeneration {
    latest: AtomicU64,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding every earlier one
    pub fn begin(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.latest.load(Ordering::SeqCst) == generation.0
    }

    /// Start a new generation and reset `tx` in the same critical section
    pub fn begin_with<T>(&self, tx: &watch::Sender<T>, reset: impl FnOnce(&mut T)) -> Generation {
        let mut generation = Generation(0);
        tx.send_modify(|value| {
            generation = self.begin();
            reset(value);
        });
        generation
    }

    /// Apply `update` to `tx` if `generation` is still current.
    ///
    /// The check and the write happen under the channel's lock, so no newer
    /// generation can start in between. Returns whether the update was applied.
    pub fn publish<T>(
        &self,
        generation: Generation,
        tx: &watch::Sender<T>,
        update: impl FnOnce(&mut T),
    ) -> bool {
        tx.send_if_modified(|value| {
            if self.is_current(generation) {
                update(value);
                true
            } else {
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_generation_wins() {
        let generations = RequestGeneration::new();
        let first = generations.begin();
        let second = generations.begin();

        assert!(second > first);
        assert!(!generations.is_current(first));
        assert!(generations.is_current(second));
    }

    #[test]
    fn test_stale_publish_is_dropped() {
        let generations = RequestGeneration::new();
        let (tx, rx) = watch::channel(String::new());

        let first = generations.begin_with(&tx, |v| *v = "loading A".to_string());
        let second = generations.begin_with(&tx, |v| *v = "loading B".to_string());

        assert!(generations.publish(second, &tx, |v| *v = "B".to_string()));
        assert!(!generations.publish(first, &tx, |v| *v = "A".to_string()));
        assert_eq!(*rx.borrow(), "B");
    }

    #[test]
    fn test_begin_with_resets_even_without_receivers() {
        let generations = RequestGeneration::new();
        let (tx, _) = watch::channel(1);

        let generation = generations.begin_with(&tx, |v| *v = 0);
        assert_eq!(*tx.borrow(), 0);
        assert_eq!(generation.value(), 1);
    }
}
