//! Latest-wins hand-off between frame ingress and processing.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct SlotState<T> {
    value: Option<T>,
    closed: bool,
    replaced: u64,
}

/// Single-value mailbox where a newer value replaces an unconsumed one.
///
/// The producer never blocks. The consumer blocks until a value is present
/// or the slot is closed. At most one value is ever held.
#[derive(Debug)]
pub struct FrameSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameSlot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                closed: false,
                replaced: 0,
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value`, returning the unconsumed value it replaced.
    ///
    /// Values offered after [`close`](Self::close) are handed straight back.
    pub fn offer(&self, value: T) -> Option<T> {
        let mut state = self.lock();
        if state.closed {
            return Some(value);
        }
        let previous = state.value.replace(value);
        if previous.is_some() {
            state.replaced += 1;
        }
        drop(state);
        self.ready.notify_one();
        previous
    }

    /// Waits for a value. Returns `None` once the slot is closed and empty.
    pub fn take(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(value) = state.value.take() {
                return Some(value);
            }
            if state.closed {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Takes the current value without waiting.
    pub fn try_take(&self) -> Option<T> {
        self.lock().value.take()
    }

    /// Rejects further offers and wakes the consumer. A held value can still be taken.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of values replaced before they were taken.
    #[must_use]
    pub fn replaced(&self) -> u64 {
        self.lock().replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_newer_value_replaces_older() {
        let slot = FrameSlot::new();
        assert_eq!(slot.offer(1), None);
        assert_eq!(slot.offer(2), Some(1));
        assert_eq!(slot.offer(3), Some(2));
        assert_eq!(slot.replaced(), 2);
        assert_eq!(slot.try_take(), Some(3));
        assert_eq!(slot.try_take(), None);
    }

    #[test]
    fn test_close_drains_then_ends() {
        let slot = FrameSlot::new();
        slot.offer("last");
        slot.close();
        assert_eq!(slot.offer("late"), Some("late"));
        assert_eq!(slot.take(), Some("last"));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_take_waits_for_producer() {
        let slot = Arc::new(FrameSlot::new());
        let producer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                slot.offer(42);
                slot.close();
            })
        };
        assert_eq!(slot.take(), Some(42));
        assert_eq!(slot.take(), None);
        producer.join().unwrap();
    }

    #[test]
    fn test_never_holds_more_than_one() {
        let slot = Arc::new(FrameSlot::new());
        let producer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                for i in 0..1000 {
                    slot.offer(i);
                }
                slot.close();
            })
        };

        let mut taken = Vec::new();
        while let Some(v) = slot.take() {
            taken.push(v);
        }
        producer.join().unwrap();

        // Consumed values are strictly increasing and the last one always survives.
        assert!(taken.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(taken.last(), Some(&999));
        assert_eq!(taken.len() as u64 + slot.replaced(), 1000);
    }
}
