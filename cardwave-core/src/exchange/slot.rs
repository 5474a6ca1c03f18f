// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Single-Shot Completion Slot
//!
//! One foreground attempt has exactly one terminal outcome, but the adapter
//! may report more than one terminal-looking callback (a detection-processing
//! error and a later invalidation, say). The slot absorbs that: the first
//! `resolve` wins, every later one is a no-op, and `wait` blocks the caller
//! until the winning value arrives.

use std::sync::{Condvar, Mutex};

enum SlotState<T> {
    Pending,
    Resolved(T),
    Taken,
}

/// An owned result cell consumed exactly once.
pub struct CompletionSlot<T> {
    state: Mutex<SlotState<T>>,
    cv: Condvar,
}

impl<T> CompletionSlot<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        CompletionSlot {
            state: Mutex::new(SlotState::Pending),
            cv: Condvar::new(),
        }
    }

    /// Resolves the slot. Returns false (and drops the value) if the slot
    /// was already resolved.
    pub fn resolve(&self, value: T) -> bool {
        let mut state = self.state.lock().unwrap();
        match *state {
            SlotState::Pending => {
                *state = SlotState::Resolved(value);
                self.cv.notify_all();
                true
            }
            _ => false,
        }
    }

    /// Blocks until the slot is resolved, then takes the value.
    ///
    /// Must be called at most once, by the attempt's owner.
    pub fn wait(&self) -> T {
        let mut state = self.state.lock().unwrap();
        loop {
            match std::mem::replace(&mut *state, SlotState::Taken) {
                SlotState::Resolved(value) => return value,
                SlotState::Pending => {
                    *state = SlotState::Pending;
                    state = self.cv.wait(state).unwrap();
                }
                SlotState::Taken => unreachable!("completion slot consumed twice"),
            }
        }
    }
}

impl<T> Default for CompletionSlot<T> {
    fn default() -> Self {
        CompletionSlot::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_first_resolution_wins() {
        let slot = CompletionSlot::new();
        assert!(slot.resolve(1));
        assert!(!slot.resolve(2));
        assert_eq!(slot.wait(), 1);
    }

    #[test]
    fn test_wait_blocks_until_resolved() {
        let slot = Arc::new(CompletionSlot::new());
        let resolver = Arc::clone(&slot);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            resolver.resolve("done");
        });

        assert_eq!(slot.wait(), "done");
        handle.join().unwrap();
    }

    #[test]
    fn test_resolve_after_wait_is_noop() {
        let slot = CompletionSlot::new();
        slot.resolve(7);
        assert_eq!(slot.wait(), 7);
        assert!(!slot.resolve(8));
    }
}
