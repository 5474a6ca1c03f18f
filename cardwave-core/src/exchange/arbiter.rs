// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Radio Arbiter
//!
//! The transport models one exclusive half-duplex radio. Both the foreground
//! session manager and the background detector must hold this token before
//! opening a session. The foreground has priority: acquiring it asks the
//! current background owner to yield through its registered handler, and the
//! release hook lets the background resume afterward. Background acquisition
//! never blocks; when the foreground holds the radio it is deferred and
//! re-armed by the resume hook.

use std::sync::{Arc, Mutex};

use super::error::TransferError;

/// Who currently holds the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioOwner {
    /// Nobody; either manager may acquire.
    Idle,
    /// A foreground send/receive attempt.
    Foreground,
    /// The background listening session.
    Background,
}

/// Outcome of a background acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundAcquire {
    /// The radio is now background-owned.
    Acquired,
    /// The radio is busy; the caller will be resumed when it frees up.
    Deferred,
}

/// Hooks the background owner registers so the arbiter can displace and
/// restore it around foreground attempts.
pub trait RadioYield: Send + Sync {
    /// Give up the radio now. Must have released it by the time this
    /// returns.
    fn suspend(&self);

    /// The radio is free again; re-arm if still wanted.
    fn resume(&self);
}

struct ArbiterState {
    owner: RadioOwner,
    handler: Option<Arc<dyn RadioYield>>,
}

/// Exclusive-access arbiter for the radio.
pub struct RadioArbiter {
    state: Mutex<ArbiterState>,
}

impl RadioArbiter {
    /// Creates an arbiter with the radio idle.
    pub fn new() -> Self {
        RadioArbiter {
            state: Mutex::new(ArbiterState {
                owner: RadioOwner::Idle,
                handler: None,
            }),
        }
    }

    /// Registers the background yield handler.
    pub fn register_yield_handler(&self, handler: Arc<dyn RadioYield>) {
        self.state.lock().unwrap().handler = Some(handler);
    }

    /// Returns the current owner.
    pub fn owner(&self) -> RadioOwner {
        self.state.lock().unwrap().owner
    }

    /// Acquires the radio for a foreground attempt, suspending a background
    /// owner if necessary.
    ///
    /// Fails with `SessionBusy` if another foreground attempt holds it, or
    /// if a background owner refuses to yield.
    pub fn acquire_foreground(&self) -> Result<(), TransferError> {
        // Two passes: one to displace a background owner, one to take the
        // freed token. The handler is invoked outside the arbiter lock so
        // its release call does not deadlock.
        for _ in 0..2 {
            let handler = {
                let mut state = self.state.lock().unwrap();
                match state.owner {
                    RadioOwner::Idle => {
                        state.owner = RadioOwner::Foreground;
                        return Ok(());
                    }
                    RadioOwner::Foreground => return Err(TransferError::SessionBusy),
                    RadioOwner::Background => state.handler.clone(),
                }
            };

            match handler {
                Some(handler) => handler.suspend(),
                None => break,
            }
        }

        Err(TransferError::SessionBusy)
    }

    /// Releases a foreground hold and invokes the background resume hook.
    pub fn release_foreground(&self) {
        let handler = {
            let mut state = self.state.lock().unwrap();
            if state.owner != RadioOwner::Foreground {
                return;
            }
            state.owner = RadioOwner::Idle;
            state.handler.clone()
        };

        if let Some(handler) = handler {
            handler.resume();
        }
    }

    /// Attempts to acquire the radio for background listening.
    pub fn try_acquire_background(&self) -> BackgroundAcquire {
        let mut state = self.state.lock().unwrap();
        match state.owner {
            RadioOwner::Idle => {
                state.owner = RadioOwner::Background;
                BackgroundAcquire::Acquired
            }
            _ => BackgroundAcquire::Deferred,
        }
    }

    /// Releases a background hold. A release from a stale session (the
    /// owner has since changed) is a no-op.
    pub fn release_background(&self) {
        let mut state = self.state.lock().unwrap();
        if state.owner == RadioOwner::Background {
            state.owner = RadioOwner::Idle;
        }
    }
}

impl Default for RadioArbiter {
    fn default() -> Self {
        RadioArbiter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingYield {
        arbiter: Arc<RadioArbiter>,
        suspends: AtomicUsize,
        resumes: AtomicUsize,
    }

    impl RadioYield for CountingYield {
        fn suspend(&self) {
            self.suspends.fetch_add(1, Ordering::SeqCst);
            self.arbiter.release_background();
        }

        fn resume(&self) {
            self.resumes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_foreground_acquire_and_release() {
        let arbiter = RadioArbiter::new();
        assert_eq!(arbiter.owner(), RadioOwner::Idle);
        arbiter.acquire_foreground().unwrap();
        assert_eq!(arbiter.owner(), RadioOwner::Foreground);
        arbiter.release_foreground();
        assert_eq!(arbiter.owner(), RadioOwner::Idle);
    }

    #[test]
    fn test_second_foreground_acquire_is_busy() {
        let arbiter = RadioArbiter::new();
        arbiter.acquire_foreground().unwrap();
        assert_eq!(
            arbiter.acquire_foreground(),
            Err(TransferError::SessionBusy)
        );
    }

    #[test]
    fn test_foreground_displaces_background() {
        let arbiter = Arc::new(RadioArbiter::new());
        let hooks = Arc::new(CountingYield {
            arbiter: Arc::clone(&arbiter),
            suspends: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
        });
        arbiter.register_yield_handler(hooks.clone());

        assert_eq!(
            arbiter.try_acquire_background(),
            BackgroundAcquire::Acquired
        );
        arbiter.acquire_foreground().unwrap();
        assert_eq!(hooks.suspends.load(Ordering::SeqCst), 1);
        assert_eq!(arbiter.owner(), RadioOwner::Foreground);

        arbiter.release_foreground();
        assert_eq!(hooks.resumes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_background_defers_while_foreground_holds() {
        let arbiter = RadioArbiter::new();
        arbiter.acquire_foreground().unwrap();
        assert_eq!(
            arbiter.try_acquire_background(),
            BackgroundAcquire::Deferred
        );
    }

    #[test]
    fn test_stale_background_release_is_noop() {
        let arbiter = RadioArbiter::new();
        arbiter.acquire_foreground().unwrap();
        arbiter.release_background();
        assert_eq!(arbiter.owner(), RadioOwner::Foreground);
    }
}
