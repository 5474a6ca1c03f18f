// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Background Detector
//!
//! A persistent, self-rearming listener performing silent mutual contact
//! exchange without user action. The loop never terminates itself: malformed
//! peer payloads are dropped, auto-respond failures are logged, and every
//! session invalidation while active re-arms a fresh listening session after
//! a short backoff. Only [`BackgroundDetector::stop`] ends the loop.
//!
//! Exactly one listening session object is alive at any instant; replaced
//! sessions are fenced with a generation counter so their late callbacks
//! cannot restart the loop or release a radio hold they no longer own.

use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::codec;
use crate::contact::Contact;
use crate::transport::{
    NdefMessage, NfcAdapter, SessionDelegate, SessionMode, SessionTermination, TagRef, TagSession,
};

use super::arbiter::{BackgroundAcquire, RadioArbiter, RadioYield};
use super::error::TransferError;
use super::events::{EventDispatcher, ExchangeEvent};

/// Phase of the background exchange loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorPhase {
    /// Not running.
    Inactive,
    /// Polling for peers (or waiting to re-arm).
    Listening,
    /// A peer tag is in range and being exchanged with.
    Connected,
}

/// Background detector tuning.
#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    /// Delay before re-arming the listener after an invalidation. Avoids a
    /// tight restart loop against a departed or slow peer.
    pub restart_backoff: Duration,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        BackgroundConfig {
            restart_backoff: Duration::from_secs(1),
        }
    }
}

/// The one listening session, plus the peer tag it is currently connected
/// to for auto-respond.
struct ListeningSession {
    session: Arc<dyn TagSession>,
    connected_tag: Option<TagRef>,
}

struct DetectorState {
    phase: DetectorPhase,
    /// Active but the radio is yielded to (or awaited from) the foreground.
    suspended: bool,
    /// Guards against two arms racing to open a session.
    arming: bool,
    local_contact: Option<Contact>,
    listening: Option<ListeningSession>,
    /// Fence for callbacks from replaced sessions.
    generation: u64,
    /// A restart timer thread is sleeping.
    restart_pending: bool,
    /// The session of this generation invalidated before `arm` stored it.
    begin_failed_gen: Option<u64>,
}

struct DetectorInner<A: NfcAdapter + 'static> {
    adapter: Arc<A>,
    arbiter: Arc<RadioArbiter>,
    events: Arc<EventDispatcher>,
    config: BackgroundConfig,
    state: Mutex<DetectorState>,
    restart_cv: Condvar,
}

/// Passive contact-exchange loop.
pub struct BackgroundDetector<A: NfcAdapter + 'static> {
    inner: Arc<DetectorInner<A>>,
}

impl<A: NfcAdapter + 'static> BackgroundDetector<A> {
    /// Creates a detector and registers it with the arbiter as the
    /// background radio owner.
    pub fn new(
        adapter: Arc<A>,
        arbiter: Arc<RadioArbiter>,
        events: Arc<EventDispatcher>,
        config: BackgroundConfig,
    ) -> Self {
        let inner = Arc::new(DetectorInner {
            adapter,
            arbiter: Arc::clone(&arbiter),
            events,
            config,
            state: Mutex::new(DetectorState {
                phase: DetectorPhase::Inactive,
                suspended: false,
                arming: false,
                local_contact: None,
                listening: None,
                generation: 0,
                restart_pending: false,
                begin_failed_gen: None,
            }),
            restart_cv: Condvar::new(),
        });

        arbiter.register_yield_handler(Arc::new(DetectorYield(Arc::clone(&inner))));

        BackgroundDetector { inner }
    }

    /// Starts (or refreshes) background detection with the local contact to
    /// auto-respond with.
    ///
    /// Without NFC hardware this logs and stays inactive. If the foreground
    /// holds the radio, arming is deferred and happens when it is released.
    pub fn start(&self, contact: Contact) {
        if !self.inner.adapter.reading_available() {
            warn!("NFC unavailable, background detection not started");
            return;
        }

        {
            let mut state = self.inner.state.lock().unwrap();
            state.local_contact = Some(contact);
            if state.phase != DetectorPhase::Inactive {
                return;
            }
            state.phase = DetectorPhase::Listening;
            state.suspended = false;
        }

        DetectorInner::arm(&self.inner);
    }

    /// Stops background detection.
    ///
    /// Synchronous: marks the detector inactive, cancels any pending
    /// restart timer, and invalidates the current listening session, so no
    /// race can re-arm the listener afterward.
    pub fn stop(&self) {
        let listening = {
            let mut state = self.inner.state.lock().unwrap();
            state.phase = DetectorPhase::Inactive;
            state.suspended = false;
            state.restart_pending = false;
            state.begin_failed_gen = None;
            state.generation += 1;
            state.listening.take()
        };
        self.inner.restart_cv.notify_all();

        if let Some(listening) = listening {
            listening.session.invalidate();
        }
        self.inner.arbiter.release_background();
    }

    /// Returns the current phase.
    pub fn phase(&self) -> DetectorPhase {
        self.inner.state.lock().unwrap().phase
    }

    /// Returns true while started and not yet stopped.
    pub fn is_active(&self) -> bool {
        self.phase() != DetectorPhase::Inactive
    }
}

impl<A: NfcAdapter + 'static> DetectorInner<A> {
    /// Opens a fresh listening session if the detector is active, not
    /// suspended, and none is alive.
    fn arm(inner: &Arc<Self>) {
        let generation = {
            let mut state = inner.state.lock().unwrap();
            if state.phase == DetectorPhase::Inactive
                || state.suspended
                || state.arming
                || state.listening.is_some()
            {
                return;
            }
            state.arming = true;
            state.generation += 1;
            state.generation
        };

        match inner.arbiter.try_acquire_background() {
            BackgroundAcquire::Deferred => {
                let mut state = inner.state.lock().unwrap();
                state.arming = false;
                state.suspended = true;
                debug!("radio held by foreground, deferring background listener");
                return;
            }
            BackgroundAcquire::Acquired => {}
        }

        let delegate: Arc<dyn SessionDelegate> = Arc::new(ListenDelegate {
            inner: Arc::downgrade(inner),
            generation,
        });

        // Persistent mode: the session is not auto-invalidated after the
        // first read.
        match inner.adapter.begin(SessionMode::Listen, false, delegate) {
            Ok(session) => {
                let mut state = inner.state.lock().unwrap();
                state.arming = false;

                if state.begin_failed_gen == Some(generation) {
                    // The session invalidated before we could store it.
                    state.begin_failed_gen = None;
                    drop(state);
                    inner.arbiter.release_background();
                    Self::schedule_restart(inner);
                    return;
                }

                if state.generation == generation
                    && state.phase != DetectorPhase::Inactive
                    && !state.suspended
                {
                    state.phase = DetectorPhase::Listening;
                    state.listening = Some(ListeningSession {
                        session,
                        connected_tag: None,
                    });
                } else {
                    // Stopped or suspended while the session was opening;
                    // stop/suspend already released the radio.
                    drop(state);
                    session.invalidate();
                }
            }
            Err(err) => {
                warn!("failed to open background listener: {err}");
                inner.state.lock().unwrap().arming = false;
                inner.arbiter.release_background();
                Self::schedule_restart(inner);
            }
        }
    }

    /// Re-arms the listener after the configured backoff, unless stopped
    /// first.
    fn schedule_restart(inner: &Arc<Self>) {
        {
            let mut state = inner.state.lock().unwrap();
            if state.phase == DetectorPhase::Inactive || state.restart_pending {
                return;
            }
            state.restart_pending = true;
        }

        let inner = Arc::clone(inner);
        thread::spawn(move || {
            let deadline = Instant::now() + inner.config.restart_backoff;
            let mut state = inner.state.lock().unwrap();
            while state.restart_pending && state.phase != DetectorPhase::Inactive {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let (guard, _) = inner
                    .restart_cv
                    .wait_timeout(state, deadline - now)
                    .unwrap();
                state = guard;
            }
            let fire = state.restart_pending && state.phase != DetectorPhase::Inactive;
            state.restart_pending = false;
            drop(state);

            if fire {
                DetectorInner::arm(&inner);
            }
        });
    }

    fn handle_tags_detected(inner: &Arc<Self>, generation: u64, tags: Vec<TagRef>) {
        let mut guard = inner.state.lock().unwrap();
        let state = &mut *guard;
        if generation != state.generation {
            return;
        }
        if let Some(listening) = state.listening.as_mut() {
            listening.connected_tag = tags.into_iter().next();
            state.phase = DetectorPhase::Connected;
        }
    }

    fn handle_messages(inner: &Arc<Self>, generation: u64, messages: Vec<NdefMessage>) {
        // Malformed peer data must never interrupt the listening loop.
        let contact = match codec::decode_first(&messages) {
            Ok(contact) => contact,
            Err(err) => {
                debug!("dropping malformed peer payload: {err}");
                return;
            }
        };

        let snapshot = {
            let state = inner.state.lock().unwrap();
            if generation != state.generation {
                return;
            }
            state.listening.as_ref().map(|listening| {
                (
                    Arc::clone(&listening.session),
                    listening.connected_tag.clone(),
                    state.local_contact.clone(),
                )
            })
        };

        inner
            .events
            .dispatch(ExchangeEvent::PeerContactReceived { contact });

        // Auto-respond with the local contact. Failures here are logged
        // only; the notification above already went out.
        let Some((session, connected_tag, local_contact)) = snapshot else {
            debug!("no listening session for auto-respond");
            return;
        };
        let Some(tag) = connected_tag else {
            warn!("no connected tag, skipping auto-respond");
            return;
        };
        let Some(local_contact) = local_contact else {
            return;
        };

        if let Err(err) = Self::respond(&session, &tag, &local_contact) {
            warn!("auto-respond failed: {err}");
        }
    }

    fn respond(
        session: &Arc<dyn TagSession>,
        tag: &TagRef,
        contact: &Contact,
    ) -> Result<(), TransferError> {
        session.connect(tag)?;
        session.query_capability(tag)?;
        let record = codec::encode_contact(contact)?;
        session.write(tag, &NdefMessage::single(record))?;
        debug!("auto-sent local contact");
        Ok(())
    }

    fn handle_invalidated(inner: &Arc<Self>, generation: u64, termination: SessionTermination) {
        let took_session = {
            let mut state = inner.state.lock().unwrap();
            if generation != state.generation {
                debug!("ignoring invalidation from replaced listener");
                return;
            }
            match state.listening.take() {
                Some(_) => {
                    state.phase = DetectorPhase::Listening;
                    true
                }
                None => {
                    state.begin_failed_gen = Some(generation);
                    false
                }
            }
        };

        if !took_session {
            return;
        }

        debug!("background listener invalidated: {termination}");
        inner.arbiter.release_background();
        Self::schedule_restart(inner);
    }

    /// Yields the radio to a foreground session. Callbacks from the
    /// invalidated listener are fenced off by bumping the generation.
    fn suspend(inner: &Arc<Self>) {
        let listening = {
            let mut state = inner.state.lock().unwrap();
            if state.phase != DetectorPhase::Inactive {
                state.suspended = true;
                state.phase = DetectorPhase::Listening;
            }
            state.generation += 1;
            state.restart_pending = false;
            state.begin_failed_gen = None;
            state.listening.take()
        };
        inner.restart_cv.notify_all();

        if let Some(listening) = listening {
            debug!("suspending background listener for foreground session");
            listening.session.invalidate();
        }
        inner.arbiter.release_background();
    }

    /// Re-arms after the foreground released the radio, if still active.
    fn resume(inner: &Arc<Self>) {
        let should_arm = {
            let mut state = inner.state.lock().unwrap();
            if state.phase == DetectorPhase::Inactive || !state.suspended {
                false
            } else {
                state.suspended = false;
                true
            }
        };

        if should_arm {
            debug!("foreground released radio, resuming background listener");
            Self::arm(inner);
        }
    }
}

/// Arbiter hooks; suspension and resumption come from foreground acquire
/// and release.
struct DetectorYield<A: NfcAdapter + 'static>(Arc<DetectorInner<A>>);

impl<A: NfcAdapter + 'static> RadioYield for DetectorYield<A> {
    fn suspend(&self) {
        DetectorInner::suspend(&self.0);
    }

    fn resume(&self) {
        DetectorInner::resume(&self.0);
    }
}

/// Delegate for one listening session generation.
struct ListenDelegate<A: NfcAdapter + 'static> {
    inner: Weak<DetectorInner<A>>,
    generation: u64,
}

impl<A: NfcAdapter + 'static> SessionDelegate for ListenDelegate<A> {
    fn on_tags_detected(&self, _session: &dyn TagSession, tags: Vec<TagRef>) {
        if let Some(inner) = self.inner.upgrade() {
            DetectorInner::handle_tags_detected(&inner, self.generation, tags);
        }
    }

    fn on_messages(&self, _session: &dyn TagSession, messages: Vec<NdefMessage>) {
        if let Some(inner) = self.inner.upgrade() {
            DetectorInner::handle_messages(&inner, self.generation, messages);
        }
    }

    fn on_invalidated(&self, termination: SessionTermination) {
        if let Some(inner) = self.inner.upgrade() {
            DetectorInner::handle_invalidated(&inner, self.generation, termination);
        }
    }
}
