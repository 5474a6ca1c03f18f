//! Foreground Exchange Session
//!
//! Drives one user-initiated send or receive over the transport adapter,
//! bridging the adapter's asynchronous detection callbacks into a linear
//! call that blocks until exactly one terminal outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::codec;
use crate::contact::Contact;
use crate::transport::{
    NdefMessage, NfcAdapter, SessionDelegate, SessionMode, SessionTermination, TagRef, TagSession,
};

use super::arbiter::RadioArbiter;
use super::error::TransferError;
use super::events::{EventDispatcher, ExchangeEvent};
use super::slot::CompletionSlot;

/// State of the current (or last) foreground attempt.
#[derive(Debug, Clone)]
pub enum ForegroundState {
    /// No attempt has run yet, or the last one was consumed.
    Idle,
    /// A session is open and polling for a peer.
    Started,
    /// The last attempt completed.
    Completed,
    /// The last attempt failed.
    Failed(TransferError),
}

/// What a resolved attempt produced.
enum ForegroundOutcome {
    Sent,
    Received(Contact),
}

enum ForegroundRole {
    Send(Contact),
    Receive,
}

/// One in-flight attempt: its role and its single-shot result.
struct ForegroundAttempt {
    role: ForegroundRole,
    slot: CompletionSlot<Result<ForegroundOutcome, TransferError>>,
}

impl ForegroundAttempt {
    fn resolve(&self, outcome: Result<ForegroundOutcome, TransferError>) {
        // Adapters can deliver both a processing error and a late
        // invalidation for the same attempt; only the first wins.
        if !self.slot.resolve(outcome) {
            debug!("ignoring callback after terminal outcome");
        }
    }
}

/// Manager for foreground (one-tap) exchanges.
///
/// At most one call is in flight at a time; a concurrent second call is
/// rejected with [`TransferError::SessionBusy`] rather than raced.
pub struct SessionManager<A: NfcAdapter + 'static> {
    adapter: Arc<A>,
    arbiter: Arc<RadioArbiter>,
    events: Arc<EventDispatcher>,
    in_flight: AtomicBool,
    state: Mutex<ForegroundState>,
}

impl<A: NfcAdapter + 'static> SessionManager<A> {
    /// Creates a session manager over the given adapter.
    pub fn new(adapter: Arc<A>, arbiter: Arc<RadioArbiter>, events: Arc<EventDispatcher>) -> Self {
        SessionManager {
            adapter,
            arbiter,
            events,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(ForegroundState::Idle),
        }
    }

    /// Returns the state of the current or last attempt.
    pub fn state(&self) -> ForegroundState {
        self.state.lock().unwrap().clone()
    }

    /// Sends `contact` to the first peer tag detected.
    ///
    /// Blocks until the attempt reaches its terminal state: on the first
    /// detection the manager connects, queries capability, encodes the
    /// contact, and writes the envelope; the session is invalidated after
    /// this one attempt and never reused.
    pub fn send(&self, contact: &Contact) -> Result<(), TransferError> {
        match self.run_attempt(ForegroundRole::Send(contact.clone()))? {
            ForegroundOutcome::Sent => Ok(()),
            ForegroundOutcome::Received(_) => {
                Err(TransferError::Unknown("unexpected receive outcome".into()))
            }
        }
    }

    /// Receives one contact from the first peer message detected.
    ///
    /// Blocks until the attempt reaches its terminal state. A detection
    /// carrying a malformed record fails the attempt with
    /// [`TransferError::InvalidData`].
    pub fn receive(&self) -> Result<Contact, TransferError> {
        match self.run_attempt(ForegroundRole::Receive)? {
            ForegroundOutcome::Received(contact) => Ok(contact),
            ForegroundOutcome::Sent => {
                Err(TransferError::Unknown("unexpected send outcome".into()))
            }
        }
    }

    fn run_attempt(
        &self,
        role: ForegroundRole,
    ) -> Result<ForegroundOutcome, TransferError> {
        if !self.adapter.reading_available() {
            return Err(TransferError::Unsupported);
        }

        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(TransferError::SessionBusy);
        }

        let outcome = self.run_attempt_inner(role);
        self.in_flight.store(false, Ordering::SeqCst);

        *self.state.lock().unwrap() = match &outcome {
            Ok(_) => ForegroundState::Completed,
            Err(err) => ForegroundState::Failed(err.clone()),
        };
        self.events.dispatch(ExchangeEvent::SessionEnded {
            success: outcome.is_ok(),
            error: outcome.as_ref().err().cloned(),
        });

        outcome
    }

    fn run_attempt_inner(
        &self,
        role: ForegroundRole,
    ) -> Result<ForegroundOutcome, TransferError> {
        self.arbiter.acquire_foreground()?;

        let mode = match role {
            ForegroundRole::Send(_) => SessionMode::Send,
            ForegroundRole::Receive => SessionMode::Receive,
        };
        let attempt = Arc::new(ForegroundAttempt {
            role,
            slot: CompletionSlot::new(),
        });
        let delegate: Arc<dyn SessionDelegate> = Arc::new(ForegroundDelegate {
            attempt: Arc::clone(&attempt),
        });

        // Read-once/write-once: the platform invalidates the session after
        // the first completed attempt.
        let begun = self.adapter.begin(mode, true, delegate);
        if let Err(err) = begun {
            self.arbiter.release_foreground();
            return Err(err.into());
        }

        *self.state.lock().unwrap() = ForegroundState::Started;
        self.events.dispatch(ExchangeEvent::SessionStarted);

        let outcome = attempt.slot.wait();
        self.arbiter.release_foreground();
        outcome
    }
}

/// Delegate bridging adapter callbacks into the attempt's completion slot.
struct ForegroundDelegate {
    attempt: Arc<ForegroundAttempt>,
}

impl ForegroundDelegate {
    /// Sender path: detection always precedes connect, connect precedes
    /// query, query precedes write; invalidation is last.
    fn send_to_tag(&self, session: &dyn TagSession, contact: &Contact, tags: &[TagRef]) {
        let Some(tag) = tags.first() else {
            self.attempt
                .resolve(Err(TransferError::Unknown("no tag detected".into())));
            session.invalidate_with_reason("No tag detected");
            return;
        };

        if let Err(err) = session.connect(tag) {
            self.attempt.resolve(Err(err.clone().into()));
            session.invalidate_with_reason(&format!("Connection failed: {err}"));
            return;
        }

        if let Err(err) = session.query_capability(tag) {
            self.attempt.resolve(Err(err.clone().into()));
            session.invalidate_with_reason(&format!("Query failed: {err}"));
            return;
        }

        let record = match codec::encode_contact(contact) {
            Ok(record) => record,
            Err(err) => {
                self.attempt.resolve(Err(err.into()));
                session.invalidate_with_reason("Failed to encode contact data");
                return;
            }
        };

        match session.write(tag, &NdefMessage::single(record)) {
            Ok(()) => {
                self.attempt.resolve(Ok(ForegroundOutcome::Sent));
                session.invalidate();
            }
            Err(err) => {
                self.attempt.resolve(Err(err.clone().into()));
                session.invalidate_with_reason(&format!("Write failed: {err}"));
            }
        }
    }
}

impl SessionDelegate for ForegroundDelegate {
    fn on_tags_detected(&self, session: &dyn TagSession, tags: Vec<TagRef>) {
        match &self.attempt.role {
            ForegroundRole::Send(contact) => self.send_to_tag(session, contact, &tags),
            // The reader path is driven by message delivery.
            ForegroundRole::Receive => {}
        }
    }

    fn on_messages(&self, _session: &dyn TagSession, messages: Vec<NdefMessage>) {
        match &self.attempt.role {
            ForegroundRole::Receive => {
                let outcome = codec::decode_first(&messages)
                    .map(ForegroundOutcome::Received)
                    .map_err(TransferError::from);
                self.attempt.resolve(outcome);
                // The session was begun in invalidate-after-first-read
                // mode; the platform closes it from here.
            }
            ForegroundRole::Send(_) => {}
        }
    }

    fn on_invalidated(&self, termination: SessionTermination) {
        self.attempt
            .resolve(Err(TransferError::from_termination(termination)));
    }
}
