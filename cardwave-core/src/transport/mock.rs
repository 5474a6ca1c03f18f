// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport Adapter
//!
//! A scriptable in-memory adapter for exercising the exchange engine
//! without hardware. Each `begin` consumes the next queued
//! [`SessionScript`]; detections scripted there are delivered synchronously
//! from inside `begin`, which also exercises the re-entrancy rules real
//! adapters impose. Tests can drive later cycles through
//! [`MockSession::detect`], [`MockSession::deliver`], and
//! [`MockSession::terminate`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{
    NdefMessage, NfcAdapter, SessionDelegate, SessionMode, SessionTermination, TagCapability,
    TagRef, TagSession, TagStatus, TransportError, TransportResult,
};

/// Scripted behavior for one mock session.
#[derive(Clone, Default)]
pub struct SessionScript {
    /// Tags reported as detected, synchronously from `begin`.
    pub detect_tags: Vec<TagRef>,
    /// Messages delivered after the tags, synchronously from `begin`.
    pub deliver_messages: Vec<NdefMessage>,
    /// Fail the next `connect` call.
    pub connect_error: Option<TransportError>,
    /// Fail the next `query_capability` call.
    pub query_error: Option<TransportError>,
    /// Fail the next `write` call.
    pub write_error: Option<TransportError>,
    /// Message returned by `read`.
    pub read_message: Option<NdefMessage>,
    /// Termination fired after the scripted deliveries, even if the
    /// session already resolved (late-callback simulation).
    pub terminate_after_delivery: Option<SessionTermination>,
}

impl SessionScript {
    /// A script that detects one tag with the given id.
    pub fn with_tag(id: u32) -> Self {
        SessionScript {
            detect_tags: vec![TagRef::new(id)],
            ..Default::default()
        }
    }

    /// A script that delivers one message.
    pub fn with_message(message: NdefMessage) -> Self {
        SessionScript {
            deliver_messages: vec![message],
            ..Default::default()
        }
    }
}

struct MockSessionState {
    invalidated: bool,
    invalidation_reason: Option<String>,
    connected: Vec<TagRef>,
    written: Vec<NdefMessage>,
    ops: Vec<&'static str>,
}

/// One session opened through the mock adapter.
pub struct MockSession {
    mode: SessionMode,
    auto_invalidate: bool,
    script: SessionScript,
    delegate: Arc<dyn SessionDelegate>,
    state: Mutex<MockSessionState>,
}

impl MockSession {
    fn new(
        mode: SessionMode,
        auto_invalidate: bool,
        script: SessionScript,
        delegate: Arc<dyn SessionDelegate>,
    ) -> Arc<Self> {
        Arc::new(MockSession {
            mode,
            auto_invalidate,
            script,
            delegate,
            state: Mutex::new(MockSessionState {
                invalidated: false,
                invalidation_reason: None,
                connected: Vec::new(),
                written: Vec::new(),
                ops: Vec::new(),
            }),
        })
    }

    /// Runs the begin-time script: detections, deliveries, termination.
    fn run_script(self: &Arc<Self>) {
        let script = self.script.clone();

        if !script.detect_tags.is_empty() && !self.is_invalidated() {
            self.delegate
                .on_tags_detected(self.as_session(), script.detect_tags.clone());
        }

        if !script.deliver_messages.is_empty() && !self.is_invalidated() {
            self.delegate
                .on_messages(self.as_session(), script.deliver_messages.clone());

            if self.auto_invalidate && script.terminate_after_delivery.is_none() {
                self.fire_termination(SessionTermination::FirstObjectRead);
                return;
            }
        }

        if let Some(termination) = script.terminate_after_delivery {
            // Deliberately fired regardless of prior invalidation, to
            // simulate adapters that report a second terminal callback.
            self.mark_invalidated(None);
            self.delegate.on_invalidated(termination);
        }
    }

    fn as_session(self: &Arc<Self>) -> &dyn TagSession {
        &**self
    }

    fn is_invalidated(&self) -> bool {
        self.state.lock().unwrap().invalidated
    }

    fn mark_invalidated(&self, reason: Option<String>) {
        let mut state = self.state.lock().unwrap();
        state.invalidated = true;
        if reason.is_some() {
            state.invalidation_reason = reason;
        }
    }

    fn fire_termination(&self, termination: SessionTermination) {
        {
            let mut state = self.state.lock().unwrap();
            if state.invalidated {
                return;
            }
            state.invalidated = true;
        }
        self.delegate.on_invalidated(termination);
    }

    /// Simulates tags coming into range.
    ///
    /// Fired even on an invalidated session, so tests can model callbacks
    /// surfacing late from a replaced session.
    pub fn detect(self: &Arc<Self>, tags: Vec<TagRef>) {
        self.delegate.on_tags_detected(self.as_session(), tags);
    }

    /// Simulates the platform reading messages from a peer.
    ///
    /// Fired even on an invalidated session, so tests can model callbacks
    /// surfacing late from a replaced session.
    pub fn deliver(self: &Arc<Self>, messages: Vec<NdefMessage>) {
        self.delegate.on_messages(self.as_session(), messages);
    }

    /// Simulates a platform-side termination (peer departed, radio error,
    /// detection window expired).
    pub fn terminate(&self, termination: SessionTermination) {
        self.fire_termination(termination);
    }

    /// Mode the session was opened in.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Whether the platform would close this session after the first read.
    pub fn auto_invalidate(&self) -> bool {
        self.auto_invalidate
    }

    /// True once the session ended, from either side.
    pub fn invalidated(&self) -> bool {
        self.is_invalidated()
    }

    /// The reason given to `invalidate_with_reason`, if any.
    pub fn invalidation_reason(&self) -> Option<String> {
        self.state.lock().unwrap().invalidation_reason.clone()
    }

    /// Tags `connect` was called with, in order.
    pub fn connected(&self) -> Vec<TagRef> {
        self.state.lock().unwrap().connected.clone()
    }

    /// Messages written to the tag, in order.
    pub fn written(&self) -> Vec<NdefMessage> {
        self.state.lock().unwrap().written.clone()
    }

    /// Operation names in call order, for asserting the
    /// connect → query → write ordering.
    pub fn ops(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().ops.clone()
    }
}

impl TagSession for MockSession {
    fn connect(&self, tag: &TagRef) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.invalidated {
            return Err(TransportError::SessionInvalidated);
        }
        state.ops.push("connect");
        if let Some(err) = &self.script.connect_error {
            return Err(err.clone());
        }
        state.connected.push(tag.clone());
        Ok(())
    }

    fn query_capability(&self, _tag: &TagRef) -> TransportResult<TagCapability> {
        let mut state = self.state.lock().unwrap();
        if state.invalidated {
            return Err(TransportError::SessionInvalidated);
        }
        state.ops.push("query");
        if let Some(err) = &self.script.query_error {
            return Err(err.clone());
        }
        Ok(TagCapability {
            status: TagStatus::ReadWrite,
            capacity: 8192,
        })
    }

    fn write(&self, _tag: &TagRef, message: &NdefMessage) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.invalidated {
            return Err(TransportError::SessionInvalidated);
        }
        state.ops.push("write");
        if let Some(err) = &self.script.write_error {
            return Err(err.clone());
        }
        state.written.push(message.clone());
        Ok(())
    }

    fn read(&self, _tag: &TagRef) -> TransportResult<NdefMessage> {
        let mut state = self.state.lock().unwrap();
        if state.invalidated {
            return Err(TransportError::SessionInvalidated);
        }
        state.ops.push("read");
        self.script
            .read_message
            .clone()
            .ok_or_else(|| TransportError::ReadFailed("nothing to read".into()))
    }

    fn invalidate(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.invalidated {
                return;
            }
            state.invalidated = true;
            state.ops.push("invalidate");
        }
        // The platform reports an app-requested close as a user cancel.
        self.delegate
            .on_invalidated(SessionTermination::UserCanceled);
    }

    fn invalidate_with_reason(&self, reason: &str) {
        {
            let mut state = self.state.lock().unwrap();
            if state.invalidated {
                return;
            }
            state.invalidated = true;
            state.invalidation_reason = Some(reason.to_string());
            state.ops.push("invalidate");
        }
        self.delegate
            .on_invalidated(SessionTermination::Other(reason.to_string()));
    }
}

struct MockAdapterState {
    available: bool,
    scripts: VecDeque<SessionScript>,
    sessions: Vec<Arc<MockSession>>,
}

/// In-memory adapter for tests.
pub struct MockAdapter {
    state: Mutex<MockAdapterState>,
}

impl MockAdapter {
    /// Creates an adapter with NFC available and no scripts queued.
    pub fn new() -> Self {
        MockAdapter {
            state: Mutex::new(MockAdapterState {
                available: true,
                scripts: VecDeque::new(),
                sessions: Vec::new(),
            }),
        }
    }

    /// Creates an adapter reporting no NFC hardware.
    pub fn unavailable() -> Self {
        let adapter = MockAdapter::new();
        adapter.state.lock().unwrap().available = false;
        adapter
    }

    /// Queues the script for the next `begin`.
    pub fn push_script(&self, script: SessionScript) {
        self.state.lock().unwrap().scripts.push_back(script);
    }

    /// Number of sessions opened so far.
    pub fn begin_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    /// Returns the nth opened session.
    pub fn session(&self, index: usize) -> Option<Arc<MockSession>> {
        self.state.lock().unwrap().sessions.get(index).cloned()
    }

    /// Returns the most recently opened session.
    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.state.lock().unwrap().sessions.last().cloned()
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        MockAdapter::new()
    }
}

impl NfcAdapter for MockAdapter {
    fn reading_available(&self) -> bool {
        self.state.lock().unwrap().available
    }

    fn begin(
        &self,
        mode: SessionMode,
        invalidate_after_first_read: bool,
        delegate: Arc<dyn SessionDelegate>,
    ) -> TransportResult<Arc<dyn TagSession>> {
        let session = {
            let mut state = self.state.lock().unwrap();
            if !state.available {
                return Err(TransportError::NotSupported);
            }
            let script = state.scripts.pop_front().unwrap_or_default();
            let session = MockSession::new(mode, invalidate_after_first_read, script, delegate);
            state.sessions.push(Arc::clone(&session));
            session
        };

        // Callbacks fire outside the adapter lock, as on real hardware.
        session.run_script();

        Ok(session)
    }
}
