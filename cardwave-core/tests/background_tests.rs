//! Background Detector Tests
//!
//! The silent exchange loop: persistent listening, decode-drop of malformed
//! peer data, auto-respond, bounded-backoff restart, and synchronous stop.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cardwave_core::codec::{decode_first, encode_contact};
use cardwave_core::contact::Contact;
use cardwave_core::exchange::{
    BackgroundConfig, BackgroundDetector, DetectorPhase, EventDispatcher, EventHandler,
    ExchangeEvent, RadioArbiter,
};
use cardwave_core::transport::{
    MockAdapter, NdefMessage, NdefRecord, RecordKind, SessionMode, SessionScript,
    SessionTermination, TagRef, TransportError,
};

const TEST_BACKOFF: Duration = Duration::from_millis(100);

struct PeerRecorder {
    received: Mutex<Vec<Contact>>,
}

impl PeerRecorder {
    fn new() -> Arc<Self> {
        Arc::new(PeerRecorder {
            received: Mutex::new(Vec::new()),
        })
    }

    fn received(&self) -> Vec<Contact> {
        self.received.lock().unwrap().clone()
    }
}

impl EventHandler for PeerRecorder {
    fn on_event(&self, event: ExchangeEvent) {
        if let ExchangeEvent::PeerContactReceived { contact } = event {
            self.received.lock().unwrap().push(contact);
        }
    }
}

fn detector_with_recorder(
    adapter: &Arc<MockAdapter>,
) -> (BackgroundDetector<MockAdapter>, Arc<PeerRecorder>) {
    let events = Arc::new(EventDispatcher::new());
    let recorder = PeerRecorder::new();
    events.add_handler(recorder.clone());
    let detector = BackgroundDetector::new(
        Arc::clone(adapter),
        Arc::new(RadioArbiter::new()),
        events,
        BackgroundConfig {
            restart_backoff: TEST_BACKOFF,
        },
    );
    (detector, recorder)
}

fn envelope_for(contact: &Contact) -> NdefMessage {
    NdefMessage::single(encode_contact(contact).unwrap())
}

fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

// ============================================================
// Arming and the exchange cycle
// ============================================================

#[test]
fn test_start_opens_persistent_listener() {
    let adapter = Arc::new(MockAdapter::new());
    let (detector, _) = detector_with_recorder(&adapter);

    detector.start(Contact::sample());

    assert_eq!(detector.phase(), DetectorPhase::Listening);
    assert_eq!(adapter.begin_count(), 1);

    let session = adapter.session(0).unwrap();
    assert_eq!(session.mode(), SessionMode::Listen);
    assert!(!session.auto_invalidate());
}

#[test]
fn test_start_without_hardware_stays_inactive() {
    let adapter = Arc::new(MockAdapter::unavailable());
    let (detector, _) = detector_with_recorder(&adapter);

    detector.start(Contact::sample());

    assert_eq!(detector.phase(), DetectorPhase::Inactive);
    assert_eq!(adapter.begin_count(), 0);
}

#[test]
fn test_peer_contact_emitted_and_auto_responded() {
    let local = Contact::new("Me", "111", "me@x.com");
    let peer = Contact::new("Bob", "456", "b@x.com");

    let adapter = Arc::new(MockAdapter::new());
    let (detector, recorder) = detector_with_recorder(&adapter);
    detector.start(local.clone());

    let session = adapter.session(0).unwrap();
    session.detect(vec![TagRef::new(7)]);
    assert_eq!(detector.phase(), DetectorPhase::Connected);

    session.deliver(vec![envelope_for(&peer)]);

    // Notification first, then the write-back of the local contact.
    assert_eq!(recorder.received(), vec![peer]);
    let written = session.written();
    assert_eq!(written.len(), 1);
    assert_eq!(decode_first(&written).unwrap(), local);
    assert_eq!(session.ops(), vec!["connect", "query", "write"]);
}

#[test]
fn test_malformed_peer_data_is_dropped_silently() {
    let adapter = Arc::new(MockAdapter::new());
    let (detector, recorder) = detector_with_recorder(&adapter);
    detector.start(Contact::sample());

    let session = adapter.session(0).unwrap();
    session.detect(vec![TagRef::new(7)]);
    session.deliver(vec![NdefMessage::single(NdefRecord {
        kind: RecordKind::Media,
        record_type: "application/json".into(),
        identifier: "com.nfccontactshare.contact".into(),
        payload: b"not-json".to_vec(),
    })]);

    assert!(recorder.received().is_empty());
    assert!(!session.invalidated());

    // The loop is still alive: a valid message afterwards goes through.
    let peer = Contact::new("Bob", "456", "b@x.com");
    session.deliver(vec![envelope_for(&peer)]);
    assert_eq!(recorder.received(), vec![peer]);
}

#[test]
fn test_auto_respond_failure_keeps_notification() {
    let peer = Contact::new("Bob", "456", "b@x.com");
    let adapter = Arc::new(MockAdapter::new());
    adapter.push_script(SessionScript {
        write_error: Some(TransportError::WriteFailed("peer left".into())),
        ..Default::default()
    });
    let (detector, recorder) = detector_with_recorder(&adapter);
    detector.start(Contact::sample());

    let session = adapter.session(0).unwrap();
    session.detect(vec![TagRef::new(7)]);
    session.deliver(vec![envelope_for(&peer)]);

    // The failed write-back neither retracts the notification nor kills
    // the loop.
    assert_eq!(recorder.received(), vec![peer]);
    assert!(session.written().is_empty());
    assert!(!session.invalidated());
    assert!(detector.is_active());
}

#[test]
fn test_message_without_detected_tag_skips_auto_respond() {
    let peer = Contact::new("Bob", "456", "b@x.com");
    let adapter = Arc::new(MockAdapter::new());
    let (detector, recorder) = detector_with_recorder(&adapter);
    detector.start(Contact::sample());

    let session = adapter.session(0).unwrap();
    session.deliver(vec![envelope_for(&peer)]);

    assert_eq!(recorder.received(), vec![peer]);
    assert!(session.written().is_empty());
}

// ============================================================
// Restart loop
// ============================================================

#[test]
fn test_restart_after_invalidation_within_backoff() {
    let adapter = Arc::new(MockAdapter::new());
    let (detector, _) = detector_with_recorder(&adapter);
    detector.start(Contact::sample());

    adapter
        .session(0)
        .unwrap()
        .terminate(SessionTermination::Other("peer departed".into()));

    // No instant re-arm, but a new listener within the backoff window.
    assert_eq!(adapter.begin_count(), 1);
    assert!(wait_until(TEST_BACKOFF * 10, || adapter.begin_count() == 2));

    let session = adapter.session(1).unwrap();
    assert_eq!(session.mode(), SessionMode::Listen);
    assert_eq!(detector.phase(), DetectorPhase::Listening);
}

#[test]
fn test_restart_survives_repeated_invalidation() {
    let adapter = Arc::new(MockAdapter::new());
    let (detector, _) = detector_with_recorder(&adapter);
    detector.start(Contact::sample());

    for cycle in 0..3 {
        adapter
            .session(cycle)
            .unwrap()
            .terminate(SessionTermination::TimedOut);
        assert!(wait_until(TEST_BACKOFF * 10, || {
            adapter.begin_count() == cycle + 2
        }));
    }
    assert!(detector.is_active());
}

#[test]
fn test_stop_cancels_pending_restart() {
    let adapter = Arc::new(MockAdapter::new());
    let (detector, _) = detector_with_recorder(&adapter);
    detector.start(Contact::sample());

    adapter
        .session(0)
        .unwrap()
        .terminate(SessionTermination::Other("peer departed".into()));
    detector.stop();

    // Give the canceled timer every chance to misfire.
    thread::sleep(TEST_BACKOFF * 4);
    assert_eq!(adapter.begin_count(), 1);
    assert_eq!(detector.phase(), DetectorPhase::Inactive);
}

#[test]
fn test_stop_invalidates_listener() {
    let adapter = Arc::new(MockAdapter::new());
    let (detector, _) = detector_with_recorder(&adapter);
    detector.start(Contact::sample());

    detector.stop();

    assert!(adapter.session(0).unwrap().invalidated());
    assert_eq!(detector.phase(), DetectorPhase::Inactive);

    // The stop-triggered invalidation must not schedule a restart.
    thread::sleep(TEST_BACKOFF * 4);
    assert_eq!(adapter.begin_count(), 1);
}

#[test]
fn test_back_to_back_start_stop_cycles() {
    let adapter = Arc::new(MockAdapter::new());
    let (detector, _) = detector_with_recorder(&adapter);

    for cycle in 0..2 {
        detector.start(Contact::sample());
        assert_eq!(adapter.begin_count(), cycle + 1);
        detector.stop();
        assert_eq!(detector.phase(), DetectorPhase::Inactive);
    }

    thread::sleep(TEST_BACKOFF * 4);
    assert_eq!(adapter.begin_count(), 2);
    assert_eq!(detector.phase(), DetectorPhase::Inactive);
}

#[test]
fn test_stale_session_callbacks_are_ignored() {
    let adapter = Arc::new(MockAdapter::new());
    let (detector, recorder) = detector_with_recorder(&adapter);
    detector.start(Contact::sample());

    let first = adapter.session(0).unwrap();
    first.terminate(SessionTermination::Other("peer departed".into()));
    assert!(wait_until(TEST_BACKOFF * 10, || adapter.begin_count() == 2));

    // A message surfacing late from the replaced session must not reach
    // the caller or disturb the new listener.
    first.deliver(vec![envelope_for(&Contact::sample())]);
    assert!(recorder.received().is_empty());
    assert_eq!(detector.phase(), DetectorPhase::Listening);
}
