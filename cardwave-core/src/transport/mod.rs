//! Transport Adapter Boundary
//!
//! Platform-agnostic abstraction over the host's near-field radio primitive.
//! The core never talks to hardware directly: it drives an [`NfcAdapter`],
//! receives detection and invalidation callbacks through a
//! [`SessionDelegate`], and issues connect/query/write/read against the
//! [`TagSession`] it was handed.
//!
//! # Callback threading
//!
//! Adapter implementations may invoke delegate callbacks from hardware-driven
//! threads, and may invoke them synchronously from within `begin()` or
//! `invalidate()`. Consumers must therefore never hold their own state locks
//! across adapter or session calls.
//!
//! # Example
//!
//! ```ignore
//! use cardwave_core::transport::{MockAdapter, NfcAdapter, SessionMode};
//!
//! let adapter = MockAdapter::new();
//! let session = adapter.begin(SessionMode::Receive, true, delegate)?;
//! // ... delegate callbacks drive the exchange ...
//! session.invalidate();
//! ```

#[cfg(feature = "testing")]
pub mod mock;
#[cfg(not(feature = "testing"))]
mod mock;

pub use mock::{MockAdapter, MockSession, SessionScript};

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport-level errors reported by adapter and session operations.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The device has no usable near-field radio.
    #[error("NFC reading is not available on this device")]
    NotSupported,

    /// Connecting to a detected tag failed.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// Querying tag capability failed.
    #[error("capability query failed: {0}")]
    QueryFailed(String),

    /// Reading from the tag failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Writing to the tag failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The session is no longer usable.
    #[error("session is invalidated")]
    SessionInvalidated,
}

/// Role a session is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Foreground sender: detect a peer tag and write one record to it.
    Send,
    /// Foreground reader: wait for one message from a peer.
    Receive,
    /// Background listener: persistent, not invalidated after first read.
    Listen,
}

/// Why a session ended. Delivered through `on_invalidated`, always the last
/// callback for that session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTermination {
    /// The platform closed the session after the first successful read.
    FirstObjectRead,
    /// The user dismissed the session.
    UserCanceled,
    /// The detection window expired without a peer.
    TimedOut,
    /// Anything else the platform reports.
    Other(String),
}

impl SessionTermination {
    /// Benign terminations are the platform's normal ways of ending a
    /// session; they classify as a recoverable timeout, not a fault.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            SessionTermination::FirstObjectRead
                | SessionTermination::UserCanceled
                | SessionTermination::TimedOut
        )
    }
}

impl fmt::Display for SessionTermination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionTermination::FirstObjectRead => write!(f, "first object read"),
            SessionTermination::UserCanceled => write!(f, "user canceled"),
            SessionTermination::TimedOut => write!(f, "detection timed out"),
            SessionTermination::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Opaque reference to a tag the platform detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    id: u32,
}

impl TagRef {
    /// Creates a tag reference with the given platform id.
    pub fn new(id: u32) -> Self {
        TagRef { id }
    }

    /// Returns the platform id.
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// NDEF record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// MIME-typed media record. The only kind the codec accepts.
    Media,
    /// Well-known text record.
    Text,
    /// URI record.
    Uri,
    /// Anything else.
    Unknown,
}

/// A single NDEF record: kind, type string, identifier, payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord {
    /// Record kind.
    pub kind: RecordKind,
    /// Type string (a MIME type for media records).
    pub record_type: String,
    /// Record identifier.
    pub identifier: String,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

/// An NDEF message: an ordered list of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefMessage {
    /// Records in wire order.
    pub records: Vec<NdefRecord>,
}

impl NdefMessage {
    /// Creates a message holding a single record.
    pub fn single(record: NdefRecord) -> Self {
        NdefMessage {
            records: vec![record],
        }
    }

    /// Returns the first record, if any.
    pub fn first_record(&self) -> Option<&NdefRecord> {
        self.records.first()
    }
}

/// Tag write status reported by a capability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStatus {
    /// Tag does not speak NDEF.
    NotSupported,
    /// Tag is readable but locked.
    ReadOnly,
    /// Tag accepts writes.
    ReadWrite,
}

/// Result of querying a detected tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagCapability {
    /// Write status.
    pub status: TagStatus,
    /// Maximum message size in bytes.
    pub capacity: usize,
}

/// Receiver of session callbacks.
///
/// The adapter guarantees `on_invalidated` is the last callback delivered
/// for a session; it does not guarantee anything about which thread any
/// callback arrives on.
pub trait SessionDelegate: Send + Sync {
    /// Raw tags came into range. The sender path connects and writes here.
    fn on_tags_detected(&self, session: &dyn TagSession, tags: Vec<TagRef>);

    /// NDEF messages were read from a detected peer.
    fn on_messages(&self, session: &dyn TagSession, messages: Vec<NdefMessage>);

    /// The session ended.
    fn on_invalidated(&self, termination: SessionTermination);
}

/// An open radio session.
pub trait TagSession: Send + Sync {
    /// Connects to a detected tag. Detection precedes connect.
    fn connect(&self, tag: &TagRef) -> TransportResult<()>;

    /// Queries the connected tag's capability. Connect precedes query.
    fn query_capability(&self, tag: &TagRef) -> TransportResult<TagCapability>;

    /// Writes one NDEF message to the connected tag.
    fn write(&self, tag: &TagRef, message: &NdefMessage) -> TransportResult<()>;

    /// Reads one NDEF message from the connected tag.
    fn read(&self, tag: &TagRef) -> TransportResult<NdefMessage>;

    /// Closes the session cleanly.
    fn invalidate(&self);

    /// Closes the session with a reason shown to the user.
    fn invalidate_with_reason(&self, reason: &str);
}

/// The platform's near-field radio.
pub trait NfcAdapter: Send + Sync {
    /// Returns true if the device can open reader sessions at all.
    fn reading_available(&self) -> bool;

    /// Opens a session.
    ///
    /// `invalidate_after_first_read` selects the platform's single-shot
    /// mode; background listening passes `false` to stay open across
    /// detections. Callbacks for the session go to `delegate` and may start
    /// arriving before `begin` returns.
    fn begin(
        &self,
        mode: SessionMode,
        invalidate_after_first_read: bool,
        delegate: Arc<dyn SessionDelegate>,
    ) -> TransportResult<Arc<dyn TagSession>>;
}
