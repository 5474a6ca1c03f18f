//! CardWave Core Library
//!
//! Proximity contact-exchange engine: a session state machine over a
//! near-field radio transport, a JSON-over-NDEF record codec, and a silent
//! self-rearming background exchange loop. The platform radio is reached
//! through the [`transport::NfcAdapter`] boundary; everything above it is
//! platform-independent.

pub mod api;
pub mod codec;
pub mod contact;
pub mod exchange;
pub mod settings;
pub mod transport;

pub use api::{CardWave, CardWaveError, CardWaveResult};
pub use codec::{
    decode_contact, decode_first, encode_contact, CodecError, CONTACT_MIME_TYPE, CONTACT_RECORD_ID,
};
pub use contact::Contact;
pub use exchange::{
    BackgroundConfig, BackgroundDetector, CallbackHandler, DetectorPhase, EventDispatcher,
    EventHandler, ExchangeEvent, ForegroundState, RadioArbiter, RadioOwner, SessionManager,
    TransferError,
};
pub use settings::{
    JsonSettingsStore, MemorySettingsStore, SettingsError, SettingsStore, UserSettings,
};
pub use transport::{
    MockAdapter, MockSession, NdefMessage, NdefRecord, NfcAdapter, RecordKind, SessionDelegate,
    SessionMode, SessionScript, SessionTermination, TagCapability, TagRef, TagSession, TagStatus,
    TransportError,
};
