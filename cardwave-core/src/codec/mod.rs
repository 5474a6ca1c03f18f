// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Record Codec
//!
//! Serializes a [`Contact`] into the NDEF envelope written over the radio
//! and validates incoming envelopes back into contacts. The envelope format
//! is fixed for interoperability: a media record typed `application/json`
//! with identifier `com.nfccontactshare.contact`, carrying the UTF-8 JSON
//! serialization of the contact.
//!
//! Decoding is strict: anything that is not a media record with a fully
//! Contact-shaped JSON payload is rejected.

use thiserror::Error;

use crate::contact::Contact;
use crate::transport::{NdefMessage, NdefRecord, RecordKind};

/// MIME type of every contact envelope.
pub const CONTACT_MIME_TYPE: &str = "application/json";

/// Record identifier of every contact envelope.
pub const CONTACT_RECORD_ID: &str = "com.nfccontactshare.contact";

/// Codec errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Serializing the contact failed. Not expected for well-formed
    /// string fields.
    #[error("contact serialization failed: {0}")]
    Encode(String),

    /// The envelope is not a valid contact record.
    #[error("payload is not a valid contact record")]
    InvalidData,
}

/// Encodes a contact into its wire envelope.
///
/// The record type and identifier are constants independent of the
/// contact's content.
pub fn encode_contact(contact: &Contact) -> Result<NdefRecord, CodecError> {
    let payload = serde_json::to_vec(contact).map_err(|e| CodecError::Encode(e.to_string()))?;

    Ok(NdefRecord {
        kind: RecordKind::Media,
        record_type: CONTACT_MIME_TYPE.to_string(),
        identifier: CONTACT_RECORD_ID.to_string(),
        payload,
    })
}

/// Decodes a contact from a wire envelope.
///
/// Succeeds only if the record kind is media, the payload is valid UTF-8,
/// and the text parses as a Contact-shaped JSON object.
pub fn decode_contact(record: &NdefRecord) -> Result<Contact, CodecError> {
    if record.kind != RecordKind::Media {
        return Err(CodecError::InvalidData);
    }

    let text = std::str::from_utf8(&record.payload).map_err(|_| CodecError::InvalidData)?;

    serde_json::from_str(text).map_err(|_| CodecError::InvalidData)
}

/// Decodes the first record of the first message.
///
/// This is the shape both exchange paths receive from the adapter's
/// detection callback.
pub fn decode_first(messages: &[NdefMessage]) -> Result<Contact, CodecError> {
    let record = messages
        .first()
        .and_then(NdefMessage::first_record)
        .ok_or(CodecError::InvalidData)?;

    decode_contact(record)
}
