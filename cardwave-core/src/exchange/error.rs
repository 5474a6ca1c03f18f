// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exchange Error Types

use thiserror::Error;

use crate::codec::CodecError;
use crate::transport::{SessionTermination, TransportError};

/// Errors surfaced by a foreground exchange attempt.
///
/// `Timeout` covers every benign termination the platform reports (first
/// read completed, user canceled, detection window expired) and is
/// user-retryable; `Unsupported` is fatal and reported before any session
/// is opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The device has no usable NFC hardware.
    #[error("NFC is not supported on this device")]
    Unsupported,

    /// The session ended normally without completing a transfer.
    #[error("the session ended before a transfer completed")]
    Timeout,

    /// Transport-level read failure.
    #[error("read error: {0}")]
    ReadError(String),

    /// Transport-level write failure.
    #[error("write error: {0}")]
    WriteError(String),

    /// The peer's payload failed codec validation, or the outgoing contact
    /// could not be encoded.
    #[error("received data is not a valid contact")]
    InvalidData,

    /// A foreground exchange is already in flight.
    #[error("another exchange is already in progress")]
    SessionBusy,

    /// Unclassified adapter error.
    #[error("transfer failed: {0}")]
    Unknown(String),
}

impl TransferError {
    /// Classifies a session termination reported by the adapter.
    pub fn from_termination(termination: SessionTermination) -> Self {
        match termination {
            SessionTermination::FirstObjectRead
            | SessionTermination::UserCanceled
            | SessionTermination::TimedOut => TransferError::Timeout,
            SessionTermination::Other(msg) => TransferError::Unknown(msg),
        }
    }
}

impl From<TransportError> for TransferError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotSupported => TransferError::Unsupported,
            TransportError::ReadFailed(msg) => TransferError::ReadError(msg),
            TransportError::WriteFailed(msg) => TransferError::WriteError(msg),
            TransportError::ConnectFailed(_)
            | TransportError::QueryFailed(_)
            | TransportError::SessionInvalidated => TransferError::Unknown(err.to_string()),
        }
    }
}

impl From<CodecError> for TransferError {
    fn from(_: CodecError) -> Self {
        TransferError::InvalidData
    }
}
