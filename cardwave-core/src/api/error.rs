// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the CardWave API layer.

use thiserror::Error;

use crate::exchange::TransferError;
use crate::settings::SettingsError;

/// Unified error type for CardWave operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardWaveError {
    /// An exchange attempt failed.
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Settings persistence failed.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}

/// Result type for CardWave operations.
pub type CardWaveResult<T> = Result<T, CardWaveError>;
