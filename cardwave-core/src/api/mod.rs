// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CardWave API Layer
//!
//! High-level entry point coordinating settings, foreground exchanges, the
//! background detector, and event handling.
//!
//! # Example
//!
//! ```ignore
//! use cardwave_core::api::CardWave;
//! use cardwave_core::settings::MemorySettingsStore;
//! use cardwave_core::transport::MockAdapter;
//!
//! let cw = CardWave::new(Arc::new(MockAdapter::new()), Box::new(MemorySettingsStore::new()))?;
//! cw.set_user_contact(Contact::new("Alice", "+1 555", "alice@example.com"))?;
//!
//! // One-tap exchange
//! cw.send_contact()?;
//! let received = cw.receive_contact()?;
//!
//! // Silent mutual exchange
//! cw.start_auto_detection();
//! // ...
//! cw.stop_auto_detection();
//! ```

#[cfg(feature = "testing")]
pub mod cardwave;
#[cfg(not(feature = "testing"))]
mod cardwave;

#[cfg(feature = "testing")]
pub mod error;
#[cfg(not(feature = "testing"))]
mod error;

pub use cardwave::CardWave;
pub use error::{CardWaveError, CardWaveResult};
