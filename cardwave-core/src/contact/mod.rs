// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Module
//!
//! The contact record exchanged between devices: an opaque unique id plus
//! plain-text name, phone number, and email. The core performs no field
//! validation; callers gate on non-empty fields before initiating a send.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contact record.
///
/// Equality is by value across all fields. Field names on the wire are
/// camelCase (`phoneNumber`) for compatibility with existing peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Opaque unique token identifying this record.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Phone number, free-form text.
    pub phone_number: String,
    /// Email address, free-form text.
    pub email: String,
}

impl Contact {
    /// Creates a contact with a freshly generated id.
    pub fn new(name: &str, phone_number: &str, email: &str) -> Self {
        Contact {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone_number: phone_number.to_string(),
            email: email.to_string(),
        }
    }

    /// Creates an empty contact (all text fields blank, fresh id).
    pub fn empty() -> Self {
        Contact::new("", "", "")
    }

    /// Sample contact for previews and tests.
    pub fn sample() -> Self {
        Contact::new("John Doe", "+1 (555) 123-4567", "john.doe@example.com")
    }

    /// Returns true if the display name is non-empty.
    ///
    /// Auto-share only starts for contacts that pass this check.
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}
