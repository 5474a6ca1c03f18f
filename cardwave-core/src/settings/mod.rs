// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! User Settings
//!
//! Persistence of the local user's contact and the auto-share switch. The
//! store is a single JSON blob; a missing store loads defaults.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contact::Contact;

/// Settings errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Persisting the settings failed.
    #[error("failed to save settings")]
    SaveFailed,

    /// The stored settings could not be read or parsed.
    #[error("failed to load settings")]
    LoadFailed,
}

/// The local user's settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// The contact seeded into sends and background detection.
    pub user_contact: Contact,
    /// Whether background auto-share is enabled.
    pub auto_share_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        UserSettings {
            user_contact: Contact::empty(),
            auto_share_enabled: true,
        }
    }
}

/// Settings persistence boundary.
pub trait SettingsStore: Send + Sync {
    /// Persists the settings.
    fn save(&self, settings: &UserSettings) -> Result<(), SettingsError>;

    /// Loads the settings, or defaults if none were saved yet.
    fn load(&self) -> Result<UserSettings, SettingsError>;
}

/// File-backed JSON settings store.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Creates a store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSettingsStore { path: path.into() }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn save(&self, settings: &UserSettings) -> Result<(), SettingsError> {
        let data = serde_json::to_vec(settings).map_err(|_| SettingsError::SaveFailed)?;
        fs::write(&self.path, data).map_err(|_| SettingsError::SaveFailed)
    }

    fn load(&self) -> Result<UserSettings, SettingsError> {
        if !self.path.exists() {
            return Ok(UserSettings::default());
        }
        let data = fs::read(&self.path).map_err(|_| SettingsError::LoadFailed)?;
        serde_json::from_slice(&data).map_err(|_| SettingsError::LoadFailed)
    }
}

/// In-memory settings store for tests.
#[derive(Default)]
pub struct MemorySettingsStore {
    inner: Mutex<Option<UserSettings>>,
}

impl MemorySettingsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemorySettingsStore::default()
    }

    /// Creates a store pre-loaded with the given settings.
    pub fn with_settings(settings: UserSettings) -> Self {
        MemorySettingsStore {
            inner: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn save(&self, settings: &UserSettings) -> Result<(), SettingsError> {
        *self.inner.lock().unwrap() = Some(settings.clone());
        Ok(())
    }

    fn load(&self) -> Result<UserSettings, SettingsError> {
        Ok(self.inner.lock().unwrap().clone().unwrap_or_default())
    }
}
