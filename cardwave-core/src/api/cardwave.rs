// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CardWave Orchestrator
//!
//! Main entry point for the CardWave API. Wires one adapter, one radio
//! arbiter, one event dispatcher, the foreground session manager, and the
//! background detector, and seeds exchanges from the persisted user
//! contact.

use std::sync::{Arc, Mutex};

use crate::contact::Contact;
use crate::exchange::{
    BackgroundConfig, BackgroundDetector, DetectorPhase, EventDispatcher, EventHandler,
    RadioArbiter, SessionManager,
};
use crate::settings::{SettingsStore, UserSettings};
use crate::transport::NfcAdapter;

use super::error::CardWaveResult;

/// Main CardWave orchestrator.
pub struct CardWave<A: NfcAdapter + 'static> {
    events: Arc<EventDispatcher>,
    session: SessionManager<A>,
    detector: BackgroundDetector<A>,
    store: Box<dyn SettingsStore>,
    settings: Mutex<UserSettings>,
}

impl<A: NfcAdapter + 'static> CardWave<A> {
    /// Creates an orchestrator over the given adapter and settings store.
    pub fn new(adapter: Arc<A>, store: Box<dyn SettingsStore>) -> CardWaveResult<Self> {
        Self::with_config(adapter, store, BackgroundConfig::default())
    }

    /// Creates an orchestrator with custom background tuning.
    pub fn with_config(
        adapter: Arc<A>,
        store: Box<dyn SettingsStore>,
        config: BackgroundConfig,
    ) -> CardWaveResult<Self> {
        let arbiter = Arc::new(RadioArbiter::new());
        let events = Arc::new(EventDispatcher::new());

        let session = SessionManager::new(
            Arc::clone(&adapter),
            Arc::clone(&arbiter),
            Arc::clone(&events),
        );
        let detector = BackgroundDetector::new(adapter, arbiter, Arc::clone(&events), config);

        let settings = store.load()?;

        Ok(CardWave {
            events,
            session,
            detector,
            store,
            settings: Mutex::new(settings),
        })
    }

    /// Adds an event handler.
    pub fn add_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.events.add_handler(handler);
    }

    // === Settings ===

    /// Returns the stored user contact.
    pub fn user_contact(&self) -> Contact {
        self.settings.lock().unwrap().user_contact.clone()
    }

    /// Persists a new user contact.
    ///
    /// A running background detector keeps responding with the contact it
    /// was started with until restarted.
    pub fn set_user_contact(&self, contact: Contact) -> CardWaveResult<()> {
        let mut settings = self.settings.lock().unwrap();
        settings.user_contact = contact;
        self.store.save(&settings)?;
        Ok(())
    }

    /// Returns whether background auto-share is enabled.
    pub fn auto_share_enabled(&self) -> bool {
        self.settings.lock().unwrap().auto_share_enabled
    }

    /// Persists the auto-share switch and starts or stops detection
    /// accordingly.
    pub fn set_auto_share(&self, enabled: bool) -> CardWaveResult<()> {
        {
            let mut settings = self.settings.lock().unwrap();
            settings.auto_share_enabled = enabled;
            self.store.save(&settings)?;
        }

        if enabled {
            self.start_auto_detection();
        } else {
            self.stop_auto_detection();
        }
        Ok(())
    }

    // === Foreground exchange ===

    /// Sends the stored user contact to the first peer detected.
    pub fn send_contact(&self) -> CardWaveResult<()> {
        let contact = self.user_contact();
        self.session.send(&contact)?;
        Ok(())
    }

    /// Receives one contact from the first peer detected.
    pub fn receive_contact(&self) -> CardWaveResult<Contact> {
        Ok(self.session.receive()?)
    }

    // === Background exchange ===

    /// Starts background detection if auto-share is enabled and the user
    /// contact has a name.
    ///
    /// Returns true if detection is active afterward.
    pub fn start_auto_detection(&self) -> bool {
        let settings = self.settings.lock().unwrap().clone();
        if !settings.auto_share_enabled || !settings.user_contact.has_name() {
            return false;
        }
        self.detector.start(settings.user_contact);
        self.detector.is_active()
    }

    /// Stops background detection.
    pub fn stop_auto_detection(&self) {
        self.detector.stop();
    }

    /// Returns the background detector's phase.
    pub fn detector_phase(&self) -> DetectorPhase {
        self.detector.phase()
    }
}
