// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Session lifecycle and background-exchange events, delivered through a
//! listener trait rather than mutable closure fields.

use std::sync::{Arc, Mutex};

use crate::contact::Contact;

use super::error::TransferError;

/// Events emitted by the exchange engine.
#[derive(Debug, Clone)]
pub enum ExchangeEvent {
    /// A foreground session was opened and is polling for a peer.
    SessionStarted,

    /// A foreground session reached its terminal state.
    ///
    /// Emitted exactly once per attempt.
    SessionEnded {
        /// Whether the exchange completed.
        success: bool,
        /// The failure, if any.
        error: Option<TransferError>,
    },

    /// The background detector decoded a contact from a nearby peer.
    PeerContactReceived {
        /// The received contact.
        contact: Contact,
    },
}

/// Event handler trait.
///
/// Implement this trait to receive exchange events. Handlers may be invoked
/// from adapter callback threads.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: ExchangeEvent);
}

/// Simple callback-based event handler.
///
/// Wraps a closure for easy event handling.
pub struct CallbackHandler<F>
where
    F: Fn(ExchangeEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(ExchangeEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(ExchangeEvent) + Send + Sync,
{
    fn on_event(&self, event: ExchangeEvent) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Mutex<Vec<Arc<dyn EventHandler>>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Adds an event handler.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.lock().unwrap().push(handler);
    }

    /// Removes all handlers.
    pub fn clear_handlers(&self) {
        self.handlers.lock().unwrap().clear();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: ExchangeEvent) {
        let handlers = self.handlers.lock().unwrap().clone();
        for handler in handlers {
            handler.on_event(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_dispatch_reaches_all_handlers() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let count = Arc::clone(&count);
            dispatcher.add_handler(Arc::new(CallbackHandler::new(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })));
        }

        dispatcher.dispatch(ExchangeEvent::SessionStarted);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_clear_handlers() {
        let dispatcher = EventDispatcher::new();
        dispatcher.add_handler(Arc::new(CallbackHandler::new(|_| {})));
        assert_eq!(dispatcher.handler_count(), 1);
        dispatcher.clear_handlers();
        assert_eq!(dispatcher.handler_count(), 0);
    }
}
