//! Session state tracking and capability enablement.
//!
//! The [`SessionMonitor`] records which protocols were negotiated for
//! the active session and answers enablement queries for the
//! capability-dependent features built on top of it. Observers receive
//! a [`SessionEvent`] whenever a capability's enablement flips, so UI
//! state can follow asynchronous session events without polling.

use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::debug;

use crate::etp::types::{Protocol, SupportedProtocol};

/// Notifications published by the session monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was negotiated
    Opened {
        /// Server-assigned session identifier
        session_id: String,
    },
    /// The session ended
    Closed,
    /// A capability-dependent feature was enabled or disabled
    CapabilityChanged {
        /// The capability whose enablement flipped
        protocol: Protocol,
        /// The new enablement state
        enabled: bool,
    },
}

/// Tracks the open/closed state and negotiated capabilities of a session
#[derive(Debug)]
pub struct SessionMonitor {
    open: bool,
    session_id: Option<String>,
    supported: HashSet<Protocol>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for SessionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMonitor {
    /// Creates a monitor with no active session
    pub fn new() -> Self {
        Self {
            open: false,
            session_id: None,
            supported: HashSet::new(),
            events: broadcast::channel(32).0,
        }
    }

    /// Subscribes to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Whether a session is currently open
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Identifier of the open session, if any
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether messages of `protocol` are valid right now.
    ///
    /// Always `false` while no session is open, so callers never need
    /// to special-case "no session".
    pub fn is_capability_enabled(&self, protocol: Protocol) -> bool {
        self.open && self.supported.contains(&protocol)
    }

    /// Records a negotiated session and publishes enablement deltas.
    pub fn on_session_opened(&mut self, session_id: &str, supported: &[SupportedProtocol]) {
        let previously_enabled = if self.open {
            std::mem::take(&mut self.supported)
        } else {
            HashSet::new()
        };

        self.open = true;
        self.session_id = Some(session_id.to_string());
        self.supported = supported.iter().map(|p| p.protocol).collect();

        debug!(session_id, protocols = self.supported.len(), "session opened");
        let _ = self.events.send(SessionEvent::Opened {
            session_id: session_id.to_string(),
        });

        for protocol in previously_enabled.union(&self.supported) {
            let enabled = self.supported.contains(protocol);
            if enabled != previously_enabled.contains(protocol) {
                let _ = self.events.send(SessionEvent::CapabilityChanged {
                    protocol: *protocol,
                    enabled,
                });
            }
        }
    }

    /// Marks the session closed and disables every capability.
    ///
    /// Unconditional: safe to call with no session open.
    pub fn on_session_closed(&mut self) {
        let previously_enabled: Vec<Protocol> = if self.open {
            self.supported.iter().copied().collect()
        } else {
            Vec::new()
        };

        self.open = false;
        self.session_id = None;
        self.supported.clear();

        for protocol in previously_enabled {
            let _ = self.events.send(SessionEvent::CapabilityChanged {
                protocol,
                enabled: false,
            });
        }
        let _ = self.events.send(SessionEvent::Closed);
        debug!("session closed");
    }
}
