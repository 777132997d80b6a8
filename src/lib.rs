#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::bare_urls)]
#![deny(clippy::missing_panics_doc)]

//! etp-session is a Rust implementation of the session layer for an
//! ETP-style publish/subscribe data-exchange protocol. It negotiates
//! per-session capabilities, discovers hierarchical resources through
//! request/response exchanges, and streams time-indexed channel data
//! from a cancellable background producer.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use etp_session::config::Settings;
//! use etp_session::etp::connection::Connection;
//! use etp_session::etp::dispatcher::SessionCore;
//! use etp_session::etp::streaming::Simulation;
//! use etp_session::etp::transport::InMemoryTransport;
//! use etp_session::etp::types::ChannelMetadataRecord;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Wire a session core to a transport
//!     let (mut local, _remote) = InMemoryTransport::pair();
//!     let events = local.take_events().expect("fresh transport");
//!
//!     let simulation = Simulation::new("demo")
//!         .with_channel(ChannelMetadataRecord::new(1, "ROP", "m/h"));
//!
//!     let mut core = SessionCore::new(
//!         Connection::new("wss://localhost:9002"),
//!         Arc::new(local),
//!         simulation,
//!         &Settings::default(),
//!     );
//!
//!     // Dispatch inbound messages until the transport closes
//!     core.run(events).await;
//! }
//! ```

/// Core ETP session-layer implementation: types, codec, transport seam,
/// session state, discovery, and streaming.
pub mod etp;

/// Utility modules for error handling and logging setup.
pub mod utils;

/// Configuration management.
pub mod config;

/// Re-exported core types for convenience
///
/// This includes the types most integrations need:
/// - `SessionCore` - Transport-event dispatch and session composition
/// - `SessionMonitor` - Capability enablement queries
/// - `DiscoveryController` - Resource-tree maintenance
/// - `ChannelStreamingProducer` - The streaming producer
/// - `EtpMessage` - The protocol message type
#[doc(hidden)]
pub use etp::{
    dispatcher::SessionCore,
    discovery::DiscoveryController,
    session::SessionMonitor,
    streaming::ChannelStreamingProducer,
    types::{EtpMessage, MessageBody, MessageHeader, Protocol},
};

// Re-export error types
pub use utils::error::{EtpError, EtpResult};
