//! Session layer for an ETP-style publish/subscribe protocol.
//!
//! This module implements the protocol session engine: the session
//! lifecycle with capability negotiation, hierarchical resource
//! discovery over request/response exchanges, and a channel streaming
//! producer that converts a start/stop control protocol into a
//! continuously running, cancellable data-emission loop.
//!
//! ## Architecture
//!
//! - `types`: protocol ids, message headers, and typed message bodies
//! - `codec`: binary wire framing for protocol messages
//! - `transport`: the transport seam the session core depends on
//! - `connection`: the connection profile handed to a transport
//! - `session`: session open/close state and capability enablement
//! - `discovery`: the hierarchical resource tree and its controller
//! - `streaming`: the simulated channel streaming producer
//! - `dispatcher`: inbound-message dispatch wiring it all together
//!
//! The session engine never owns a socket; it depends on the
//! [`transport::Transport`] contract and an event stream, so any
//! framing transport can drive it.

/// Protocol ids, message headers, and typed message bodies
pub mod types;

/// Binary wire framing for protocol messages
pub mod codec;

/// Transport abstraction and the in-process transport pair
pub mod transport;

/// Connection profile consumed by the transport layer
pub mod connection;

/// Session state tracking and capability enablement
pub mod session;

/// Hierarchical resource discovery
pub mod discovery;

/// Channel streaming producer
pub mod streaming;

/// Inbound-message dispatch and session composition
pub mod dispatcher;
