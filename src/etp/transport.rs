//! Transport layer seam for the session core.
//!
//! The session engine never owns a socket. It depends on a [`Transport`]
//! that frames and sends outbound messages, and on a stream of
//! [`TransportEvent`]s for the open/close lifecycle and inbound
//! messages. Any implementation that honors this contract (WebSocket,
//! TCP, in-process) can drive a session.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::etp::types::EtpMessage;
use crate::utils::error::{EtpError, EtpResult};

/// Events surfaced by a transport to the session core
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The underlying channel is open and messages can flow
    Opened,
    /// A framed inbound message
    Message(EtpMessage),
    /// The underlying channel closed, locally or by the peer
    Closed,
}

/// Transport abstraction for the session layer
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a message through the transport
    async fn send(&self, message: EtpMessage) -> EtpResult<()>;

    /// Close the transport connection
    async fn close(&self) -> EtpResult<()>;

    /// Check if the transport is connected
    fn is_connected(&self) -> bool;
}

/// An in-process transport pair wired back to back.
///
/// A message sent on one side arrives as [`TransportEvent::Message`] on
/// the other. Both event streams begin with [`TransportEvent::Opened`],
/// and closing either side delivers [`TransportEvent::Closed`] to both.
/// Used by tests and process-local sessions in place of a socket.
#[derive(Debug)]
pub struct InMemoryTransport {
    peer: mpsc::UnboundedSender<TransportEvent>,
    local: mpsc::UnboundedSender<TransportEvent>,
    inbound: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    connected: Arc<AtomicBool>,
}

impl InMemoryTransport {
    /// Creates two transports connected to each other
    pub fn pair() -> (InMemoryTransport, InMemoryTransport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));

        let _ = a_tx.send(TransportEvent::Opened);
        let _ = b_tx.send(TransportEvent::Opened);

        (
            Self {
                peer: b_tx.clone(),
                local: a_tx.clone(),
                inbound: Some(a_rx),
                connected: Arc::clone(&connected),
            },
            Self {
                peer: a_tx,
                local: b_tx,
                inbound: Some(b_rx),
                connected,
            },
        )
    }

    /// Takes this side's inbound event stream.
    ///
    /// Returns `None` if the stream was already taken.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
        self.inbound.take()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, message: EtpMessage) -> EtpResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(EtpError::NotConnected);
        }
        self.peer
            .send(TransportEvent::Message(message))
            .map_err(|_| EtpError::ConnectionFailed("peer endpoint dropped".to_string()))
    }

    async fn close(&self) -> EtpResult<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.peer.send(TransportEvent::Closed);
            let _ = self.local.send(TransportEvent::Closed);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
