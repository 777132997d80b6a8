//! Inbound-message dispatch and session composition.
//!
//! A [`SessionCore`] ties one transport to the three per-session
//! controllers: the session monitor, the discovery controller, and the
//! channel streaming producer. Transport events are applied one at a
//! time, in arrival order; the streaming producer's emission loop is
//! the only background activity, so a slow send never stalls inbound
//! dispatch.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::etp::connection::Connection;
use crate::etp::discovery::DiscoveryController;
use crate::etp::session::SessionMonitor;
use crate::etp::streaming::{ChannelStreamingProducer, Simulation};
use crate::etp::transport::{Transport, TransportEvent};
use crate::etp::types::{EtpMessage, MessageBody};
use crate::utils::error::EtpResult;

/// One protocol session: transport, negotiated state, and controllers
pub struct SessionCore {
    connection: Connection,
    transport: Arc<dyn Transport>,
    monitor: SessionMonitor,
    discovery: DiscoveryController,
    producer: ChannelStreamingProducer,
}

impl std::fmt::Debug for SessionCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCore")
            .field("connection", &self.connection)
            .field("monitor", &self.monitor)
            .field("discovery", &self.discovery)
            .field("producer", &self.producer)
            .finish()
    }
}

impl SessionCore {
    /// Builds a session core over `transport` for `connection`
    pub fn new(
        connection: Connection,
        transport: Arc<dyn Transport>,
        simulation: Simulation,
        settings: &Settings,
    ) -> Self {
        let discovery = DiscoveryController::new(Arc::clone(&transport));
        let producer =
            ChannelStreamingProducer::new(Arc::clone(&transport), simulation, &settings.streaming);
        Self {
            connection,
            transport,
            monitor: SessionMonitor::new(),
            discovery,
            producer,
        }
    }

    /// The connection profile this session was built from
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The transport messages are sent through
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Session state and capability queries
    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }

    /// The discovery controller and its resource tree
    pub fn discovery(&self) -> &DiscoveryController {
        &self.discovery
    }

    /// The channel streaming producer
    pub fn producer(&self) -> &ChannelStreamingProducer {
        &self.producer
    }

    /// Runs the dispatch loop until the transport closes or the event
    /// stream ends.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            let closed = matches!(event, TransportEvent::Closed);
            self.handle_event(event).await;
            if closed {
                break;
            }
        }
    }

    /// Applies one transport event.
    ///
    /// A send failure during dispatch is treated like an unsolicited
    /// close: dependent state is torn down and the failure is logged.
    pub async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => debug!("transport opened"),
            TransportEvent::Closed => {
                debug!("transport closed");
                self.teardown();
            }
            TransportEvent::Message(message) => {
                if let Err(error) = self.dispatch(message).await {
                    warn!(%error, "transport failure during dispatch, closing session");
                    self.teardown();
                }
            }
        }
    }

    async fn dispatch(&mut self, message: EtpMessage) -> EtpResult<()> {
        let EtpMessage { header, body } = message;
        match body {
            MessageBody::OpenSession(open) => {
                self.monitor
                    .on_session_opened(&open.session_id, &open.supported_protocols);
            }
            MessageBody::CloseSession(close) => {
                debug!(reason = ?close.reason, "close session received");
                self.teardown();
            }
            MessageBody::GetResourcesResponse(response) => {
                self.discovery.on_resources_response(&header, response);
            }
            MessageBody::Start(start) => {
                self.producer.on_start(&header, start).await?;
            }
            MessageBody::ChannelStreamingStart(request) => {
                self.producer.on_channel_streaming_start(&header, request);
            }
            MessageBody::ChannelStreamingStop(_) => {
                self.producer.on_channel_streaming_stop();
            }
            _ => {
                debug!(protocol = %header.protocol, "no handler for inbound message");
            }
        }
        Ok(())
    }

    /// Tears down all per-session derived state. Session close is a
    /// superset of an explicit streaming stop.
    fn teardown(&mut self) {
        self.producer.on_channel_streaming_stop();
        self.discovery.reset();
        self.monitor.on_session_closed();
    }

    /// Requests the resources under `uri` (user intent)
    pub async fn get_resources(&mut self, uri: &str) -> EtpResult<()> {
        self.discovery.get_resources(&self.monitor, uri).await
    }

    /// Reloads the children of the node at `uri` (user intent)
    pub async fn refresh_node(&mut self, uri: &str) -> EtpResult<()> {
        self.discovery.refresh_node(&self.monitor, uri).await
    }

    /// Selects the resource at `uri`
    pub fn select_resource(&mut self, uri: &str) {
        self.discovery.select(uri);
    }

    /// Requests details of the selected object
    pub async fn get_object(&self) -> EtpResult<()> {
        self.discovery.get_object(&self.monitor).await
    }

    /// Deletes the selected object once the caller has confirmed
    pub async fn delete_object(&mut self, confirmed: bool) -> EtpResult<()> {
        self.discovery.delete_object(&self.monitor, confirmed).await
    }
}
