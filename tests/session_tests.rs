mod common;

use std::sync::Arc;

use etp_session::config::Settings;
use etp_session::etp::connection::Connection;
use etp_session::etp::dispatcher::SessionCore;
use etp_session::etp::session::{SessionEvent, SessionMonitor};
use etp_session::etp::streaming::Simulation;
use etp_session::etp::transport::{InMemoryTransport, TransportEvent};
use etp_session::etp::types::{
    ChannelMetadataRecord, CloseSession, EtpMessage, GetResourcesResponse, MessageBody,
    MessageHeader, OpenSession, Protocol, ResourceDescriptor, SupportedProtocol,
};

fn open_session_message(protocols: &[Protocol]) -> EtpMessage {
    EtpMessage::request(
        Protocol::Core,
        MessageBody::OpenSession(OpenSession {
            session_id: "session-1".to_string(),
            application_name: "store".to_string(),
            supported_protocols: protocols
                .iter()
                .map(|p| SupportedProtocol::new(*p, "store"))
                .collect(),
        }),
    )
}

#[test]
fn test_capability_queries_are_false_without_session() {
    let monitor = SessionMonitor::new();
    assert!(!monitor.is_open());
    assert!(!monitor.is_capability_enabled(Protocol::Discovery));
    assert!(!monitor.is_capability_enabled(Protocol::ChannelStreaming));
}

#[test]
fn test_open_enables_only_negotiated_capabilities() {
    let mut monitor = SessionMonitor::new();
    monitor.on_session_opened(
        "session-1",
        &[SupportedProtocol::new(Protocol::Discovery, "store")],
    );

    assert!(monitor.is_open());
    assert_eq!(monitor.session_id(), Some("session-1"));
    assert!(monitor.is_capability_enabled(Protocol::Discovery));
    assert!(!monitor.is_capability_enabled(Protocol::ChannelStreaming));
    assert!(!monitor.is_capability_enabled(Protocol::Store));
}

#[test]
fn test_close_disables_every_capability() {
    let mut monitor = SessionMonitor::new();
    monitor.on_session_opened(
        "session-1",
        &[
            SupportedProtocol::new(Protocol::Discovery, "store"),
            SupportedProtocol::new(Protocol::ChannelStreaming, "producer"),
        ],
    );
    monitor.on_session_closed();

    assert!(!monitor.is_open());
    assert_eq!(monitor.session_id(), None);
    assert!(!monitor.is_capability_enabled(Protocol::Discovery));
    assert!(!monitor.is_capability_enabled(Protocol::ChannelStreaming));
}

#[test]
fn test_close_without_session_is_harmless() {
    let mut monitor = SessionMonitor::new();
    monitor.on_session_closed();
    monitor.on_session_closed();
    assert!(!monitor.is_open());
}

#[test]
fn test_enablement_changes_are_published() {
    let mut monitor = SessionMonitor::new();
    let mut events = monitor.subscribe();

    monitor.on_session_opened(
        "session-1",
        &[SupportedProtocol::new(Protocol::Discovery, "store")],
    );
    monitor.on_session_closed();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    assert_eq!(
        seen,
        vec![
            SessionEvent::Opened {
                session_id: "session-1".to_string()
            },
            SessionEvent::CapabilityChanged {
                protocol: Protocol::Discovery,
                enabled: true
            },
            SessionEvent::CapabilityChanged {
                protocol: Protocol::Discovery,
                enabled: false
            },
            SessionEvent::Closed,
        ]
    );
}

#[test]
fn test_renegotiation_publishes_only_deltas() {
    let mut monitor = SessionMonitor::new();
    monitor.on_session_opened(
        "session-1",
        &[SupportedProtocol::new(Protocol::Discovery, "store")],
    );

    let mut events = monitor.subscribe();
    monitor.on_session_opened(
        "session-2",
        &[
            SupportedProtocol::new(Protocol::Discovery, "store"),
            SupportedProtocol::new(Protocol::Store, "store"),
        ],
    );

    let mut changed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::CapabilityChanged { protocol, enabled } = event {
            changed.push((protocol, enabled));
        }
    }
    assert_eq!(changed, vec![(Protocol::Store, true)]);
}

/// Full scenario: open advertising Discovery, fetch resources in two
/// parts, then close and verify every capability is disabled.
#[tokio::test]
async fn test_discovery_session_scenario() {
    let (mut local, mut remote) = InMemoryTransport::pair();
    let _events = local.take_events().expect("fresh transport");
    let mut remote_events = remote.take_events().expect("fresh transport");

    let mut core = SessionCore::new(
        Connection::new("wss://localhost:9002"),
        Arc::new(local),
        Simulation::new("sim").with_channel(ChannelMetadataRecord::new(1, "ROP", "m/h")),
        &Settings::default(),
    );

    core.handle_event(TransportEvent::Message(open_session_message(&[
        Protocol::Discovery,
    ])))
    .await;
    assert!(core.monitor().is_capability_enabled(Protocol::Discovery));

    core.get_resources("eml://").await.unwrap();
    let request = common::next_message(&mut remote_events).await;

    let part_one = EtpMessage {
        header: MessageHeader::response(Protocol::Discovery, request.header.message_id)
            .with_more_follows(),
        body: MessageBody::GetResourcesResponse(GetResourcesResponse {
            resources: vec![ResourceDescriptor::new("eml://a", "A", "Well").with_children(-1)],
        }),
    };
    let part_two = EtpMessage::response(
        Protocol::Discovery,
        request.header.message_id,
        MessageBody::GetResourcesResponse(GetResourcesResponse {
            resources: vec![ResourceDescriptor::new("eml://b", "B", "Well").with_children(-1)],
        }),
    );

    core.handle_event(TransportEvent::Message(part_one)).await;
    core.handle_event(TransportEvent::Message(part_two)).await;

    let uris: Vec<&str> = core
        .discovery()
        .roots()
        .iter()
        .map(|node| node.resource.uri.as_str())
        .collect();
    assert_eq!(uris, vec!["eml://a", "eml://b"]);

    core.handle_event(TransportEvent::Message(EtpMessage::request(
        Protocol::Core,
        MessageBody::CloseSession(CloseSession { reason: None }),
    )))
    .await;

    assert!(!core.monitor().is_capability_enabled(Protocol::Discovery));
    assert!(core.discovery().roots().is_empty());
}

/// Transport closure tears down all per-session state, including any
/// active streaming task.
#[tokio::test(start_paused = true)]
async fn test_transport_close_is_full_teardown() {
    let (mut local, mut remote) = InMemoryTransport::pair();
    let _events = local.take_events().expect("fresh transport");
    let mut remote_events = remote.take_events().expect("fresh transport");

    let mut core = SessionCore::new(
        Connection::new("wss://localhost:9002"),
        Arc::new(local),
        Simulation::new("sim").with_channel(ChannelMetadataRecord::new(1, "ROP", "m/h")),
        &Settings::default(),
    );

    core.handle_event(TransportEvent::Message(open_session_message(&[
        Protocol::Discovery,
        Protocol::ChannelStreaming,
    ])))
    .await;

    core.handle_event(TransportEvent::Message(EtpMessage::request(
        Protocol::ChannelStreaming,
        MessageBody::Start(etp_session::etp::types::Start {
            max_data_items: 10,
            max_message_rate: 100,
        }),
    )))
    .await;
    assert!(core.producer().is_streaming());

    // Metadata response goes out before any data
    let metadata = common::next_message(&mut remote_events).await;
    assert!(matches!(metadata.body, MessageBody::ChannelMetadata(_)));

    core.handle_event(TransportEvent::Closed).await;

    assert!(!core.producer().is_streaming());
    assert!(!core.monitor().is_open());
    assert!(core.discovery().roots().is_empty());
}
