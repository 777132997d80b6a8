mod common;

use std::sync::Arc;

use etp_session::etp::discovery::{DiscoveryController, DiscoveryEvent};
use etp_session::etp::session::SessionMonitor;
use etp_session::etp::transport::{InMemoryTransport, Transport, TransportEvent};
use etp_session::etp::types::{
    EtpMessage, GetResourcesResponse, MessageBody, MessageHeader, Protocol, ResourceDescriptor,
    SupportedProtocol,
};
use tokio::sync::mpsc::UnboundedReceiver;

fn discovery_monitor() -> SessionMonitor {
    let mut monitor = SessionMonitor::new();
    monitor.on_session_opened(
        "session-1",
        &[SupportedProtocol::new(Protocol::Discovery, "store")],
    );
    monitor
}

fn setup() -> (
    DiscoveryController,
    SessionMonitor,
    UnboundedReceiver<TransportEvent>,
) {
    let (local, mut remote) = InMemoryTransport::pair();
    let remote_events = remote.take_events().expect("fresh transport");
    let transport: Arc<dyn Transport> = Arc::new(local);
    (
        DiscoveryController::new(transport),
        discovery_monitor(),
        remote_events,
    )
}

fn response(
    request: &EtpMessage,
    resources: Vec<ResourceDescriptor>,
    more_follows: bool,
) -> (MessageHeader, GetResourcesResponse) {
    let mut header = MessageHeader::response(Protocol::Discovery, request.header.message_id);
    header.more_follows = more_follows;
    (header, GetResourcesResponse { resources })
}

#[tokio::test]
async fn test_get_resources_accumulates_multipart_responses() {
    let (mut controller, monitor, mut remote_events) = setup();

    controller.get_resources(&monitor, "eml://").await.unwrap();
    let request = common::next_message(&mut remote_events).await;
    match &request.body {
        MessageBody::GetResources(get) => assert_eq!(get.uri, "eml://"),
        other => panic!("unexpected request: {:?}", other),
    }

    let (header, body) = response(
        &request,
        vec![ResourceDescriptor::new("eml://a", "A", "Well").with_children(-1)],
        true,
    );
    controller.on_resources_response(&header, body);

    let (header, body) = response(
        &request,
        vec![ResourceDescriptor::new("eml://b", "B", "Well").with_children(-1)],
        false,
    );
    controller.on_resources_response(&header, body);

    let uris: Vec<&str> = controller
        .roots()
        .iter()
        .map(|node| node.resource.uri.as_str())
        .collect();
    assert_eq!(uris, vec!["eml://a", "eml://b"]);
}

#[tokio::test]
async fn test_get_resources_is_a_noop_without_discovery_capability() {
    let (local, mut remote) = InMemoryTransport::pair();
    let mut remote_events = remote.take_events().expect("fresh transport");
    let mut controller = DiscoveryController::new(Arc::new(local) as Arc<dyn Transport>);

    let closed = SessionMonitor::new();
    controller.get_resources(&closed, "eml://").await.unwrap();

    assert!(common::drain_messages(&mut remote_events).is_empty());

    let mut streaming_only = SessionMonitor::new();
    streaming_only.on_session_opened(
        "session-1",
        &[SupportedProtocol::new(Protocol::ChannelStreaming, "producer")],
    );
    controller
        .get_resources(&streaming_only, "eml://")
        .await
        .unwrap();

    assert!(common::drain_messages(&mut remote_events).is_empty());
}

#[tokio::test]
async fn test_new_request_clears_previous_set_and_drops_stale_responses() {
    let (mut controller, monitor, mut remote_events) = setup();

    controller.get_resources(&monitor, "eml://").await.unwrap();
    let first_request = common::next_message(&mut remote_events).await;

    let (header, body) = response(
        &first_request,
        vec![ResourceDescriptor::new("eml://old", "Old", "Well")],
        true,
    );
    controller.on_resources_response(&header, body);
    assert_eq!(controller.roots().len(), 1);

    // A fresh request discards the set and the outstanding accumulation
    controller.get_resources(&monitor, "eml://").await.unwrap();
    let second_request = common::next_message(&mut remote_events).await;

    let (stale_header, stale_body) = response(
        &first_request,
        vec![ResourceDescriptor::new("eml://late", "Late", "Well")],
        false,
    );
    controller.on_resources_response(&stale_header, stale_body);
    assert!(controller.roots().is_empty());

    let (header, body) = response(
        &second_request,
        vec![ResourceDescriptor::new("eml://new", "New", "Well")],
        false,
    );
    controller.on_resources_response(&header, body);
    assert_eq!(controller.roots().len(), 1);
    assert_eq!(controller.roots()[0].resource.uri, "eml://new");
}

#[tokio::test]
async fn test_malformed_entries_are_dropped_individually() {
    let (mut controller, monitor, mut remote_events) = setup();

    controller.get_resources(&monitor, "eml://").await.unwrap();
    let request = common::next_message(&mut remote_events).await;

    let (header, body) = response(
        &request,
        vec![
            ResourceDescriptor::new("", "Nameless", "Well"),
            ResourceDescriptor::new("eml://ok", "Ok", "Well"),
        ],
        false,
    );
    controller.on_resources_response(&header, body);

    assert_eq!(controller.roots().len(), 1);
    assert_eq!(controller.roots()[0].resource.uri, "eml://ok");
}

#[tokio::test]
async fn test_leaf_node_never_issues_child_fetch() {
    let (mut controller, monitor, mut remote_events) = setup();

    controller.get_resources(&monitor, "eml://").await.unwrap();
    let request = common::next_message(&mut remote_events).await;
    let (header, body) = response(
        &request,
        vec![ResourceDescriptor::new("eml://log", "Log 01", "Log")],
        false,
    );
    controller.on_resources_response(&header, body);

    controller.refresh_node(&monitor, "eml://log").await.unwrap();

    assert!(common::drain_messages(&mut remote_events).is_empty());
}

#[tokio::test]
async fn test_refresh_replaces_children_wholesale_and_expands() {
    let (mut controller, monitor, mut remote_events) = setup();

    controller.get_resources(&monitor, "eml://").await.unwrap();
    let request = common::next_message(&mut remote_events).await;
    let (header, body) = response(
        &request,
        vec![ResourceDescriptor::new("eml://wells", "Wells", "Folder").with_children(-1)],
        false,
    );
    controller.on_resources_response(&header, body);

    // First load
    controller.refresh_node(&monitor, "eml://wells").await.unwrap();
    let refresh = common::next_message(&mut remote_events).await;
    let (header, body) = response(
        &refresh,
        vec![
            ResourceDescriptor::new("eml://wells/1", "Well 1", "Well"),
            ResourceDescriptor::new("eml://wells/2", "Well 2", "Well"),
        ],
        false,
    );
    controller.on_resources_response(&header, body);

    let folder = controller.find("eml://wells").unwrap();
    assert!(folder.is_expanded);
    assert_eq!(folder.children.len(), 2);

    // Reload replaces, not appends
    controller.refresh_node(&monitor, "eml://wells").await.unwrap();
    let refresh = common::next_message(&mut remote_events).await;
    let (header, body) = response(
        &refresh,
        vec![ResourceDescriptor::new("eml://wells/3", "Well 3", "Well")],
        false,
    );
    controller.on_resources_response(&header, body);

    let folder = controller.find("eml://wells").unwrap();
    assert!(folder.is_expanded);
    let children: Vec<&str> = folder
        .children
        .iter()
        .map(|node| node.resource.uri.as_str())
        .collect();
    assert_eq!(children, vec!["eml://wells/3"]);
}

#[tokio::test]
async fn test_selection_gates_store_operations() {
    let (mut controller, monitor, mut remote_events) = setup();

    controller.get_resources(&monitor, "eml://").await.unwrap();
    let request = common::next_message(&mut remote_events).await;
    let (header, body) = response(
        &request,
        vec![
            ResourceDescriptor::new("eml://channel", "Curve", "Log").channel_subscribable(),
            ResourceDescriptor::new("eml://object", "Object", "Well").object_notifiable(),
        ],
        false,
    );
    controller.on_resources_response(&header, body);

    // Nothing selected yet
    assert!(!controller.can_get_object(&monitor));
    assert!(!controller.can_delete_object(&monitor));

    controller.select("eml://channel");
    assert!(controller.can_get_object(&monitor));
    assert!(controller.can_subscribe_channels(&monitor));
    assert!(!controller.can_request_notification(&monitor));

    controller.select("eml://object");
    assert!(!controller.can_subscribe_channels(&monitor));
    assert!(controller.can_request_notification(&monitor));

    // Delete requires explicit confirmation
    controller.delete_object(&monitor, false).await.unwrap();
    assert!(common::drain_messages(&mut remote_events).is_empty());

    controller.delete_object(&monitor, true).await.unwrap();
    let delete = common::next_message(&mut remote_events).await;
    assert_eq!(delete.header.protocol, Protocol::Store);
    match delete.body {
        MessageBody::DeleteObject(body) => assert_eq!(body.uri, "eml://object"),
        other => panic!("unexpected message: {:?}", other),
    }

    controller.get_object(&monitor).await.unwrap();
    let get = common::next_message(&mut remote_events).await;
    match get.body {
        MessageBody::GetObject(body) => assert_eq!(body.uri, "eml://object"),
        other => panic!("unexpected message: {:?}", other),
    }
}

#[tokio::test]
async fn test_tree_events_follow_accumulation() {
    let (mut controller, monitor, mut remote_events) = setup();
    let mut events = controller.subscribe();

    controller.get_resources(&monitor, "eml://").await.unwrap();
    let request = common::next_message(&mut remote_events).await;

    let (header, body) = response(
        &request,
        vec![ResourceDescriptor::new("eml://a", "A", "Well")],
        false,
    );
    controller.on_resources_response(&header, body);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            DiscoveryEvent::Cleared,
            DiscoveryEvent::ResourceAdded {
                parent_uri: None,
                uri: "eml://a".to_string()
            },
            DiscoveryEvent::Complete { parent_uri: None },
        ]
    );
}
