//! Hierarchical resource discovery.
//!
//! The [`DiscoveryController`] turns "list resources under this URI"
//! intents into discovery requests and folds the (possibly multipart)
//! responses into a tree of [`ResourceNode`]s. Responses are
//! accumulated in arrival order until a part arrives without the
//! more-follows flag. The controller also tracks node selection and
//! answers the guard queries the UI layer needs for store operations.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::etp::session::SessionMonitor;
use crate::etp::transport::Transport;
use crate::etp::types::{
    DeleteObject, EtpMessage, GetObject, GetResources, GetResourcesResponse, MessageBody,
    MessageHeader, MessageId, Protocol, ResourceDescriptor,
};
use crate::utils::error::EtpResult;

/// Resource-type tag that always allows a child fetch
const FOLDER_TYPE: &str = "Folder";

/// One entry in the discovered resource tree
#[derive(Debug, Clone)]
pub struct ResourceNode {
    /// Descriptor received from the remote catalog
    pub resource: ResourceDescriptor,
    /// Child nodes, populated lazily on expansion
    pub children: Vec<ResourceNode>,
    /// Whether the node is expanded in the observer's view
    pub is_expanded: bool,
    /// Whether the node is currently selected
    pub is_selected: bool,
}

impl ResourceNode {
    /// Wraps a descriptor in an unexpanded, unselected node
    pub fn new(resource: ResourceDescriptor) -> Self {
        Self {
            resource,
            children: Vec::new(),
            is_expanded: false,
            is_selected: false,
        }
    }

    /// Whether this node may be refreshed.
    ///
    /// A node with a known-zero child count and a non-folder type is a
    /// leaf and never issues a child fetch.
    pub fn can_refresh(&self) -> bool {
        self.resource.has_children != 0
            || self.resource.resource_type.eq_ignore_ascii_case(FOLDER_TYPE)
    }

    fn find(&self, uri: &str) -> Option<&ResourceNode> {
        if self.resource.uri == uri {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(uri))
    }

    fn find_mut(&mut self, uri: &str) -> Option<&mut ResourceNode> {
        if self.resource.uri == uri {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(uri))
    }

    fn for_each_mut(&mut self, f: &mut impl FnMut(&mut ResourceNode)) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }

    fn find_selected(&self) -> Option<&ResourceNode> {
        if self.is_selected {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_selected())
    }
}

/// Notifications published as the resource tree changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// The top-level resource set was cleared
    Cleared,
    /// A resource was appended; `parent_uri` is `None` at the top level
    ResourceAdded {
        /// URI of the refreshed parent, if any
        parent_uri: Option<String>,
        /// URI of the appended resource
        uri: String,
    },
    /// The outstanding request finished accumulating
    Complete {
        /// URI of the refreshed parent, if any
        parent_uri: Option<String>,
    },
}

struct PendingRequest {
    message_id: MessageId,
    parent_uri: Option<String>,
}

/// Maps discovery intents onto request/response exchanges and owns the
/// resulting resource tree
pub struct DiscoveryController {
    transport: Arc<dyn Transport>,
    roots: Vec<ResourceNode>,
    pending: Option<PendingRequest>,
    events: broadcast::Sender<DiscoveryEvent>,
}

impl std::fmt::Debug for DiscoveryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryController")
            .field("roots", &self.roots.len())
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

impl DiscoveryController {
    /// Creates a controller sending requests through `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            roots: Vec::new(),
            pending: None,
            events: broadcast::channel(64).0,
        }
    }

    /// Subscribes to resource-tree change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.events.subscribe()
    }

    /// The current top-level resource set
    pub fn roots(&self) -> &[ResourceNode] {
        &self.roots
    }

    /// Requests the resources under `uri`, replacing the current set.
    ///
    /// A no-op while the session is closed or Discovery was not
    /// negotiated; a request issued against a closed session has no
    /// counterpart to answer it.
    pub async fn get_resources(&mut self, monitor: &SessionMonitor, uri: &str) -> EtpResult<()> {
        if !monitor.is_capability_enabled(Protocol::Discovery) {
            debug!(uri, "discovery not enabled, ignoring get_resources");
            return Ok(());
        }

        self.roots.clear();
        self.pending = None;
        let _ = self.events.send(DiscoveryEvent::Cleared);

        let header = MessageHeader::request(Protocol::Discovery);
        self.pending = Some(PendingRequest {
            message_id: header.message_id,
            parent_uri: None,
        });

        self.transport
            .send(EtpMessage::new(
                header,
                MessageBody::GetResources(GetResources {
                    uri: uri.to_string(),
                }),
            ))
            .await
    }

    /// Reloads the children of the node at `uri` and leaves it expanded.
    ///
    /// Only nodes that may have children are refreshed; a known leaf
    /// never issues a child fetch.
    pub async fn refresh_node(&mut self, monitor: &SessionMonitor, uri: &str) -> EtpResult<()> {
        if !monitor.is_capability_enabled(Protocol::Discovery) {
            debug!(uri, "discovery not enabled, ignoring refresh");
            return Ok(());
        }

        {
            let Some(node) = self.find_node_mut(uri) else {
                debug!(uri, "refresh target not found");
                return Ok(());
            };
            if !node.can_refresh() {
                debug!(uri, "node is a leaf, refresh skipped");
                return Ok(());
            }
            node.children.clear();
            node.is_expanded = true;
        }

        let header = MessageHeader::request(Protocol::Discovery);
        self.pending = Some(PendingRequest {
            message_id: header.message_id,
            parent_uri: Some(uri.to_string()),
        });

        self.transport
            .send(EtpMessage::new(
                header,
                MessageBody::GetResources(GetResources {
                    uri: uri.to_string(),
                }),
            ))
            .await
    }

    /// Folds one response part into the tree.
    ///
    /// Parts are appended in receipt order until one arrives without
    /// the more-follows flag. Responses that do not correlate to the
    /// outstanding request are dropped; entries missing a URI are
    /// dropped individually.
    pub fn on_resources_response(&mut self, header: &MessageHeader, response: GetResourcesResponse) {
        let Some(pending) = &self.pending else {
            debug!("no outstanding discovery request, response dropped");
            return;
        };
        if header.correlation_id != Some(pending.message_id) {
            debug!("stale discovery response dropped");
            return;
        }
        let parent_uri = pending.parent_uri.clone();

        for descriptor in response.resources {
            if descriptor.uri.is_empty() {
                warn!(name = %descriptor.name, "dropping resource with empty uri");
                continue;
            }
            let uri = descriptor.uri.clone();
            match &parent_uri {
                Some(parent) => {
                    if let Some(node) = self.find_node_mut(parent) {
                        node.children.push(ResourceNode::new(descriptor));
                    }
                }
                None => self.roots.push(ResourceNode::new(descriptor)),
            }
            let _ = self.events.send(DiscoveryEvent::ResourceAdded {
                parent_uri: parent_uri.clone(),
                uri,
            });
        }

        if !header.more_follows {
            self.pending = None;
            let _ = self.events.send(DiscoveryEvent::Complete { parent_uri });
        }
    }

    /// Selects the node at `uri`, clearing any prior selection
    pub fn select(&mut self, uri: &str) {
        for root in &mut self.roots {
            root.for_each_mut(&mut |node| {
                node.is_selected = node.resource.uri == uri;
            });
        }
    }

    /// The currently selected node, if any
    pub fn selected(&self) -> Option<&ResourceNode> {
        self.roots.iter().find_map(|root| root.find_selected())
    }

    /// Looks up a node anywhere in the tree
    pub fn find(&self, uri: &str) -> Option<&ResourceNode> {
        self.roots.iter().find_map(|root| root.find(uri))
    }

    fn find_node_mut(&mut self, uri: &str) -> Option<&mut ResourceNode> {
        self.roots.iter_mut().find_map(|root| root.find_mut(uri))
    }

    /// Whether object details can be requested for the selection
    pub fn can_get_object(&self, monitor: &SessionMonitor) -> bool {
        monitor.is_capability_enabled(Protocol::Discovery)
            && self
                .selected()
                .is_some_and(|node| !node.resource.uri.is_empty())
    }

    /// Whether the selection can be deleted
    pub fn can_delete_object(&self, monitor: &SessionMonitor) -> bool {
        self.can_get_object(monitor)
    }

    /// Whether the selection may be refreshed
    pub fn can_refresh_selected(&self, monitor: &SessionMonitor) -> bool {
        self.can_get_object(monitor) && self.selected().is_some_and(ResourceNode::can_refresh)
    }

    /// Whether the selection can be subscribed to as a channel
    pub fn can_subscribe_channels(&self, monitor: &SessionMonitor) -> bool {
        self.can_get_object(monitor)
            && self
                .selected()
                .is_some_and(|node| node.resource.channel_subscribable)
    }

    /// Whether change notifications can be requested for the selection
    pub fn can_request_notification(&self, monitor: &SessionMonitor) -> bool {
        self.can_get_object(monitor)
            && self
                .selected()
                .is_some_and(|node| node.resource.object_notifiable)
    }

    /// Requests the details of the selected object over the Store protocol
    pub async fn get_object(&self, monitor: &SessionMonitor) -> EtpResult<()> {
        if !self.can_get_object(monitor) {
            return Ok(());
        }
        let uri = self.selected().map(|node| node.resource.uri.clone());
        let Some(uri) = uri else { return Ok(()) };

        self.transport
            .send(EtpMessage::request(
                Protocol::Store,
                MessageBody::GetObject(GetObject { uri }),
            ))
            .await
    }

    /// Deletes the selected object.
    ///
    /// The delete is only performed when the caller passes `confirmed`;
    /// obtaining that confirmation is the caller's concern.
    pub async fn delete_object(&mut self, monitor: &SessionMonitor, confirmed: bool) -> EtpResult<()> {
        if !confirmed || !self.can_delete_object(monitor) {
            return Ok(());
        }
        let uri = self.selected().map(|node| node.resource.uri.clone());
        let Some(uri) = uri else { return Ok(()) };

        self.transport
            .send(EtpMessage::request(
                Protocol::Store,
                MessageBody::DeleteObject(DeleteObject { uri }),
            ))
            .await
    }

    /// Drops the tree and any outstanding request; used on session close
    pub fn reset(&mut self) {
        self.roots.clear();
        self.pending = None;
        let _ = self.events.send(DiscoveryEvent::Cleared);
    }
}
