//! # ETP Protocol Types
//!
//! Core types used throughout the session layer: message identifiers,
//! the protocol/capability enumeration, the message header, and the
//! typed bodies exchanged between producer and consumer.
//!
//! ## Message classification
//!
//! Every message carries a [`MessageHeader`] naming the protocol it
//! belongs to, a unique [`MessageId`], an optional correlation id
//! linking a response to its request, and a `more_follows` flag used by
//! multipart responses.
//!
//! ## Example
//!
//! ```rust
//! use etp_session::etp::types::{EtpMessage, GetResources, MessageBody, Protocol};
//!
//! let request = EtpMessage::request(
//!     Protocol::Discovery,
//!     MessageBody::GetResources(GetResources { uri: "eml://".to_string() }),
//! );
//!
//! assert_eq!(request.header.protocol, Protocol::Discovery);
//! assert!(request.header.correlation_id.is_none());
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A unique identifier for a protocol message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub [u8; 16]);

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageId {
    /// Generate a new message ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    /// Create a MessageId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the MessageId
    pub fn bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to a UUID
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0))
    }
}

/// A protocol role that can be negotiated for a session.
///
/// Messages of a protocol are only valid once both endpoints have
/// advertised and accepted it during the session handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Session control messages
    Core,
    /// Continuous channel data streaming
    ChannelStreaming,
    /// Frame-oriented channel data
    ChannelDataFrame,
    /// Hierarchical resource discovery
    Discovery,
    /// Object store access
    Store,
    /// Object change notifications
    StoreNotification,
    /// Growing object support
    GrowingObject,
    /// Data array support
    DataArray,
}

impl Protocol {
    /// Converts a u8 to a Protocol
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Core),
            1 => Some(Self::ChannelStreaming),
            2 => Some(Self::ChannelDataFrame),
            3 => Some(Self::Discovery),
            4 => Some(Self::Store),
            5 => Some(Self::StoreNotification),
            6 => Some(Self::GrowingObject),
            7 => Some(Self::DataArray),
            _ => None,
        }
    }

    /// Converts a Protocol to a u8
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Core => 0,
            Self::ChannelStreaming => 1,
            Self::ChannelDataFrame => 2,
            Self::Discovery => 3,
            Self::Store => 4,
            Self::StoreNotification => 5,
            Self::GrowingObject => 6,
            Self::DataArray => 7,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Header carried by every protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Protocol the message belongs to
    pub protocol: Protocol,
    /// Unique id of this message
    pub message_id: MessageId,
    /// Id of the request this message answers, if any
    pub correlation_id: Option<MessageId>,
    /// Set on every part of a multipart response except the last
    pub more_follows: bool,
}

impl MessageHeader {
    /// Creates a header for a new, uncorrelated request
    pub fn request(protocol: Protocol) -> Self {
        Self {
            protocol,
            message_id: MessageId::new(),
            correlation_id: None,
            more_follows: false,
        }
    }

    /// Creates a header for a response correlated to `correlation_id`
    pub fn response(protocol: Protocol, correlation_id: MessageId) -> Self {
        Self {
            protocol,
            message_id: MessageId::new(),
            correlation_id: Some(correlation_id),
            more_follows: false,
        }
    }

    /// Marks the message as a non-terminal part of a multipart response
    pub fn with_more_follows(mut self) -> Self {
        self.more_follows = true;
        self
    }
}

/// One protocol offered or accepted during the session handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedProtocol {
    /// The protocol
    pub protocol: Protocol,
    /// Role of the advertising endpoint, e.g. "producer" or "store"
    pub role: String,
}

impl SupportedProtocol {
    /// Creates a new supported-protocol entry
    pub fn new(protocol: Protocol, role: impl Into<String>) -> Self {
        Self {
            protocol,
            role: role.into(),
        }
    }
}

/// Confirms a session and carries the accepted capability set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSession {
    /// Server-assigned session identifier
    pub session_id: String,
    /// Name of the accepting application
    pub application_name: String,
    /// Protocols accepted for this session
    pub supported_protocols: Vec<SupportedProtocol>,
}

/// Ends the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseSession {
    /// Optional human-readable reason
    pub reason: Option<String>,
}

/// Requests the resources directly under a URI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResources {
    /// Scope of the request; the catalog root for a base URI
    pub uri: String,
}

/// One part of a (possibly multipart) discovery response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResourcesResponse {
    /// Resources reported by this part, in catalog order
    pub resources: Vec<ResourceDescriptor>,
}

/// One entry in the discoverable hierarchical catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Address of the resource, unique within its parent scope
    pub uri: String,
    /// Display name
    pub name: String,
    /// Resource-type tag, e.g. "Folder" or "Log"
    pub resource_type: String,
    /// Child count convention: 0 = leaf, positive = known count,
    /// -1 = unknown (expandable)
    pub has_children: i32,
    /// Whether the resource can be subscribed to as a channel
    pub channel_subscribable: bool,
    /// Whether the resource can be watched for change notifications
    pub object_notifiable: bool,
}

impl ResourceDescriptor {
    /// Creates a descriptor with no children and no streaming flags
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            resource_type: resource_type.into(),
            has_children: 0,
            channel_subscribable: false,
            object_notifiable: false,
        }
    }

    /// Sets the child count (-1 for unknown)
    pub fn with_children(mut self, has_children: i32) -> Self {
        self.has_children = has_children;
        self
    }

    /// Marks the resource as subscribable for channel streaming
    pub fn channel_subscribable(mut self) -> Self {
        self.channel_subscribable = true;
        self
    }

    /// Marks the resource as notifiable for store notifications
    pub fn object_notifiable(mut self) -> Self {
        self.object_notifiable = true;
        self
    }
}

/// Requests the full details of one stored object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetObject {
    /// URI of the object
    pub uri: String,
}

/// Deletes one stored object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteObject {
    /// URI of the object
    pub uri: String,
}

/// Asks a producer to describe its channels and begin streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Start {
    /// Upper bound on data items per ChannelData message
    pub max_data_items: i32,
    /// Minimum interval between data messages, in milliseconds
    pub max_message_rate: i64,
}

/// Identifies one channel in a streaming (re)start request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSubscribeInfo {
    /// The channel to stream
    pub channel_id: i64,
    /// Optional index to resume from
    pub start_index: Option<i64>,
}

/// (Re)starts emission, optionally scoped to a channel subset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStreamingStart {
    /// Requested subset; empty means all advertised channels
    pub channels: Vec<ChannelSubscribeInfo>,
}

/// Stops emission for the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStreamingStop {}

/// Describes one streamable data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadataRecord {
    /// Stable channel identifier
    pub channel_id: i64,
    /// Display name
    pub channel_name: String,
    /// Curve mnemonic
    pub mnemonic: String,
    /// Unit of measure
    pub uom: String,
    /// Emitted value type
    pub data_type: String,
}

impl ChannelMetadataRecord {
    /// Creates a channel record; the mnemonic doubles as display name
    pub fn new(channel_id: i64, mnemonic: impl Into<String>, uom: impl Into<String>) -> Self {
        let mnemonic = mnemonic.into();
        Self {
            channel_id,
            channel_name: mnemonic.clone(),
            mnemonic,
            uom: uom.into(),
            data_type: "long".to_string(),
        }
    }

    /// Overrides the emitted value type
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }
}

/// Advertises the channel catalog in response to Start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMetadata {
    /// The advertised channels
    pub channels: Vec<ChannelMetadataRecord>,
}

/// A single streamed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    /// 64-bit integer payload (also used for microsecond timestamps)
    Long(i64),
    /// Floating point payload
    Double(f64),
    /// Text payload
    Text(String),
}

/// Attribute attached to a streamed value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAttribute {
    /// Attribute identifier
    pub attribute_id: i32,
    /// Attribute payload
    pub attribute_value: String,
}

/// One streamed data point for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    /// The channel this value belongs to
    pub channel_id: i64,
    /// Index values; empty for simple time streams
    pub indexes: Vec<i64>,
    /// The value itself
    pub value: DataValue,
    /// Attributes; empty for simple streams
    pub value_attributes: Vec<DataAttribute>,
}

impl DataItem {
    /// Creates a simulated data point carrying the current wall-clock
    /// time in Unix microseconds, with empty index and attribute sets
    pub fn timestamp_now(channel_id: i64) -> Self {
        Self {
            channel_id,
            indexes: Vec::new(),
            value: DataValue::Long(Utc::now().timestamp_micros()),
            value_attributes: Vec::new(),
        }
    }
}

/// Carries streamed data points for one emission tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelData {
    /// One item per streamed channel
    pub data: Vec<DataItem>,
}

/// Typed body of a protocol message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessageBody {
    /// Session handshake confirmation
    OpenSession(OpenSession),
    /// Session end
    CloseSession(CloseSession),
    /// Discovery request
    GetResources(GetResources),
    /// Discovery response part
    GetResourcesResponse(GetResourcesResponse),
    /// Store object fetch
    GetObject(GetObject),
    /// Store object delete
    DeleteObject(DeleteObject),
    /// Streaming bootstrap: describe channels and begin emission
    Start(Start),
    /// Channel catalog advertisement
    ChannelMetadata(ChannelMetadata),
    /// Emission (re)start, optionally scoped
    ChannelStreamingStart(ChannelStreamingStart),
    /// Emission stop
    ChannelStreamingStop(ChannelStreamingStop),
    /// Streamed data points
    ChannelData(ChannelData),
}

/// A complete protocol message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtpMessage {
    /// Routing and correlation metadata
    pub header: MessageHeader,
    /// The typed payload
    pub body: MessageBody,
}

impl EtpMessage {
    /// Creates a message from an explicit header and body
    pub fn new(header: MessageHeader, body: MessageBody) -> Self {
        Self { header, body }
    }

    /// Creates an uncorrelated request message
    pub fn request(protocol: Protocol, body: MessageBody) -> Self {
        Self::new(MessageHeader::request(protocol), body)
    }

    /// Creates a response message correlated to `correlation_id`
    pub fn response(protocol: Protocol, correlation_id: MessageId, body: MessageBody) -> Self {
        Self::new(MessageHeader::response(protocol, correlation_id), body)
    }
}
