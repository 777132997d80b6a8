//! Connection profile consumed by the transport layer.
//!
//! A [`Connection`] carries everything a transport needs to reach a
//! remote endpoint: URI, authentication mode and credentials, TLS
//! parameters, proxy settings, the negotiated sub-protocol name, and
//! the wire encoding. It is mutated freely by configuration surfaces
//! and becomes read-only once handed to a transport for connecting.
//!
//! Every setter publishes a [`ConnectionChange`] on a broadcast channel
//! so external observers can react per attribute without polling.
//! Credentials are never included in `Display`, `Debug`, or serialized
//! output.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use url::Url;

use crate::utils::error::EtpResult;

/// Default sub-protocol name negotiated during the WebSocket upgrade
pub const DEFAULT_SUB_PROTOCOL: &str = "energistics-tp";

/// Authentication mode for a connection.
///
/// Exactly one mode is in effect at any time; the enum makes the
/// "both basic and bearer" state unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authentication {
    /// Username/password authentication
    Basic,
    /// Token (JWT) authentication
    Bearer,
    /// No authentication
    None,
}

/// TLS protocol versions the connection may negotiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsVersions {
    /// Allow TLS 1.0
    pub tls10: bool,
    /// Allow TLS 1.1
    pub tls11: bool,
    /// Allow TLS 1.2
    pub tls12: bool,
}

impl Default for TlsVersions {
    fn default() -> Self {
        Self {
            tls10: true,
            tls11: true,
            tls12: true,
        }
    }
}

/// Outbound proxy settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Proxy host name
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// Proxy username
    pub username: String,
    /// Proxy password
    #[serde(skip)]
    pub password: String,
    /// Use the ambient credentials instead of username/password
    pub use_default_credentials: bool,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 80,
            username: String::new(),
            password: String::new(),
            use_default_credentials: false,
        }
    }
}

impl ProxySettings {
    /// Whether the proxy host is a bare host name rather than a URI
    pub fn is_host_name(&self) -> bool {
        !self.host.is_empty() && !self.host.contains("://")
    }
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("use_default_credentials", &self.use_default_credentials)
            .finish()
    }
}

/// Wire encoding used for protocol messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireEncoding {
    /// Compact binary envelope
    Binary,
    /// JSON text frames
    Json,
}

/// Identifies which logically independent attribute group changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionChange {
    /// Display name
    Name,
    /// Endpoint URI
    Uri,
    /// Username, password, or token
    Credentials,
    /// Authentication mode
    Authentication,
    /// Allowed TLS versions
    SecurityProtocol,
    /// Certificate-validation override
    CertificateValidation,
    /// Pre-authentication flag
    PreAuthenticate,
    /// Proxy settings
    Proxy,
    /// OAuth redirect port
    RedirectPort,
    /// OAuth client id
    ClientId,
    /// Negotiated sub-protocol name
    SubProtocol,
    /// Wire encoding selector
    WireEncoding,
}

fn change_channel() -> broadcast::Sender<ConnectionChange> {
    broadcast::channel(32).0
}

/// Connection details for one remote endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct Connection {
    name: String,
    uri: String,
    username: String,
    #[serde(skip)]
    password: String,
    #[serde(skip)]
    json_web_token: String,
    authentication: Authentication,
    security_protocol: TlsVersions,
    accept_invalid_certificates: bool,
    pre_authenticate: bool,
    proxy: ProxySettings,
    redirect_port: u16,
    client_id: String,
    sub_protocol: String,
    wire_encoding: WireEncoding,
    #[serde(skip, default = "change_channel")]
    changes: broadcast::Sender<ConnectionChange>,
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            name: String::new(),
            uri: String::new(),
            username: String::new(),
            password: String::new(),
            json_web_token: String::new(),
            authentication: Authentication::Basic,
            security_protocol: TlsVersions::default(),
            accept_invalid_certificates: false,
            pre_authenticate: false,
            proxy: ProxySettings::default(),
            redirect_port: 9005,
            client_id: String::new(),
            sub_protocol: DEFAULT_SUB_PROTOCOL.to_string(),
            wire_encoding: WireEncoding::Binary,
            changes: change_channel(),
        }
    }
}

impl Connection {
    /// Creates a profile with defaults and the given endpoint URI
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Subscribes to per-attribute change notifications
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ConnectionChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: ConnectionChange) {
        let _ = self.changes.send(change);
    }

    /// Display name of the connection
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the display name
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.name != name {
            self.name = name;
            self.notify(ConnectionChange::Name);
        }
    }

    /// Endpoint URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Sets the endpoint URI
    pub fn set_uri(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        if self.uri != uri {
            self.uri = uri;
            self.notify(ConnectionChange::Uri);
        }
    }

    /// Parses the endpoint URI
    pub fn endpoint(&self) -> EtpResult<Url> {
        Ok(Url::parse(&self.uri)?)
    }

    /// Username for basic authentication
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Sets the username
    pub fn set_username(&mut self, username: impl Into<String>) {
        let username = username.into();
        if self.username != username {
            self.username = username;
            self.notify(ConnectionChange::Credentials);
        }
    }

    /// Password for basic authentication
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Sets the password
    pub fn set_password(&mut self, password: impl Into<String>) {
        let password = password.into();
        if self.password != password {
            self.password = password;
            self.notify(ConnectionChange::Credentials);
        }
    }

    /// Bearer token
    pub fn json_web_token(&self) -> &str {
        &self.json_web_token
    }

    /// Sets the bearer token
    pub fn set_json_web_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        if self.json_web_token != token {
            self.json_web_token = token;
            self.notify(ConnectionChange::Credentials);
        }
    }

    /// Current authentication mode
    pub fn authentication(&self) -> Authentication {
        self.authentication
    }

    /// Sets the authentication mode; selecting one mode deselects the others
    pub fn set_authentication(&mut self, authentication: Authentication) {
        if self.authentication != authentication {
            self.authentication = authentication;
            self.notify(ConnectionChange::Authentication);
        }
    }

    /// Whether basic authentication is selected
    pub fn is_authentication_basic(&self) -> bool {
        self.authentication == Authentication::Basic
    }

    /// Whether bearer authentication is selected
    pub fn is_authentication_bearer(&self) -> bool {
        self.authentication == Authentication::Bearer
    }

    /// Allowed TLS versions
    pub fn security_protocol(&self) -> TlsVersions {
        self.security_protocol
    }

    /// Sets the allowed TLS versions
    pub fn set_security_protocol(&mut self, versions: TlsVersions) {
        if self.security_protocol != versions {
            self.security_protocol = versions;
            self.notify(ConnectionChange::SecurityProtocol);
        }
    }

    /// Whether invalid certificates are accepted
    pub fn accept_invalid_certificates(&self) -> bool {
        self.accept_invalid_certificates
    }

    /// Sets the certificate-validation override
    pub fn set_accept_invalid_certificates(&mut self, accept: bool) {
        if self.accept_invalid_certificates != accept {
            self.accept_invalid_certificates = accept;
            self.notify(ConnectionChange::CertificateValidation);
        }
    }

    /// Whether the authorization header is sent before a challenge
    pub fn pre_authenticate(&self) -> bool {
        self.pre_authenticate
    }

    /// Sets the pre-authentication flag
    pub fn set_pre_authenticate(&mut self, pre_authenticate: bool) {
        if self.pre_authenticate != pre_authenticate {
            self.pre_authenticate = pre_authenticate;
            self.notify(ConnectionChange::PreAuthenticate);
        }
    }

    /// Outbound proxy settings
    pub fn proxy(&self) -> &ProxySettings {
        &self.proxy
    }

    /// Replaces the proxy settings
    pub fn set_proxy(&mut self, proxy: ProxySettings) {
        if self.proxy != proxy {
            self.proxy = proxy;
            self.notify(ConnectionChange::Proxy);
        }
    }

    /// OAuth redirect port
    pub fn redirect_port(&self) -> u16 {
        self.redirect_port
    }

    /// Sets the OAuth redirect port
    pub fn set_redirect_port(&mut self, port: u16) {
        if self.redirect_port != port {
            self.redirect_port = port;
            self.notify(ConnectionChange::RedirectPort);
        }
    }

    /// OAuth client id
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Sets the OAuth client id
    pub fn set_client_id(&mut self, client_id: impl Into<String>) {
        let client_id = client_id.into();
        if self.client_id != client_id {
            self.client_id = client_id;
            self.notify(ConnectionChange::ClientId);
        }
    }

    /// Negotiated sub-protocol name
    pub fn sub_protocol(&self) -> &str {
        &self.sub_protocol
    }

    /// Sets the sub-protocol name
    pub fn set_sub_protocol(&mut self, sub_protocol: impl Into<String>) {
        let sub_protocol = sub_protocol.into();
        if self.sub_protocol != sub_protocol {
            self.sub_protocol = sub_protocol;
            self.notify(ConnectionChange::SubProtocol);
        }
    }

    /// Wire encoding selector
    pub fn wire_encoding(&self) -> WireEncoding {
        self.wire_encoding
    }

    /// Sets the wire encoding
    pub fn set_wire_encoding(&mut self, encoding: WireEncoding) {
        if self.wire_encoding != encoding {
            self.wire_encoding = encoding;
            self.notify(ConnectionChange::WireEncoding);
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("authentication", &self.authentication)
            .field("security_protocol", &self.security_protocol)
            .field("accept_invalid_certificates", &self.accept_invalid_certificates)
            .field("pre_authenticate", &self.pre_authenticate)
            .field("proxy", &self.proxy)
            .field("redirect_port", &self.redirect_port)
            .field("client_id", &self.client_id)
            .field("sub_protocol", &self.sub_protocol)
            .field("wire_encoding", &self.wire_encoding)
            .finish()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Uri: {}; Username: {}; Authentication: {:?}; ProxyHost: {}; ProxyPort: {}; SubProtocol: {}; Encoding: {:?}",
            self.uri,
            self.username,
            self.authentication,
            self.proxy.host,
            self.proxy.port,
            self.sub_protocol,
            self.wire_encoding,
        )
    }
}
