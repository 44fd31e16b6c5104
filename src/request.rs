//! Request view consumed by the filter
//!
//! The engine only needs three things from a request: the remote peer
//! address, header lookup and the path. [`ClientRequest`] exposes exactly that
//! so the filter can sit in front of any HTTP stack.

use std::collections::HashMap;
use std::net::SocketAddr;

use http::Request;
use tracing::debug;

/// Canonical forwarded-address header
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// What the filter reads from an incoming request
pub trait ClientRequest {
    /// Remote peer address, normally `host:port`
    fn remote_addr(&self) -> Option<String>;

    /// First value of header `name` (case-insensitive)
    fn header(&self, name: &str) -> Option<&str>;

    /// Request path, without query string
    fn path(&self) -> &str;
}

/// Owned request description, used by the CLI and tests
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub remote_addr: String,
    pub path: String,
    headers: HashMap<String, String>,
}

impl RequestInfo {
    pub fn new(remote_addr: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            remote_addr: remote_addr.into(),
            path: path.into(),
            headers: HashMap::new(),
        }
    }

    /// Set a header, replacing any previous value
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_forwarded_for(self, value: impl Into<String>) -> Self {
        self.with_header(X_FORWARDED_FOR, value)
    }
}

impl ClientRequest for RequestInfo {
    fn remote_addr(&self) -> Option<String> {
        Some(self.remote_addr.clone())
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn path(&self) -> &str {
        &self.path
    }
}

/// The peer address is read from a bare [`SocketAddr`] request extension,
/// which the host must insert. Wrappers such as axum's
/// `ConnectInfo<SocketAddr>` are not recognized; unwrap them into a plain
/// `SocketAddr` before the filter runs. Without it the peer is unresolvable
/// and only `X-Forwarded-For` can identify the client.
impl<B> ClientRequest for Request<B> {
    fn remote_addr(&self) -> Option<String> {
        let addr = self.extensions().get::<SocketAddr>();
        if addr.is_none() {
            debug!("No SocketAddr extension on request to {}", self.uri().path());
        }
        addr.map(|addr| addr.to_string())
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn path(&self) -> &str {
        self.uri().path()
    }
}
