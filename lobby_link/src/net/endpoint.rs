//! Connection URL parsing.

use std::fmt;

use url::Url;

use super::errors::NetError;

/// Default port for `wss://` endpoints.
pub const DEFAULT_TLS_PORT: u16 = 443;

/// Default port for `ws://` endpoints.
pub const DEFAULT_PLAIN_PORT: u16 = 80;

/// A parsed connection endpoint.
///
/// Derived once from a URL string when a client starts and immutable for the
/// life of the connection. Accepted URLs have the shape
/// `ws://host[:port][/path]` or `wss://host[:port][/path]`; the port defaults
/// to 443 (`wss`) or 80 (`ws`) and the path defaults to `/`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoint {
    /// Server hostname or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Request path, including the query string if any.
    pub path: String,
    /// Whether the connection uses TLS (`wss` scheme).
    pub use_tls: bool,
}

impl Endpoint {
    /// Parse a connection URL.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::InvalidUrl`] if the input is not a URL, uses a
    /// scheme other than `ws`/`wss`, has no host, or carries an invalid port.
    pub fn parse(input: &str) -> Result<Self, NetError> {
        let invalid = |reason: String| NetError::InvalidUrl {
            url: input.to_string(),
            reason,
        };

        let url = Url::parse(input).map_err(|e| invalid(e.to_string()))?;

        let use_tls = match url.scheme() {
            "wss" => true,
            "ws" => false,
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        };

        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();

        let port = url
            .port()
            .unwrap_or(if use_tls { DEFAULT_TLS_PORT } else { DEFAULT_PLAIN_PORT });

        let mut path = url.path().to_string();
        if path.is_empty() {
            path.push('/');
        }
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            host,
            port,
            path,
            use_tls,
        })
    }

    /// Reassemble the endpoint into a normalized connection URL.
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.host, self.port, self.path)
    }
}
