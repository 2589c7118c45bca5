use snafu::{ResultExt, ensure};
use url::Url;

use crate::error::{InvalidEndpointSnafu, TransportResult, UnsupportedSchemeSnafu};

pub const DEFAULT_SERVER_URL: &str = "https://challenge-react-chat-server.onrender.com/";
pub const DEFAULT_NAMESPACE: &str = "/";
const ENGINE_IO_PATH: &str = "socket.io/";
const ENGINE_IO_QUERY: &str = "EIO=4&transport=websocket";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub endpoint: String,
    pub namespace: String,
}

impl TransportConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim().to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let namespace = namespace.trim();
        self.namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else if namespace.starts_with('/') {
            namespace.to_string()
        } else {
            format!("/{namespace}")
        };
        self
    }

    /// Resolves the Engine.IO websocket URL for the configured endpoint.
    ///
    /// `http`/`https` map to `ws`/`wss`; the endpoint path is kept as prefix
    /// of `socket.io/`.
    pub fn websocket_url(&self) -> TransportResult<Url> {
        let mut url = Url::parse(&self.endpoint).context(InvalidEndpointSnafu {
            stage: "parse-endpoint",
            endpoint: self.endpoint.clone(),
        })?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return UnsupportedSchemeSnafu {
                    stage: "map-endpoint-scheme",
                    endpoint: self.endpoint.clone(),
                    scheme: other.to_string(),
                }
                .fail();
            }
        };

        let scheme_changed = url.set_scheme(scheme).is_ok();
        ensure!(
            scheme_changed,
            UnsupportedSchemeSnafu {
                stage: "set-endpoint-scheme",
                endpoint: self.endpoint.clone(),
                scheme: url.scheme().to_string(),
            }
        );

        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}/{ENGINE_IO_PATH}"));
        url.set_query(Some(ENGINE_IO_QUERY));
        url.set_fragment(None);
        Ok(url)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[test]
    fn https_endpoint_maps_to_secure_socket_io_url() {
        let url = TransportConfig::default().websocket_url().unwrap();
        assert_eq!(
            url.as_str(),
            "wss://challenge-react-chat-server.onrender.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn endpoint_path_is_kept_as_prefix() {
        let url = TransportConfig::new(" http://localhost:4000/chat/ ")
            .websocket_url()
            .unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:4000/chat/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let error = TransportConfig::new("ftp://example.com")
            .websocket_url()
            .unwrap_err();
        assert!(matches!(error, TransportError::UnsupportedScheme { .. }));

        let error = TransportConfig::new("not a url").websocket_url().unwrap_err();
        assert!(matches!(error, TransportError::InvalidEndpoint { .. }));
    }

    #[test]
    fn namespace_is_normalized() {
        assert_eq!(TransportConfig::default().with_namespace("chat").namespace, "/chat");
        assert_eq!(TransportConfig::default().with_namespace(" ").namespace, "/");
        assert_eq!(TransportConfig::default().with_namespace("/a").namespace, "/a");
    }
}
