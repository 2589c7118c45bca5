use std::time::Duration;

use charla_session::ChatMessage;
use snafu::ResultExt;
use url::Url;

use crate::error::{
    BuildClientSnafu, DecodeSnafu, HistoryResult, InvalidBaseUrlSnafu, RequestSnafu, StatusSnafu,
};
use crate::types::{MessagesResponse, SaveRequest};
use crate::{BoxFuture, HistoryService};

pub const DEFAULT_HISTORY_URL: &str = "https://challenge-react-chat-server.onrender.com/api/";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MESSAGES_PATH: &str = "messages";
const SAVE_PATH: &str = "save";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl HistoryConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_URL)
    }
}

/// History backend reached over HTTP with JSON bodies.
pub struct HttpHistoryService {
    config: HistoryConfig,
    client: reqwest::Client,
    messages_url: Url,
    save_url: Url,
}

impl HttpHistoryService {
    pub fn new(config: HistoryConfig) -> HistoryResult<Self> {
        // Url::join drops the last segment unless the base ends with '/'.
        let normalized = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        let base = Url::parse(&normalized).context(InvalidBaseUrlSnafu {
            stage: "history-parse-base-url",
            base_url: config.base_url.clone(),
        })?;
        let messages_url = base.join(MESSAGES_PATH).context(InvalidBaseUrlSnafu {
            stage: "history-join-messages-path",
            base_url: config.base_url.clone(),
        })?;
        let save_url = base.join(SAVE_PATH).context(InvalidBaseUrlSnafu {
            stage: "history-join-save-path",
            base_url: config.base_url.clone(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context(BuildClientSnafu {
                stage: "history-build-client",
            })?;

        Ok(Self {
            config,
            client,
            messages_url,
            save_url,
        })
    }

    pub fn messages_url(&self) -> &Url {
        &self.messages_url
    }

    pub fn save_url(&self) -> &Url {
        &self.save_url
    }

    async fn read_success_body(
        response: reqwest::Response,
        url: &Url,
        stage: &'static str,
    ) -> HistoryResult<String> {
        let status = response.status();
        let body = response.text().await.context(RequestSnafu {
            stage,
            url: url.to_string(),
        })?;

        if !status.is_success() {
            return StatusSnafu {
                stage,
                url: url.to_string(),
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        Ok(body)
    }

    async fn fetch_from_backend(&self) -> HistoryResult<Vec<ChatMessage>> {
        let url = &self.messages_url;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .context(RequestSnafu {
                stage: "history-fetch-send",
                url: url.to_string(),
            })?;
        let body = Self::read_success_body(response, url, "history-fetch-read").await?;

        let payload: MessagesResponse = serde_json::from_str(&body).context(DecodeSnafu {
            stage: "history-fetch-decode",
            url: url.to_string(),
        })?;

        let messages = payload
            .messages
            .into_iter()
            .map(ChatMessage::from)
            .collect::<Vec<_>>();
        tracing::debug!(url = %url, count = messages.len(), "fetched message history");
        Ok(messages)
    }

    async fn save_to_backend(&self, message: ChatMessage) -> HistoryResult<()> {
        let url = &self.save_url;
        let response = self
            .client
            .post(url.clone())
            .json(&SaveRequest::from(message))
            .send()
            .await
            .context(RequestSnafu {
                stage: "history-save-send",
                url: url.to_string(),
            })?;
        Self::read_success_body(response, url, "history-save-read").await?;
        Ok(())
    }
}

impl HistoryService for HttpHistoryService {
    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn fetch_messages<'a>(&'a self) -> BoxFuture<'a, HistoryResult<Vec<ChatMessage>>> {
        Box::pin(self.fetch_from_backend())
    }

    fn save<'a>(&'a self, message: ChatMessage) -> BoxFuture<'a, HistoryResult<()>> {
        Box::pin(self.save_to_backend(message))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::error::HistoryError;

    /// Serves one canned HTTP response and returns the raw request it got.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0_u8; 1024];

            loop {
                let read = stream.read(&mut buffer).await.unwrap();
                request.extend_from_slice(&buffer[..read]);
                let text = String::from_utf8_lossy(&request).to_string();
                let Some(header_end) = text.find("\r\n\r\n") else {
                    if read == 0 {
                        break;
                    }
                    continue;
                };
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length || read == 0 {
                    break;
                }
            }

            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (base_url, handle)
    }

    #[test]
    fn joins_endpoints_onto_base_path() {
        let service = HttpHistoryService::new(HistoryConfig::default()).unwrap();
        assert_eq!(
            service.messages_url().as_str(),
            "https://challenge-react-chat-server.onrender.com/api/messages"
        );

        let service = HttpHistoryService::new(HistoryConfig::new("http://localhost:3000/api")).unwrap();
        assert_eq!(service.save_url().as_str(), "http://localhost:3000/api/save");
    }

    #[test]
    fn rejects_invalid_base_url() {
        let error = HttpHistoryService::new(HistoryConfig::new("::nope::")).err().unwrap();
        assert!(matches!(error, HistoryError::InvalidBaseUrl { .. }));
    }

    #[tokio::test]
    async fn fetches_messages_in_server_order() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"messages":[{"from":"x","message":"hi"},{"from":"y","message":"hola"}]}"#,
        )
        .await;
        let service = HttpHistoryService::new(HistoryConfig::new(base_url)).unwrap();

        let messages = service.fetch_messages().await.unwrap();
        assert_eq!(
            messages,
            vec![ChatMessage::new("x", "hi"), ChatMessage::new("y", "hola")]
        );

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/messages "), "{request}");
    }

    #[tokio::test]
    async fn saves_message_with_backend_field_names() {
        let (base_url, server) = serve_once("HTTP/1.1 200 OK", r#"{"ok":true}"#).await;
        let service = HttpHistoryService::new(HistoryConfig::new(base_url)).unwrap();

        service.save(ChatMessage::new("ana", "hola")).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/save "), "{request}");
        let body = request.split("\r\n\r\n").nth(1).unwrap_or_default();
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body, serde_json::json!({"message": "hola", "from": "ana"}));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (base_url, _server) =
            serve_once("HTTP/1.1 500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let service = HttpHistoryService::new(HistoryConfig::new(base_url)).unwrap();

        let error = service.fetch_messages().await.unwrap_err();
        assert!(
            matches!(error, HistoryError::Status { status: 500, .. }),
            "{error}"
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let (base_url, _server) = serve_once("HTTP/1.1 200 OK", "not json").await;
        let service = HttpHistoryService::new(HistoryConfig::new(base_url)).unwrap();

        let error = service.fetch_messages().await.unwrap_err();
        assert!(matches!(error, HistoryError::Decode { .. }), "{error}");
    }
}
