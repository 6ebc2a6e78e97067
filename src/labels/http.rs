//! HTTP label backend client.
//!
//! `POST {endpoint}/labels/membership` with a [`LabelQuery`] JSON body;
//! the backend answers `{"thread_ids": [...]}`.

use std::time::Duration;

use tracing::debug;

use super::{LabelMembership, LabelQuery, LabelResolver};
use crate::error::{MailscopeError, Result};

pub struct HttpLabelResolver {
    endpoint: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HttpLabelResolver {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_token: None,
            client,
        })
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    fn membership_url(&self) -> String {
        format!("{}/labels/membership", self.endpoint)
    }
}

#[async_trait::async_trait]
impl LabelResolver for HttpLabelResolver {
    async fn resolve_label_membership(&self, query: &LabelQuery) -> Result<LabelMembership> {
        let url = self.membership_url();
        debug!(%url, threads = query.thread_ids.len(), "Resolving label membership");

        let mut request = self.client.post(&url).json(query);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailscopeError::LabelBackendStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<LabelMembership>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use crate::labels::LabelMatch;
    use crate::model::hit::ReconciledHit;
    use crate::search::filter::{SearchFilter, SystemLabel};
    use crate::search::gate::apply_label_gate;

    fn spam_query() -> LabelQuery {
        LabelQuery {
            thread_ids: vec!["t1".into()],
            system_labels: vec![SystemLabel::Spam],
            user_label_ids: vec![],
            mode: LabelMatch::All,
        }
    }

    /// Read one request (headers and body) off the socket.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve a single canned response on a local port and return its base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            assert!(request.starts_with("POST /labels/membership "));
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    fn resolver(endpoint: &str) -> HttpLabelResolver {
        HttpLabelResolver::new(endpoint, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let endpoint = serve_once("503 Service Unavailable", r#"{"error":"down"}"#).await;
        match resolver(&endpoint).resolve_label_membership(&spam_query()).await {
            Err(MailscopeError::LabelBackendStatus { status, body }) => {
                assert_eq!(status, 503);
                assert!(body.contains("down"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_without_thread_ids_has_no_data() {
        let endpoint = serve_once("200 OK", r#"{"error":"x"}"#).await;
        let membership = resolver(&endpoint)
            .resolve_label_membership(&spam_query())
            .await
            .unwrap();
        assert_eq!(membership.thread_ids, None);
    }

    #[tokio::test]
    async fn test_success_with_thread_ids() {
        let endpoint = serve_once("200 OK", r#"{"thread_ids":["t1"]}"#).await;
        let membership = resolver(&endpoint)
            .resolve_label_membership(&spam_query())
            .await
            .unwrap();
        assert_eq!(membership, LabelMembership::threads(["t1"]));
    }

    #[tokio::test]
    async fn test_gate_drops_everything_when_backend_has_no_data() {
        let endpoint = serve_once("200 OK", r#"{"error":"x"}"#).await;
        let candidate = ReconciledHit {
            id: "m1".into(),
            thread_id: "t1".into(),
            kind: Default::default(),
            created_at: chrono::Utc::now(),
            score: 0.5,
            matched_terms: Default::default(),
            match_info: Default::default(),
            sources: 1,
            rank: 0,
        };
        let filters = [SearchFilter::SystemLabel {
            label: SystemLabel::Spam,
        }];
        let gated = apply_label_gate(vec![candidate], &filters, &resolver(&endpoint)).await;
        assert!(gated.is_empty());
    }

    #[test]
    fn test_membership_url_strips_trailing_slash() {
        let resolver =
            HttpLabelResolver::new("http://labels.local/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            resolver.membership_url(),
            "http://labels.local/api/labels/membership"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        // Nothing listens on port 1.
        let resolver =
            HttpLabelResolver::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            resolver.resolve_label_membership(&spam_query()).await,
            Err(MailscopeError::Http(_))
        ));
    }
}
