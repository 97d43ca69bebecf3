//! Grafana Loki push client

pub use self::builder::{LokiClientBuilder, LokiClientBuilderError};
use crate::Payload;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{Instrument, Level};

mod builder;
mod headers;

/// A client for pushing streams to the Loki push API.
#[derive(Clone)]
pub struct LokiClient {
    inner: Arc<LokiClientInner>,
}

struct LokiClientInner {
    url: String,
    credentials: Option<(String, String)>,
    http: reqwest::Client,
    enable_trace: bool,
}

/// Error type for Loki client operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LokiClientError {
    /// The server answered with a status other than `200` or `204`.
    #[error("http error [{status}] {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: Box<str>,
    },
    /// Connection, timeout or other transport level failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The payload could not be encoded.
    #[error("failed to encode payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl LokiClient {
    /// Create a new Loki client builder.
    pub fn builder<'a>() -> LokiClientBuilder<'a> {
        LokiClientBuilder::default()
    }

    /// The full push url.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Push a payload, discarding the outcome.
    pub async fn push(&self, payload: &Payload) {
        self.try_push(payload).await.ok();
    }

    /// Push a payload in a single request.
    ///
    /// Nothing is retried: a failed push is reported once and the payload is gone.
    pub async fn try_push(&self, payload: &Payload) -> Result<(), LokiClientError> {
        let fut = async move {
            let result = self.push_inner(payload).await;
            if self.inner.enable_trace {
                match &result {
                    Ok(()) => tracing::trace!(entries = payload.entries(), "pushed"),
                    Err(e) => tracing::debug!(err = %e, "push failed"),
                }
            }
            result
        };
        if self.inner.enable_trace {
            fut.instrument(tracing::span!(Level::TRACE, "push", url = %self.inner.url))
                .await
        } else {
            fut.await
        }
    }

    async fn push_inner(&self, payload: &Payload) -> Result<(), LokiClientError> {
        let body = payload.to_json()?;

        let mut builder = self.inner.http.post(&self.inner.url).body(body);
        if let Some((username, password)) = &self.inner.credentials {
            builder = builder.basic_auth(username, Some(password));
        }

        let res = builder.send().await?;
        let status = res.status();
        if !is_accepted(status) {
            let message = res.text().await.unwrap_or_default();
            return Err(LokiClientError::Http {
                status: status.as_u16(),
                message: message.into_boxed_str(),
            });
        }
        Ok(())
    }
}

fn is_accepted(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallSite, LabelSet, LogEntry, group_batch};
    use mockito::{Matcher, Server};

    fn payload() -> Payload {
        let batch = [LogEntry::new(1_700_000_000_000_000_000, "INFO", "hello")
            .with_call_site(CallSite::new("main", "main.rs", 3))];
        group_batch(&batch, &LabelSet::new().with("job", "test"))
    }

    #[tokio::test]
    async fn pushes_json_with_auth_and_tenant() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/loki/api/v1/push")
            .match_header("content-type", "application/json")
            .match_header("x-scope-orgid", "team-a")
            .match_header("authorization", "Basic dXNlcjpwYXNz")
            .match_body(Matcher::Json(serde_json::json!({
                "streams": [{
                    "stream": {"file": "main.rs", "function": "main", "job": "test", "level": "info"},
                    "values": [["1700000000000000000", "[main:3] hello"]],
                }]
            })))
            .with_status(204)
            .create_async()
            .await;

        let url = format!("{}/", server.url());
        let client = LokiClient::builder()
            .base_url(&url)
            .username("user")
            .password("pass")
            .tenant("team-a")
            .build()
            .unwrap();

        client.try_push(&payload()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn ok_status_is_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/loki/api/v1/push")
            .with_status(200)
            .create_async()
            .await;
        let url = server.url();
        let client = LokiClient::builder().base_url(&url).build().unwrap();
        assert!(client.try_push(&payload()).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn other_status_is_failure() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/loki/api/v1/push")
            .with_status(500)
            .with_body("ingester unavailable")
            .expect(1)
            .create_async()
            .await;
        let url = server.url();
        let client = LokiClient::builder().base_url(&url).build().unwrap();

        let err = client.try_push(&payload()).await.unwrap_err();
        match err {
            LokiClientError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(&*message, "ingester unavailable");
            }
            e => panic!("unexpected error: {e}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn push_discards_failure() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/loki/api/v1/push")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let url = server.url();
        let client = LokiClient::builder().base_url(&url).build().unwrap();
        client.push(&payload()).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn accepted_is_not_success() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/loki/api/v1/push")
            .with_status(202)
            .create_async()
            .await;
        let url = server.url();
        let client = LokiClient::builder().base_url(&url).build().unwrap();
        assert!(matches!(
            client.try_push(&payload()).await,
            Err(LokiClientError::Http { status: 202, .. })
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let client = LokiClient::builder()
            .base_url("http://127.0.0.1:1")
            .build()
            .unwrap();
        assert!(matches!(
            client.try_push(&payload()).await,
            Err(LokiClientError::Transport(_))
        ));
    }
}
