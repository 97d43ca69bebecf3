use crate::client::{LokiClient, LokiClientInner, headers};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::{sync::Arc, time::Duration};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LokiClientBuilderError {
    /// Missing required field in the builder.
    #[error("missing required field: {0}")]
    Missing(&'static str),
    /// The base url is not an http(s) url.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
    /// The tenant cannot be sent as a header value.
    #[error("invalid tenant: {0}")]
    InvalidTenant(String),
    /// The underlying http client could not be built.
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Builder for creating a Loki client with required and optional parameters.
pub struct LokiClientBuilder<'a> {
    base_url: Option<&'a str>,
    username: Option<&'a str>,
    password: Option<&'a str>,
    tenant: &'a str,
    timeout: Duration,
    enable_trace: bool,
}

type Result<T, E = LokiClientBuilderError> = std::result::Result<T, E>;

impl Default for LokiClientBuilder<'_> {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            tenant: headers::DEFAULT_TENANT,
            timeout: DEFAULT_TIMEOUT,
            enable_trace: true,
        }
    }
}

impl<'a> LokiClientBuilder<'a> {
    /// Set the base url of the Loki server, e.g. `https://logs.example.com`.
    ///
    /// Trailing slashes are ignored; the push path is appended on build.
    pub fn base_url(mut self, base_url: &'a str) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the basic auth username.
    pub fn username(mut self, username: &'a str) -> Self {
        self.username = Some(username);
        self
    }

    /// Set the basic auth password.
    pub fn password(mut self, password: &'a str) -> Self {
        self.password = Some(password);
        self
    }

    /// Set the tenant sent in the `X-Scope-OrgID` header.
    ///
    /// Default is `tenant1`.
    pub fn tenant(mut self, tenant: &'a str) -> Self {
        self.tenant = tenant;
        self
    }

    /// Set the timeout of a single push request.
    ///
    /// Default is 10 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable tracing for the Loki client.
    ///
    /// Enabled by default.
    /// If enabled, client will log request outcomes via [`tracing`](https://docs.rs/tracing/latest/tracing/) crate.
    pub fn enable_trace(mut self, enable_trace: bool) -> Self {
        self.enable_trace = enable_trace;
        self
    }

    /// Build the Loki client with the provided configuration.
    pub fn build(self) -> Result<LokiClient> {
        let base_url = self
            .base_url
            .ok_or(LokiClientBuilderError::Missing("base_url"))?
            .trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(LokiClientBuilderError::InvalidUrl(base_url.to_string()));
        }

        let credentials = match (self.username, self.password) {
            (None, None) => None,
            (Some(username), Some(password)) => Some((username.to_string(), password.to_string())),
            (Some(_), None) => return Err(LokiClientBuilderError::Missing("password")),
            (None, Some(_)) => return Err(LokiClientBuilderError::Missing("username")),
        };

        let tenant = HeaderValue::from_str(self.tenant)
            .map_err(|_| LokiClientBuilderError::InvalidTenant(self.tenant.to_string()))?;

        let http = reqwest::ClientBuilder::new()
            .user_agent(headers::USER_AGENT_VALUE)
            .timeout(self.timeout)
            .default_headers(HeaderMap::from_iter([
                (
                    CONTENT_TYPE,
                    HeaderValue::from_static(headers::DEFAULT_CONTENT_TYPE),
                ),
                (HeaderName::from_static(headers::SCOPE_ORG_ID), tenant),
            ]))
            .build()?;

        let client = LokiClientInner {
            url: format!("{base_url}{}", headers::PUSH_PATH),
            credentials,
            http,
            enable_trace: self.enable_trace,
        };

        Ok(LokiClient {
            inner: Arc::new(client),
        })
    }
}
