//! HTTP client shared foundation
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout and User-Agent
//! - Optional bearer token and `Accept` header applied to every request
//! - Mapping of timeouts, transport failures and non-success statuses into [`HttpError`]
//!
//! Requests are never retried: a failed call is reported to the caller,
//! which decides whether to skip (registry lookups) or abort (hosting API).

use crate::error::HttpError;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Default timeout for HTTP requests (15 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default User-Agent header
pub const DEFAULT_USER_AGENT: &str = concat!("depguard/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in an [`HttpError::Status`]
const MAX_ERROR_BODY: usize = 500;

/// HTTP client wrapper
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    bearer_token: Option<String>,
    accept: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| HttpError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            bearer_token: None,
            accept: None,
        })
    }

    /// Send `Authorization: Bearer <token>` on every request
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Send the given `Accept` header on every request
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Returns true if a bearer token is attached
    pub fn has_token(&self) -> bool {
        self.bearer_token.is_some()
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(accept) = &self.accept {
            builder = builder.header(reqwest::header::ACCEPT, accept);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response, HttpError> {
        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(url, &e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        tracing::debug!(url, status = status.as_u16(), "request returned non-success status");
        Err(HttpError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, HttpError> {
        response
            .json::<T>()
            .await
            .map_err(|e| HttpError::InvalidResponse {
                url: url.to_string(),
                message: format!("failed to parse JSON: {}", e),
            })
    }

    /// Perform a GET request
    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        self.send(self.request(Method::GET, url), url).await
    }

    /// Perform a GET request and parse the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let response = self.get(url).await?;
        Self::decode(response, url).await
    }

    /// Send a JSON body with the given method and parse the JSON response
    pub async fn send_json<B, T>(&self, method: Method, url: &str, body: &B) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.request(method, url).json(body), url)
            .await?;
        Self::decode(response, url).await
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("accept", &self.accept)
            .finish()
    }
}
