//! HTTP client for the cart API

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{ApiErrorBody, ApiResponse};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::{ClientError, ClientResult};

/// Header carrying the per-instance guest session id
pub const SESSION_HEADER: &str = "X-Session-Id";

/// HTTP client trait
///
/// Paths are relative to the API base URL (e.g. `api/cart/items`).
/// Successful responses are unwrapped from the `ApiResponse` envelope.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T>;
    async fn post<T: DeserializeOwned, B: Serialize + std::marker::Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T>;
    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T>;
    async fn put<T: DeserializeOwned, B: Serialize + std::marker::Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T>;
    async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T>;

    /// Replace the bearer token (`None` signs out)
    fn set_token(&self, token: Option<String>);
    fn token(&self) -> Option<String>;
    fn session_id(&self) -> &str;
}

/// Network HTTP client
#[derive(Debug, Clone)]
pub struct NetworkHttpClient {
    client: Client,
    base_url: String,
    session_id: String,
    token: Arc<RwLock<Option<String>>>,
}

impl NetworkHttpClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::from_config(&ClientConfig::new(base_url))
    }

    /// Build a client with a fresh session id
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_id: shared::util::new_session_id(),
            token: Arc::new(RwLock::new(config.token.clone())),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self
            .client
            .request(method, url)
            .header(SESSION_HEADER, &self.session_id);
        if let Some(token) = self.token.read().as_deref() {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> ClientResult<T> {
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // Structured API error first
            if let Ok(api_err) = serde_json::from_str::<ApiErrorBody>(&text) {
                return Err(ClientError::Api {
                    code: api_err.error_code(),
                    message: api_err.message,
                });
            }
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::BAD_REQUEST => Err(ClientError::Validation(text)),
                _ => Err(ClientError::Internal(format!("{}: {}", status, text))),
            };
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&text)?;
        if !envelope.is_success() {
            return Err(ClientError::InvalidResponse(format!(
                "unexpected response code {}: {}",
                envelope.code, envelope.message
            )));
        }
        envelope
            .into_data()
            .ok_or_else(|| ClientError::InvalidResponse("Missing response data".into()))
    }
}

#[async_trait]
impl HttpClient for NetworkHttpClient {
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + std::marker::Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.request(Method::POST, path)).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + std::marker::Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.request(Method::DELETE, path)).await
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }
}
