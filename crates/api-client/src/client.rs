//! Request client
//!
//! One `ApiClient` per process. It appends endpoints to the configured base
//! URL, JSON-encodes bodies, classifies failures, and handles one
//! refresh-and-replay cycle per logical call:
//!
//! - 401 + `requires_auth` + first attempt → `RefreshCoordinator`, then replay
//!   the identical request once
//! - 401 otherwise (public call, or the replay itself) → ordinary failure
//! - any other non-2xx → `Error::RequestFailed`

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info_span, warn};

use crate::config::ClientConfig;
use crate::download::Download;
use crate::error::{self, Error, Result};
use crate::metrics;
use crate::refresh::RefreshCoordinator;
use crate::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

/// Per-call options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Whether a 401 may trigger a session refresh. Defaults to true.
    pub requires_auth: bool,
    /// Extra headers. For JSON calls these extend the defaults but never
    /// replace `Content-Type`.
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            requires_auth: true,
            headers: HeaderMap::new(),
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call that must never trigger a refresh (login, logout, session probe).
    pub fn public() -> Self {
        Self {
            requires_auth: false,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// How a successful response is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseKind {
    Json,
    Download,
}

/// One logical API operation. `is_retry` is only ever set by the client.
#[derive(Debug, Clone)]
struct RequestDescriptor {
    method: Method,
    endpoint: String,
    body: Option<Bytes>,
    headers: HeaderMap,
    requires_auth: bool,
    is_retry: bool,
    kind: ResponseKind,
}

/// HTTP client for the dashboard API. Clones share the transport and the
/// refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: Arc<str>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Client on a cookie-keeping `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(Arc::new(transport), &config.base_url))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            refresh: RefreshCoordinator::new(transport.clone(), base_url),
            transport,
            base_url: Arc::from(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        self.json(Method::GET, endpoint, None, options).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode(body)?;
        self.json(Method::POST, endpoint, Some(body), options).await
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        self.json(Method::POST, endpoint, None, options).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode(body)?;
        self.json(Method::PUT, endpoint, Some(body), options).await
    }

    pub async fn patch<T, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode(body)?;
        self.json(Method::PATCH, endpoint, Some(body), options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        self.json(Method::DELETE, endpoint, None, options).await
    }

    /// GET a binary resource. No `Content-Type` is added; only the caller's
    /// headers are sent.
    pub async fn download(&self, endpoint: &str, options: RequestOptions) -> Result<Download> {
        let descriptor = RequestDescriptor {
            method: Method::GET,
            endpoint: endpoint.to_owned(),
            body: None,
            headers: options.headers,
            requires_auth: options.requires_auth,
            is_retry: false,
            kind: ResponseKind::Download,
        };
        let response = self.execute(descriptor).await?;
        Ok(Download {
            status: response.status,
            headers: response.headers,
            body: response.body,
        })
    }

    async fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Bytes>,
        options: RequestOptions,
    ) -> Result<T> {
        let mut headers = options.headers;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let descriptor = RequestDescriptor {
            method,
            endpoint: endpoint.to_owned(),
            body,
            headers,
            requires_auth: options.requires_auth,
            is_retry: false,
            kind: ResponseKind::Json,
        };
        let response = self.execute(descriptor).await?;
        decode(&response.body)
    }

    /// Run one logical call, including at most one refresh-and-replay.
    async fn execute(&self, descriptor: RequestDescriptor) -> Result<TransportResponse> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        let span = info_span!(
            "api_request",
            request_id = %request_id,
            method = %descriptor.method,
            endpoint = %descriptor.endpoint,
        );
        self.execute_inner(descriptor).instrument(span).await
    }

    async fn execute_inner(&self, mut descriptor: RequestDescriptor) -> Result<TransportResponse> {
        loop {
            let response = self.send(&descriptor).await?;

            if response.status == StatusCode::UNAUTHORIZED
                && descriptor.requires_auth
                && !descriptor.is_retry
            {
                debug!("session expired, refreshing before replay");
                match self.refresh.ensure_fresh_session().await {
                    Ok(()) => {
                        descriptor.is_retry = true;
                        continue;
                    }
                    Err(e) => {
                        warn!(error = %e, "session could not be renewed");
                        return Err(error::auth_expired(&response.body));
                    }
                }
            }

            if !response.status.is_success() {
                let err = match descriptor.kind {
                    ResponseKind::Json => error::request_failed(response.status, &response.body),
                    ResponseKind::Download => {
                        error::download_failed(response.status, &response.headers, &response.body)
                    }
                };
                debug!(
                    status = response.status.as_u16(),
                    retry = descriptor.is_retry,
                    error = %err,
                    "request failed"
                );
                return Err(err);
            }

            return Ok(response);
        }
    }

    async fn send(&self, descriptor: &RequestDescriptor) -> Result<TransportResponse> {
        let request = TransportRequest {
            method: descriptor.method.clone(),
            url: format!("{}{}", self.base_url, descriptor.endpoint),
            headers: descriptor.headers.clone(),
            body: descriptor.body.clone(),
        };

        let started = Instant::now();
        match self.transport.send(request).await {
            Ok(response) => {
                metrics::record_request(
                    descriptor.method.as_str(),
                    response.status.as_u16(),
                    started.elapsed().as_secs_f64(),
                );
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "request did not reach the server");
                metrics::record_network_error(&e);
                Err(Error::Network(e))
            }
        }
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Bytes> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| Error::InvalidRequest(format!("body is not valid JSON: {e}")))
}

/// Decode a 2xx body. An empty body decodes as JSON `null`.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))
}
