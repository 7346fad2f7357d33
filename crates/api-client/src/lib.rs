//! HTTP request layer for the food-safety dashboard API
//!
//! Wraps every outbound API call, attaches the ambient session cookie, and
//! recovers from an expired session transparently:
//! 1. A call marked `requires_auth` comes back 401
//! 2. The shared `RefreshCoordinator` runs (or joins) the single in-flight
//!    `POST /auth/refresh`
//! 3. On success the original call is replayed once with the same method,
//!    headers and body; on failure the caller gets `Error::AuthExpired`
//!
//! Everything goes through the `Transport` capability so the client can be
//! driven by `ReqwestTransport` in production and by scripted fakes in tests.

pub mod client;
pub mod company;
pub mod config;
pub mod download;
pub mod error;
pub mod metrics;
pub mod refresh;
pub mod transport;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{ApiClient, RequestOptions};
pub use company::{Company, CompanyUpdate};
pub use config::{
    BASE_URL_ENV, ClientConfig, DEFAULT_BASE_URL, base_url_from_env, resolve_base_url,
};
pub use download::{Download, content_disposition_filename};
pub use error::{Error, Result, SESSION_EXPIRED_MESSAGE};
pub use refresh::{REFRESH_ENDPOINT, RefreshCoordinator, RefreshError};
pub use transport::{
    ReqwestTransport, SendFuture, Transport, TransportError, TransportRequest, TransportResponse,
};
