//! Session refresh coordination
//!
//! Any number of calls can discover an expired session at the same moment.
//! `RefreshCoordinator` turns all of them into a single `POST /auth/refresh`:
//! the first caller starts the network call in a spawned task and records a
//! shared handle to its outcome; every caller arriving while it is in flight
//! awaits that same handle. The task clears the slot as soon as the call
//! settles, so the next expiry starts a fresh refresh.

use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::transport::{Transport, TransportError, TransportRequest};

/// Session refresh endpoint, relative to the base URL.
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";

/// Why a refresh did not renew the session.
///
/// Callers of the request layer never see this type: both variants become
/// `Error::AuthExpired`. It is kept distinct for logs and metrics.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    #[error("session refresh rejected with {status}")]
    Rejected { status: StatusCode },

    #[error("session refresh failed: {0}")]
    Transport(TransportError),
}

type Outcome = Result<(), RefreshError>;

/// An in-flight refresh. `generation` tells a settling refresh whether the
/// slot still holds it.
struct Pending {
    generation: u64,
    outcome: Shared<BoxFuture<'static, Outcome>>,
}

#[derive(Default)]
struct Slot {
    pending: Option<Pending>,
    next_generation: u64,
}

/// De-duplicates concurrent session refreshes.
///
/// Cloning shares the same slot; all clones coordinate with each other.
#[derive(Clone)]
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    url: String,
    slot: Arc<Mutex<Slot>>,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn Transport>, base_url: &str) -> Self {
        Self {
            transport,
            url: format!("{}{REFRESH_ENDPOINT}", base_url.trim_end_matches('/')),
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Renew the session, joining a refresh already in flight if there is one.
    ///
    /// Every caller attached to the same refresh receives the same outcome.
    pub async fn ensure_fresh_session(&self) -> Result<(), RefreshError> {
        let outcome = {
            let mut guard = self.slot.lock().await;
            let slot = &mut *guard;
            match &slot.pending {
                Some(pending) => {
                    debug!(generation = pending.generation, "joining in-flight session refresh");
                    pending.outcome.clone()
                }
                None => {
                    let generation = slot.next_generation;
                    slot.next_generation += 1;
                    let outcome = self.start(generation);
                    slot.pending = Some(Pending {
                        generation,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };

        outcome.await
    }

    /// Whether a refresh call is currently outstanding.
    pub async fn in_progress(&self) -> bool {
        self.slot.lock().await.pending.is_some()
    }

    /// Spawn the network call. Must be called with the slot locked so the
    /// task cannot clear the slot before the handle is recorded.
    fn start(&self, generation: u64) -> Shared<BoxFuture<'static, Outcome>> {
        debug!(generation, "starting session refresh");

        let transport = self.transport.clone();
        let request = self.refresh_request();
        let slot = self.slot.clone();
        let task = tokio::spawn({
            let slot = slot.clone();
            async move {
                let outcome = refresh_once(transport.as_ref(), request).await;
                clear(&slot, generation).await;
                outcome
            }
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The task never reached its own cleanup
                    clear(&slot, generation).await;
                    Err(RefreshError::Transport(TransportError::Other(format!(
                        "refresh task failed: {e}"
                    ))))
                }
            }
        }
        .boxed()
        .shared()
    }

    fn refresh_request(&self) -> TransportRequest {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        TransportRequest {
            method: Method::POST,
            url: self.url.clone(),
            headers,
            body: None,
        }
    }
}

async fn clear(slot: &Mutex<Slot>, generation: u64) {
    let mut slot = slot.lock().await;
    if slot
        .pending
        .as_ref()
        .is_some_and(|p| p.generation == generation)
    {
        slot.pending = None;
    }
}

/// One refresh network call. Any 2xx renews the session.
async fn refresh_once(transport: &dyn Transport, request: TransportRequest) -> Outcome {
    let started = Instant::now();
    match transport.send(request).await {
        Ok(response) => {
            metrics::record_request(
                "POST",
                response.status.as_u16(),
                started.elapsed().as_secs_f64(),
            );
            if response.status.is_success() {
                info!("session refreshed");
                metrics::record_refresh("success");
                Ok(())
            } else {
                warn!(status = response.status.as_u16(), "session refresh rejected");
                metrics::record_refresh("rejected");
                Err(RefreshError::Rejected {
                    status: response.status,
                })
            }
        }
        Err(e) => {
            warn!(error = %e, "session refresh did not reach the server");
            metrics::record_network_error(&e);
            metrics::record_refresh("network");
            Err(RefreshError::Transport(e))
        }
    }
}
