//! Session state machine
//!
//! Transitions:
//! - Loading → Authenticated | Anonymous (startup probe)
//! - Anonymous → Authenticated (login)
//! - Authenticated → Anonymous (logout, or an `AuthExpired` observed anywhere)

use api_client::{ApiClient, RequestOptions};
use common::Secret;
use serde::Serialize;
use serde::de::IgnoredAny;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::user::User;

/// Shortest password accepted by `create_password`.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Authentication state as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Startup probe not finished
    Loading,
    Authenticated,
    Anonymous,
}

/// Login form payload.
#[derive(Debug, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: Secret<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<Secret<String>>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Serialize)]
struct CreatePassword<'a> {
    token: &'a str,
    password: &'a Secret<String>,
}

/// Authentication session backed by the shared `ApiClient`.
pub struct Session {
    client: ApiClient,
    state: RwLock<AuthState>,
}

impl Session {
    /// New session in `Loading` until `check()` runs.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: RwLock::new(AuthState::Loading),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state().await == AuthState::Authenticated
    }

    pub async fn is_loading(&self) -> bool {
        self.state().await == AuthState::Loading
    }

    /// Probe `GET /auth/me` without triggering a refresh and record the result.
    pub async fn check(&self) -> bool {
        let probe = self
            .client
            .get::<IgnoredAny>("/auth/me", RequestOptions::public())
            .await;
        let authenticated = match probe {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "session probe failed");
                false
            }
        };
        self.set(if authenticated {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        })
        .await;
        authenticated
    }

    /// Sign in with email and password. State is unchanged on failure.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        self.client
            .post::<IgnoredAny, _>("/auth/login", credentials, RequestOptions::public())
            .await?;
        info!(email = %credentials.email, "signed in");
        self.mark_authenticated().await;
        Ok(())
    }

    /// Flip to `Authenticated` without a request, after a successful sign-in
    /// performed elsewhere.
    pub async fn mark_authenticated(&self) {
        self.set(AuthState::Authenticated).await;
    }

    /// Sign out. Server errors are logged; the session always ends anonymous.
    pub async fn logout(&self) {
        let result = self
            .client
            .post::<IgnoredAny, _>(
                "/auth/logout",
                &serde_json::Map::new(),
                RequestOptions::public(),
            )
            .await;
        if let Err(e) = result {
            warn!(error = %e, "logout request failed");
        }
        self.set(AuthState::Anonymous).await;
        info!("signed out");
    }

    /// Profile of the signed-in user. An expired session is observed.
    pub async fn current_user(&self) -> Result<User> {
        match self.client.get::<User>("/auth/me", RequestOptions::new()).await {
            Ok(user) => Ok(user),
            Err(e) => {
                self.observe(&e).await;
                Err(e.into())
            }
        }
    }

    /// Set the first password of an invited user. Does not sign in.
    pub async fn create_password(&self, token: &str, password: &Secret<String>) -> Result<()> {
        if token.trim().is_empty() {
            return Err(Error::Validation("Token inválido ou ausente".into()));
        }
        if password.expose().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::Validation(format!(
                "A senha deve ter no mínimo {MIN_PASSWORD_LENGTH} caracteres"
            )));
        }

        self.client
            .post::<IgnoredAny, _>(
                "/users/create-password",
                &CreatePassword { token, password },
                RequestOptions::public(),
            )
            .await?;
        info!("password created");
        Ok(())
    }

    /// Report an error seen by any caller. `AuthExpired` ends the session.
    pub async fn observe(&self, error: &api_client::Error) {
        if error.is_auth_expired() {
            warn!(error = %error, "session expired, sign-in required");
            self.set(AuthState::Anonymous).await;
        }
    }

    async fn set(&self, state: AuthState) {
        let mut current = self.state.write().await;
        if *current != state {
            debug!(from = ?*current, to = ?state, "auth state changed");
            *current = state;
        }
    }
}
