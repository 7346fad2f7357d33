//! Authentication session for the dashboard
//!
//! Tracks whether the operator is signed in, on top of the request layer:
//! 1. `Session::check()` probes `GET /auth/me` without refresh at startup
//! 2. `Session::login()` posts credentials; the server sets the session cookie
//! 3. Any collaborator that sees `Error::AuthExpired` reports it via
//!    `Session::observe()`, which drops the session back to anonymous
//! 4. `Session::logout()` always ends anonymous, even if the server call fails

pub mod error;
pub mod session;
pub mod user;

pub use error::{Error, Result};
pub use session::{AuthState, Credentials, MIN_PASSWORD_LENGTH, Session};
pub use user::User;
