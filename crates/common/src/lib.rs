//! Common types shared by the food-safety dashboard crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
