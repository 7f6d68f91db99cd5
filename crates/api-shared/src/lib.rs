//! # API Shared
//!
//! Shared utilities for the BucketView web layer.
//!
//! Contains:
//! - Credential checks (`auth`)
//! - The server-side session table with flash notices (`session`)
//! - The `HealthService`
//!
//! Used by `api-rest` and the workspace binary.

pub mod auth;
pub mod health;
pub mod session;

pub use auth::{authenticate, AuthError};
pub use health::{HealthRes, HealthService};
pub use session::{Flash, FlashLevel, IssuedSession, SessionStore};
