//! # beacon-api
//!
//! HTTP layer for Beacon built on Axum.
//!
//! Exposes the WebSocket upgrade, token refresh, logout, and health
//! endpoints, plus the error mapping and request logging they share. Login
//! and account management belong to collaborators, which call the session
//! authority directly.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state, run_server};
pub use error::ApiError;
pub use state::AppState;
