//! HTTP server and background dispatch for phrasemate.
//!
//! Mounts the JSON API under `/api` behind HTTP Basic auth, and drives the
//! periodic "present the next phrase" pass through a configured delivery
//! adapter.

pub mod auth;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod error;

pub use config::ServerConfig;
pub use error::Error;

use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use phrasemate_core::{ReviewEngine, store::Repository};
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth};

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router.
///
/// `/health` is open; everything under `/api` requires credentials.
pub fn router<S>(engine: Arc<ReviewEngine<S>>, auth: Arc<AuthConfig>) -> Router
where
  S: Repository + 'static,
{
  let api = phrasemate_api::api_router(engine)
    .route_layer(middleware::from_fn_with_state(auth, require_auth));

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

// ─── Integration tests ───────────────────────────────────────────────────────
