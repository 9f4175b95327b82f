//! JSON REST API for phrasemate.
//!
//! Exposes an axum [`Router`] over a [`ReviewEngine`] backed by any
//! [`phrasemate_core::store::Repository`]. This is the surface a chat bridge
//! talks to: it forwards inbound messages and button presses, and may ask for
//! the next phrase of a user. Auth, TLS, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", phrasemate_api::api_router(engine.clone()))
//! ```

pub mod error;
pub mod messages;
pub mod reviews;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use phrasemate_core::{ReviewEngine, store::Repository};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<ReviewEngine<S>>) -> Router<()>
where
  S: Repository + 'static,
{
  Router::new()
    // Inbound chat events
    .route("/messages", post(messages::ingest::<S>))
    .route("/choices", post(reviews::choice::<S>))
    .route("/reviews", post(reviews::review::<S>))
    // Users
    .route("/users", get(users::list::<S>))
    .route("/users/{user_id}", get(users::get_one::<S>))
    .route("/users/{user_id}/next", post(users::next::<S>))
    // Review state
    .route(
      "/users/{user_id}/phrases/{phrase_id}/review",
      get(reviews::current::<S>),
    )
    .route(
      "/users/{user_id}/phrases/{phrase_id}/history",
      get(reviews::history::<S>),
    )
    .with_state(engine)
}
