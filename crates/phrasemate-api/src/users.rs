//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users` | All registered learners |
//! | `GET`  | `/users/:user_id` | 404 if not found |
//! | `POST` | `/users/:user_id/next` | Next phrase to present; 204 when idle |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::Utc;
use phrasemate_core::{
  ReviewEngine,
  model::{User, UserId},
  store::Repository,
};

use crate::error::ApiError;

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /users`
pub async fn list<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: Repository,
{
  Ok(Json(engine.list_users().await?))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /users/:user_id`
pub async fn get_one<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path(user_id): Path<UserId>,
) -> Result<Json<User>, ApiError>
where
  S: Repository,
{
  Ok(Json(engine.user(user_id).await?))
}

// ─── Next phrase ─────────────────────────────────────────────────────────────

/// `POST /users/:user_id/next`
///
/// The same trigger the dispatch loop fires, for one user: responds with the
/// [`phrasemate_core::delivery::Presentation`] to show, or `204` when nothing
/// is due (the session is closed in that case).
pub async fn next<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path(user_id): Path<UserId>,
) -> Result<Response, ApiError>
where
  S: Repository,
{
  let user = engine.user(user_id).await?;
  let response = match engine.present_next(&user, Utc::now()).await? {
    Some(presentation) => Json(presentation).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  };
  Ok(response)
}
