//! Handlers for the review path.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/choices` | Body: `{"recipient":1,"token":"review:3:7:4"}` |
//! | `POST` | `/reviews` | Body: `{"user_id":1,"phrase_id":7,"session_id":3,"quality":4}` |
//! | `GET`  | `/users/:user_id/phrases/:phrase_id/review` | 404 if never reviewed |
//! | `GET`  | `/users/:user_id/phrases/:phrase_id/history` | Most recent first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use phrasemate_core::{
  ReviewEngine, ReviewOutcome,
  delivery::ChoiceMade,
  model::{PhraseId, Review, ReviewHistory, SessionId, UserId},
  store::Repository,
};
use serde::Deserialize;

use crate::error::ApiError;

// ─── Choice callback ─────────────────────────────────────────────────────────

/// A button press as forwarded by the chat bridge: who pressed it and the
/// opaque callback token attached to the button.
#[derive(Debug, Deserialize)]
pub struct ChoiceBody {
  pub recipient: i64,
  pub token:     String,
}

/// `POST /choices`
pub async fn choice<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Json(body): Json<ChoiceBody>,
) -> Result<Json<ReviewOutcome>, ApiError>
where
  S: Repository,
{
  let choice = ChoiceMade::from_token(body.recipient, &body.token)?;
  let outcome = engine.handle_choice(choice, Utc::now()).await?;
  Ok(Json(outcome))
}

// ─── Direct review ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub user_id:    UserId,
  pub phrase_id:  PhraseId,
  pub session_id: SessionId,
  pub quality:    u8,
}

/// `POST /reviews`
pub async fn review<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<ReviewOutcome>, ApiError>
where
  S: Repository,
{
  let outcome = engine
    .review_phrase(
      body.phrase_id,
      body.user_id,
      body.session_id,
      body.quality,
      Utc::now(),
    )
    .await?;
  Ok(Json(outcome))
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// `GET /users/:user_id/phrases/:phrase_id/review`
pub async fn current<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((user_id, phrase_id)): Path<(UserId, PhraseId)>,
) -> Result<Json<Review>, ApiError>
where
  S: Repository,
{
  let review = engine
    .current_review(user_id, phrase_id)
    .await?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "no review for phrase {phrase_id} of user {user_id}"
      ))
    })?;
  Ok(Json(review))
}

/// `GET /users/:user_id/phrases/:phrase_id/history`
pub async fn history<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Path((user_id, phrase_id)): Path<(UserId, PhraseId)>,
) -> Result<Json<Vec<ReviewHistory>>, ApiError>
where
  S: Repository,
{
  Ok(Json(engine.review_history(user_id, phrase_id).await?))
}
