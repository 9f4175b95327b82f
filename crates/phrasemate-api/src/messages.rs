//! Handler for `POST /messages`.
//!
//! Body: an [`InboundMessage`]. Responds `201` with the new phrase and its tags
//! when the message carried hashtags, `200` for replays and plain chatter.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use phrasemate_core::{
  ReviewEngine,
  ingest::{InboundMessage, IngestOutcome},
  store::Repository,
};

use crate::error::ApiError;

/// `POST /messages`
pub async fn ingest<S>(
  State(engine): State<Arc<ReviewEngine<S>>>,
  Json(message): Json<InboundMessage>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Repository,
{
  let outcome = engine.ingest_message(message).await?;
  let status = match outcome {
    IngestOutcome::Created { .. } => StatusCode::CREATED,
    IngestOutcome::Duplicate { .. } | IngestOutcome::Ignored => StatusCode::OK,
  };
  Ok((status, Json(outcome)))
}
