//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("delivery error: {0}")]
  Delivery(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<phrasemate_core::Error> for ApiError {
  fn from(e: phrasemate_core::Error) -> Self {
    use phrasemate_core::Error as E;

    match e {
      E::InvalidQuality(_) | E::InvalidCallbackToken(_) => {
        ApiError::BadRequest(e.to_string())
      }
      E::UserNotFound(_)
      | E::UnknownRecipient(_)
      | E::PhraseNotFound(_)
      | E::SessionNotFound(_) => ApiError::NotFound(e.to_string()),
      E::SessionConflict(_) => ApiError::Conflict(e.to_string()),
      E::Delivery(inner) => ApiError::Delivery(inner.to_string()),
      E::Storage(inner) => ApiError::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Delivery(m) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use phrasemate_core::{Error, model::PhraseId};

  use super::*;

  #[test]
  fn core_errors_map_to_status_codes() {
    let cases = [
      (Error::InvalidQuality(9), StatusCode::BAD_REQUEST),
      (Error::InvalidCallbackToken("x".into()), StatusCode::BAD_REQUEST),
      (Error::PhraseNotFound(PhraseId(1)), StatusCode::NOT_FOUND),
      (Error::UnknownRecipient(5), StatusCode::NOT_FOUND),
      (
        Error::SessionConflict(phrasemate_core::model::UserId(1)),
        StatusCode::CONFLICT,
      ),
      (
        Error::Storage(Box::new(std::io::Error::other("disk"))),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
    ];

    for (error, status) in cases {
      let response = ApiError::from(error).into_response();
      assert_eq!(response.status(), status);
    }
  }
}
