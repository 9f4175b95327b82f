//! Error types for `phrasemate-core`.

use thiserror::Error;

use crate::model::{PhraseId, SessionId, UserId};

#[derive(Debug, Error)]
pub enum Error {
  /// Recall quality outside `1..=5`. Raised before any read or write.
  #[error("invalid recall quality: {0}")]
  InvalidQuality(u8),

  #[error("user not found: {0}")]
  UserNotFound(UserId),

  #[error("no user registered for chat {0}")]
  UnknownRecipient(i64),

  #[error("phrase not found: {0}")]
  PhraseNotFound(PhraseId),

  #[error("session not found: {0}")]
  SessionNotFound(SessionId),

  /// The active-session uniqueness constraint kept rejecting inserts and no
  /// active session could be re-fetched either.
  #[error("could not start or find an active session for user {0}")]
  SessionConflict(UserId),

  #[error("invalid callback token: {0:?}")]
  InvalidCallbackToken(String),

  #[error("delivery error: {0}")]
  Delivery(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a repository error. Used as `.map_err(Error::storage)`.
  pub fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(e))
  }

  pub fn delivery<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Delivery(Box::new(e))
  }

  /// True for the "referenced entity is absent" family.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::UserNotFound(_)
        | Self::UnknownRecipient(_)
        | Self::PhraseNotFound(_)
        | Self::SessionNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
