//! The `Repository` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `phrasemate-store-sqlite`). The scheduling components depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::model::{
  NewPhrase, NewUser, Phrase, PhraseId, Review, ReviewHistory, Session,
  SessionId, Tag, User, UserId,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`Repository::due_reviews`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueQuery {
  pub user_id: UserId,
  /// Reviews with `next_review_at <= now` are due.
  pub now:     DateTime<Utc>,
  pub limit:   usize,
  pub offset:  usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a phrasemate storage backend.
///
/// Review state, review history and the mastery flag have a single write path,
/// [`Repository::record_review`], which must be atomic.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait Repository: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look a user up by their external chat identity.
  fn find_user_by_chat_id(
    &self,
    chat_id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  // ── Phrases ───────────────────────────────────────────────────────────

  /// Persist a phrase, creating any missing tags and linking them, in one
  /// transaction.
  fn create_phrase(
    &self,
    input: NewPhrase,
  ) -> impl Future<Output = Result<Phrase, Self::Error>> + Send + '_;

  fn get_phrase(
    &self,
    id: PhraseId,
  ) -> impl Future<Output = Result<Option<Phrase>, Self::Error>> + Send + '_;

  /// Idempotency check for ingestion: the phrase created from `message_id`.
  fn find_phrase_by_message(
    &self,
    user_id: UserId,
    message_id: i64,
  ) -> impl Future<Output = Result<Option<Phrase>, Self::Error>> + Send + '_;

  /// Non-mastered phrases of `user_id` with no review yet, lowest id first.
  fn unreviewed_phrases(
    &self,
    user_id: UserId,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Phrase>, Self::Error>> + Send + '_;

  fn tags_for_phrase(
    &self,
    phrase_id: PhraseId,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// The current review for (user, phrase), if any attempt was ever accepted.
  fn get_review(
    &self,
    user_id: UserId,
    phrase_id: PhraseId,
  ) -> impl Future<Output = Result<Option<Review>, Self::Error>> + Send + '_;

  /// Due reviews ordered by `(next_review_at ASC, ease_factor ASC)`.
  fn due_reviews(
    &self,
    query: DueQuery,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;

  /// Number of distinct phrases reviewed within `session_id`.
  fn count_reviewed_in_session(
    &self,
    session_id: SessionId,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  /// Upsert `review`, append its history snapshot and, when `mark_mastered`
  /// is set, flag the phrase as mastered. All or nothing.
  fn record_review(
    &self,
    review: Review,
    mark_mastered: bool,
  ) -> impl Future<Output = Result<ReviewHistory, Self::Error>> + Send + '_;

  /// Review history for (user, phrase), most recent first.
  fn review_history(
    &self,
    user_id: UserId,
    phrase_id: PhraseId,
  ) -> impl Future<Output = Result<Vec<ReviewHistory>, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Open a session. Returns `None` when the user already has an active one
  /// (the storage-level uniqueness constraint rejected the insert).
  fn start_session(
    &self,
    user_id: UserId,
    started_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// Set `ended_at` on an active session. Returns `false` when the session
  /// was already closed or does not exist.
  fn close_session(
    &self,
    session_id: SessionId,
    ended_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_session(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  fn active_session(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;
}
