//! [`ReviewEngine`]: the façade tying the repository, the scheduler, the
//! due-item selector and the session manager together.
//!
//! Every entry point takes `now` explicitly; callers pass `Utc::now()`.

use chrono::{DateTime, SubsecRound as _, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  Error, Result, SchedulingConfig,
  delivery::{ChoiceMade, Delivery, Presentation},
  model::{
    Phrase, PhraseId, Review, ReviewHistory, Session, SessionId, User, UserId,
  },
  quality::RecallQuality,
  scheduler, selector,
  session::SessionManager,
  store::Repository,
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of one review attempt. Only `Recorded` changed any state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReviewOutcome {
  Recorded {
    review:         Review,
    history:        ReviewHistory,
    /// This attempt retired the phrase.
    mastered:       bool,
    /// This attempt filled the session and closed it.
    session_closed: bool,
  },
  /// The phrase is not due yet; nothing to do.
  NotDueYet { next_review_at: DateTime<Utc> },
  /// The phrase is mastered and no longer accepts reviews.
  AlreadyMastered,
}

/// Counts from one [`ReviewEngine::dispatch_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
  pub presented: usize,
  /// Users with nothing to review.
  pub idle:      usize,
  pub failed:    usize,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct ReviewEngine<S> {
  store:  S,
  config: SchedulingConfig,
}

impl<S: Repository> ReviewEngine<S> {
  pub fn new(store: S, config: SchedulingConfig) -> Self {
    Self { store, config }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &SchedulingConfig { &self.config }

  fn sessions(&self) -> SessionManager<'_, S> {
    SessionManager::new(&self.store, &self.config)
  }

  // ── Review path ───────────────────────────────────────────────────────

  /// Record an attempt at `phrase_id` by `user_id` within `session_id`.
  ///
  /// The quality is validated before anything is read. The phrase and the
  /// session must both belong to the user. On acceptance the review, its
  /// history snapshot and (if reached) the mastery flag are written in one
  /// transaction, after which the session is closed if it is full. `now` is
  /// truncated to microseconds so the returned review equals the stored one.
  pub async fn review_phrase(
    &self,
    phrase_id: PhraseId,
    user_id: UserId,
    session_id: SessionId,
    quality: u8,
    now: DateTime<Utc>,
  ) -> Result<ReviewOutcome> {
    let quality = RecallQuality::try_from(quality)?;
    // Stored timestamps keep microseconds.
    let now = now.trunc_subsecs(6);

    let phrase = self
      .store
      .get_phrase(phrase_id)
      .await
      .map_err(Error::storage)?
      .filter(|p| p.user_id == user_id)
      .ok_or(Error::PhraseNotFound(phrase_id))?;
    self
      .store
      .get_session(session_id)
      .await
      .map_err(Error::storage)?
      .filter(|s| s.user_id == user_id)
      .ok_or(Error::SessionNotFound(session_id))?;

    if phrase.mastered {
      debug!(%phrase_id, "review of mastered phrase ignored");
      return Ok(ReviewOutcome::AlreadyMastered);
    }

    let previous = self
      .store
      .get_review(user_id, phrase_id)
      .await
      .map_err(Error::storage)?;
    if let Some(previous) = previous.as_ref().filter(|r| !r.is_due(now)) {
      debug!(%phrase_id, next_review_at = %previous.next_review_at, "review not due yet");
      return Ok(ReviewOutcome::NotDueYet {
        next_review_at: previous.next_review_at,
      });
    }

    let schedule = scheduler::schedule(
      previous.as_ref(),
      quality,
      now,
      self.config.max_interval_days,
    );
    let review = Review {
      user_id,
      phrase_id,
      session_id,
      recall_quality: quality,
      ease_factor: schedule.ease_factor,
      interval_days: schedule.interval_days,
      reviewed_at: schedule.reviewed_at,
      next_review_at: schedule.next_review_at,
    };

    let history = self
      .store
      .record_review(review.clone(), schedule.mastered)
      .await
      .map_err(Error::storage)?;

    info!(
      %user_id,
      %phrase_id,
      %session_id,
      quality = quality.ordinal(),
      ease_factor = review.ease_factor,
      interval_days = review.interval_days,
      "review recorded"
    );
    if schedule.mastered {
      info!(%user_id, %phrase_id, "phrase mastered");
    }

    // The review is committed; a failed close is retried by the next review.
    let session_closed = match self.sessions().close_if_full(session_id, now).await {
      Ok(closed) => closed,
      Err(e) => {
        warn!(%session_id, error = %e, "could not close full session");
        false
      }
    };

    Ok(ReviewOutcome::Recorded {
      review,
      history,
      mastered: schedule.mastered,
      session_closed,
    })
  }

  /// Inbound choice event: resolve the learner by chat identity and review.
  pub async fn handle_choice(
    &self,
    choice: ChoiceMade,
    now: DateTime<Utc>,
  ) -> Result<ReviewOutcome> {
    RecallQuality::try_from(choice.quality)?;
    let user = self
      .store
      .find_user_by_chat_id(choice.recipient)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::UnknownRecipient(choice.recipient))?;

    self
      .review_phrase(
        choice.phrase_id,
        user.user_id,
        choice.session_id,
        choice.quality,
        now,
      )
      .await
  }

  // ── Presentation path ─────────────────────────────────────────────────

  pub async fn get_or_start_session(
    &self,
    user_id: UserId,
    now: DateTime<Utc>,
  ) -> Result<Session> {
    self.sessions().get_or_start_session(user_id, now).await
  }

  pub async fn next_phrase_to_review(
    &self,
    session: &Session,
    now: DateTime<Utc>,
  ) -> Result<Option<Phrase>> {
    selector::next_phrase_to_review(
      &self.store,
      session,
      now,
      self.config.selection_batch,
    )
    .await
  }

  /// Scheduled trigger for one user: the next phrase to show, if any.
  ///
  /// When nothing is left the session is closed right away.
  pub async fn present_next(
    &self,
    user: &User,
    now: DateTime<Utc>,
  ) -> Result<Option<Presentation>> {
    let session = self.get_or_start_session(user.user_id, now).await?;

    match self.next_phrase_to_review(&session, now).await? {
      Some(phrase) => Ok(Some(Presentation::new(
        user.chat_id,
        session.session_id,
        &phrase,
      ))),
      None => {
        debug!(user_id = %user.user_id, "nothing to review");
        self.sessions().close_session(session.session_id, now).await?;
        Ok(None)
      }
    }
  }

  /// Present the next phrase to every user through `delivery`.
  ///
  /// A failure for one user is logged and counted; the pass continues.
  pub async fn dispatch_all<D: Delivery>(
    &self,
    delivery: &D,
    now: DateTime<Utc>,
  ) -> Result<DispatchSummary> {
    let users = self.store.list_users().await.map_err(Error::storage)?;
    let mut summary = DispatchSummary::default();

    for user in &users {
      let presented = match self.present_next(user, now).await {
        Ok(Some(presentation)) => delivery
          .present(&presentation)
          .await
          .map(|()| true)
          .map_err(Error::delivery),
        Ok(None) => Ok(false),
        Err(e) => Err(e),
      };

      match presented {
        Ok(true) => summary.presented += 1,
        Ok(false) => summary.idle += 1,
        Err(e) => {
          warn!(user_id = %user.user_id, error = %e, "dispatch failed");
          summary.failed += 1;
        }
      }
    }

    info!(
      presented = summary.presented,
      idle = summary.idle,
      failed = summary.failed,
      "dispatch finished"
    );
    Ok(summary)
  }

  // ── Queries ───────────────────────────────────────────────────────────

  pub async fn list_users(&self) -> Result<Vec<User>> {
    self.store.list_users().await.map_err(Error::storage)
  }

  pub async fn user(&self, user_id: UserId) -> Result<User> {
    self
      .store
      .get_user(user_id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::UserNotFound(user_id))
  }

  pub async fn current_review(
    &self,
    user_id: UserId,
    phrase_id: PhraseId,
  ) -> Result<Option<Review>> {
    self
      .store
      .get_review(user_id, phrase_id)
      .await
      .map_err(Error::storage)
  }

  /// Review history for (user, phrase), most recent first.
  pub async fn review_history(
    &self,
    user_id: UserId,
    phrase_id: PhraseId,
  ) -> Result<Vec<ReviewHistory>> {
    self
      .store
      .review_history(user_id, phrase_id)
      .await
      .map_err(Error::storage)
  }
}
