//! Session lifecycle: bounded review sittings, one active per user.
//!
//! ```text
//! NoActiveSession --start--> ActiveSession --quota reached / nothing left--> closed
//! ```
//!
//! Closing is idempotent. Two triggers racing to open a session for the same
//! idle user are resolved by the store's uniqueness constraint; the loser
//! re-fetches the winner's session.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
  Error, Result, SchedulingConfig,
  model::{Session, SessionId, UserId},
  selector,
  store::Repository,
};

/// Insert/re-fetch rounds before giving up with [`Error::SessionConflict`].
const START_ATTEMPTS: usize = 3;

pub struct SessionManager<'a, S> {
  store:  &'a S,
  config: &'a SchedulingConfig,
}

impl<'a, S: Repository> SessionManager<'a, S> {
  pub fn new(store: &'a S, config: &'a SchedulingConfig) -> Self {
    Self { store, config }
  }

  /// Return the user's active session if it still has something to present;
  /// otherwise close it (when present) and open a fresh one.
  pub async fn get_or_start_session(
    &self,
    user_id: UserId,
    now: DateTime<Utc>,
  ) -> Result<Session> {
    let active = self
      .store
      .active_session(user_id)
      .await
      .map_err(Error::storage)?;

    if let Some(active) = active {
      let candidate = selector::next_phrase_to_review(
        self.store,
        &active,
        now,
        self.config.selection_batch,
      )
      .await?;
      if candidate.is_some() {
        return Ok(active);
      }
      debug!(session_id = %active.session_id, "active session exhausted");
      self.close_session(active.session_id, now).await?;
    }

    self.start_session(user_id, now).await
  }

  /// Set `ended_at` on the session. Closing a closed session is a no-op that
  /// returns `false`.
  pub async fn close_session(
    &self,
    session_id: SessionId,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    let closed = self
      .store
      .close_session(session_id, now)
      .await
      .map_err(Error::storage)?;
    if closed {
      info!(%session_id, "session closed");
    }
    Ok(closed)
  }

  /// Review-path trigger: close the session once it holds `session_size`
  /// reviewed phrases, even if more are due.
  pub async fn close_if_full(
    &self,
    session_id: SessionId,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    let reviewed = self
      .store
      .count_reviewed_in_session(session_id)
      .await
      .map_err(Error::storage)?;
    if reviewed < self.config.session_size {
      return Ok(false);
    }
    self.close_session(session_id, now).await
  }

  async fn start_session(
    &self,
    user_id: UserId,
    now: DateTime<Utc>,
  ) -> Result<Session> {
    for _ in 0..START_ATTEMPTS {
      if let Some(session) = self
        .store
        .start_session(user_id, now)
        .await
        .map_err(Error::storage)?
      {
        info!(%user_id, session_id = %session.session_id, "session started");
        return Ok(session);
      }

      // Lost the race; use whichever session won.
      if let Some(session) = self
        .store
        .active_session(user_id)
        .await
        .map_err(Error::storage)?
      {
        debug!(%user_id, session_id = %session.session_id, "session already active");
        return Ok(session);
      }
    }
    Err(Error::SessionConflict(user_id))
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;
  use crate::memory::MemoryStore;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
  }

  #[tokio::test]
  async fn opens_a_session_when_none_is_active() {
    let store = MemoryStore::default();
    let config = SchedulingConfig::default();
    let user = store.user(1).await;

    let session = SessionManager::new(&store, &config)
      .get_or_start_session(user, now())
      .await
      .unwrap();
    assert!(session.is_active());
    assert_eq!(session.user_id, user);
    assert_eq!(session.started_at, now());
  }

  #[tokio::test]
  async fn keeps_an_active_session_with_work_left() {
    let store = MemoryStore::default();
    let config = SchedulingConfig::default();
    let user = store.user(1).await;
    store.phrase(user, 1, "hola #es").await;
    let manager = SessionManager::new(&store, &config);

    let first = manager.get_or_start_session(user, now()).await.unwrap();
    let again = manager
      .get_or_start_session(user, now() + Duration::minutes(5))
      .await
      .unwrap();
    assert_eq!(first.session_id, again.session_id);
  }

  #[tokio::test]
  async fn replaces_an_exhausted_session() {
    let store = MemoryStore::default();
    let config = SchedulingConfig::default();
    let user = store.user(1).await;
    let manager = SessionManager::new(&store, &config);

    let first = manager.get_or_start_session(user, now()).await.unwrap();
    let second = manager
      .get_or_start_session(user, now() + Duration::minutes(5))
      .await
      .unwrap();
    assert_ne!(first.session_id, second.session_id);

    let closed = store.get_session(first.session_id).await.unwrap().unwrap();
    assert_eq!(closed.ended_at, Some(now() + Duration::minutes(5)));
  }

  #[tokio::test]
  async fn closing_is_idempotent() {
    let store = MemoryStore::default();
    let config = SchedulingConfig::default();
    let user = store.user(1).await;
    let manager = SessionManager::new(&store, &config);
    let session = manager.get_or_start_session(user, now()).await.unwrap();

    assert!(manager.close_session(session.session_id, now()).await.unwrap());
    assert!(
      !manager
        .close_session(session.session_id, now() + Duration::hours(1))
        .await
        .unwrap()
    );
    let stored = store.get_session(session.session_id).await.unwrap().unwrap();
    assert_eq!(stored.ended_at, Some(now()));
  }

  #[tokio::test]
  async fn race_loser_adopts_the_winning_session() {
    let store = MemoryStore::default();
    let config = SchedulingConfig::default();
    let user = store.user(1).await;
    let winner = store.start_session(user, now()).await.unwrap().unwrap();
    store.hide_active_sessions_once();

    let session = SessionManager::new(&store, &config)
      .get_or_start_session(user, now())
      .await
      .unwrap();
    assert_eq!(session.session_id, winner.session_id);
  }
}
