//! Due-item selection: which phrase to present next within a session.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
  Error, Result,
  model::{Phrase, Session},
  store::{DueQuery, Repository},
};

/// Pick the next phrase for `session`'s user.
///
/// Overdue reviews come first, ordered by due date and then by lowest ease
/// factor. Reviews whose phrase has since been mastered (or vanished) are
/// skipped by walking the due list page by page, so a long run of mastered
/// phrases costs iterations, never stack. With nothing due, the oldest
/// never-reviewed phrase is offered. `None` means the session has nothing left.
pub async fn next_phrase_to_review<S: Repository>(
  store: &S,
  session: &Session,
  now: DateTime<Utc>,
  batch: usize,
) -> Result<Option<Phrase>> {
  let batch = batch.max(1);
  let mut offset = 0;

  loop {
    let page = store
      .due_reviews(DueQuery { user_id: session.user_id, now, limit: batch, offset })
      .await
      .map_err(Error::storage)?;

    for review in &page {
      match store.get_phrase(review.phrase_id).await.map_err(Error::storage)? {
        Some(phrase) if !phrase.mastered => return Ok(Some(phrase)),
        Some(_) => {
          debug!(phrase_id = %review.phrase_id, "skipping mastered phrase");
        }
        None => {
          debug!(phrase_id = %review.phrase_id, "skipping review of missing phrase");
        }
      }
    }

    if page.len() < batch {
      break;
    }
    offset += page.len();
  }

  let fresh = store
    .unreviewed_phrases(session.user_id, batch)
    .await
    .map_err(Error::storage)?;

  Ok(fresh.into_iter().find(|p| !p.mastered))
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;
  use crate::{
    memory::MemoryStore,
    model::{PhraseId, Review, SessionId, UserId},
    quality::RecallQuality,
  };

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
  }

  fn review_for(
    user: UserId,
    phrase: PhraseId,
    next: DateTime<Utc>,
    ease: f64,
  ) -> Review {
    Review {
      user_id:        user,
      phrase_id:      phrase,
      session_id:     SessionId(0),
      recall_quality: RecallQuality::Remembered,
      ease_factor:    ease,
      interval_days:  1,
      reviewed_at:    next - Duration::days(1),
      next_review_at: next,
    }
  }

  async fn session_for(store: &MemoryStore, user: UserId) -> Session {
    store.start_session(user, now()).await.unwrap().unwrap()
  }

  #[tokio::test]
  async fn prefers_lower_ease_on_equal_due_date() {
    let store = MemoryStore::default();
    let user = store.user(1).await;
    let easy = store.phrase(user, 10, "easy #t").await;
    let hard = store.phrase(user, 11, "hard #t").await;
    let due = now() - Duration::days(1);
    store.seed_review(review_for(user, easy.phrase_id, due, 2.7));
    store.seed_review(review_for(user, hard.phrase_id, due, 1.5));

    let session = session_for(&store, user).await;
    let next = next_phrase_to_review(&store, &session, now(), 20)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(next.phrase_id, hard.phrase_id);
  }

  #[tokio::test]
  async fn prefers_earliest_due_date() {
    let store = MemoryStore::default();
    let user = store.user(1).await;
    let recent = store.phrase(user, 10, "recent #t").await;
    let old = store.phrase(user, 11, "old #t").await;
    store.seed_review(review_for(user, recent.phrase_id, now() - Duration::days(1), 1.3));
    store.seed_review(review_for(user, old.phrase_id, now() - Duration::days(5), 2.9));

    let session = session_for(&store, user).await;
    let next = next_phrase_to_review(&store, &session, now(), 20)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(next.phrase_id, old.phrase_id);
  }

  #[tokio::test]
  async fn due_reviews_beat_new_phrases() {
    let store = MemoryStore::default();
    let user = store.user(1).await;
    let _fresh = store.phrase(user, 10, "fresh #t").await;
    let due = store.phrase(user, 11, "due #t").await;
    store.seed_review(review_for(user, due.phrase_id, now(), 2.5));

    let session = session_for(&store, user).await;
    let next = next_phrase_to_review(&store, &session, now(), 20)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(next.phrase_id, due.phrase_id);
  }

  #[tokio::test]
  async fn falls_back_to_lowest_id_new_phrase() {
    let store = MemoryStore::default();
    let user = store.user(1).await;
    let first = store.phrase(user, 10, "first #t").await;
    let _second = store.phrase(user, 11, "second #t").await;
    let later = store.phrase(user, 12, "later #t").await;
    store.seed_review(review_for(user, later.phrase_id, now() + Duration::days(3), 2.5));

    let session = session_for(&store, user).await;
    let next = next_phrase_to_review(&store, &session, now(), 20)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(next.phrase_id, first.phrase_id);
  }

  #[tokio::test]
  async fn skips_many_mastered_due_phrases_across_pages() {
    let store = MemoryStore::default();
    let user = store.user(1).await;
    for i in 0..7 {
      let p = store.phrase(user, 100 + i, "gone #t").await;
      store.seed_review(review_for(user, p.phrase_id, now() - Duration::days(30), 1.3));
      store.seed_mastered(p.phrase_id);
    }
    let live = store.phrase(user, 200, "live #t").await;
    store.seed_review(review_for(user, live.phrase_id, now() - Duration::days(1), 2.5));

    let session = session_for(&store, user).await;
    let next = next_phrase_to_review(&store, &session, now(), 2)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(next.phrase_id, live.phrase_id);
  }

  #[tokio::test]
  async fn none_when_nothing_due_or_new() {
    let store = MemoryStore::default();
    let user = store.user(1).await;
    let p = store.phrase(user, 10, "later #t").await;
    store.seed_review(review_for(user, p.phrase_id, now() + Duration::days(1), 2.5));
    let other = store.user(2).await;
    store.phrase(other, 11, "not mine #t").await;

    let session = session_for(&store, user).await;
    let next = next_phrase_to_review(&store, &session, now(), 20).await.unwrap();
    assert!(next.is_none());
  }
}
