//! In-memory [`Repository`] used by this crate's tests.

use std::sync::{
  Mutex, MutexGuard,
  atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
  model::{
    HistoryId, NewPhrase, NewUser, Phrase, PhraseId, Review, ReviewHistory,
    Session, SessionId, Tag, TagId, User, UserId,
  },
  store::{DueQuery, Repository},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("unique constraint violated: {0}")]
  Unique(&'static str),
  #[error("injected failure: {0}")]
  Injected(&'static str),
}

#[derive(Default)]
struct State {
  users:       Vec<User>,
  phrases:     Vec<Phrase>,
  tags:        Vec<Tag>,
  phrase_tags: Vec<(PhraseId, TagId)>,
  reviews:     Vec<Review>,
  history:     Vec<ReviewHistory>,
  sessions:    Vec<Session>,
  next_id:     i64,
}

impl State {
  fn next_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }
}

#[derive(Default)]
pub struct MemoryStore {
  state:            Mutex<State>,
  hide_active_once: AtomicBool,
  fail_count_once:  AtomicBool,
}

impl MemoryStore {
  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().expect("memory store poisoned")
  }

  // ── Test helpers ──────────────────────────────────────────────────────

  pub async fn user(&self, chat_id: i64) -> UserId {
    self
      .create_user(NewUser { chat_id, ..Default::default() })
      .await
      .unwrap()
      .user_id
  }

  pub async fn phrase(&self, user_id: UserId, message_id: i64, text: &str) -> Phrase {
    self
      .create_phrase(NewPhrase {
        user_id,
        message_id,
        text: text.into(),
        tags: crate::ingest::extract_hashtags(text),
      })
      .await
      .unwrap()
  }

  pub fn seed_review(&self, review: Review) {
    let mut state = self.lock();
    state
      .reviews
      .retain(|r| (r.user_id, r.phrase_id) != (review.user_id, review.phrase_id));
    state.reviews.push(review);
  }

  pub fn seed_mastered(&self, phrase_id: PhraseId) {
    let mut state = self.lock();
    if let Some(p) = state.phrases.iter_mut().find(|p| p.phrase_id == phrase_id) {
      p.mastered = true;
    }
  }

  /// Make the next `active_session` call miss, as if another trigger opened
  /// the session right after we looked.
  pub fn hide_active_sessions_once(&self) {
    self.hide_active_once.store(true, Ordering::SeqCst);
  }

  /// Make the next `count_reviewed_in_session` call fail.
  pub fn fail_session_count_once(&self) {
    self.fail_count_once.store(true, Ordering::SeqCst);
  }
}

impl Repository for MemoryStore {
  type Error = MemoryError;

  async fn create_user(&self, input: NewUser) -> Result<User, MemoryError> {
    let mut state = self.lock();
    if state.users.iter().any(|u| u.chat_id == input.chat_id) {
      return Err(MemoryError::Unique("users.chat_id"));
    }
    let user = User {
      user_id:       UserId(state.next_id()),
      chat_id:       input.chat_id,
      first_name:    input.first_name,
      last_name:     input.last_name,
      username:      input.username,
      language_code: input.language_code,
      is_bot:        input.is_bot,
      created_at:    Utc::now(),
    };
    state.users.push(user.clone());
    Ok(user)
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>, MemoryError> {
    Ok(self.lock().users.iter().find(|u| u.user_id == id).cloned())
  }

  async fn find_user_by_chat_id(&self, chat_id: i64) -> Result<Option<User>, MemoryError> {
    Ok(self.lock().users.iter().find(|u| u.chat_id == chat_id).cloned())
  }

  async fn list_users(&self) -> Result<Vec<User>, MemoryError> {
    Ok(self.lock().users.clone())
  }

  async fn create_phrase(&self, input: NewPhrase) -> Result<Phrase, MemoryError> {
    let mut state = self.lock();
    if state
      .phrases
      .iter()
      .any(|p| p.user_id == input.user_id && p.message_id == input.message_id)
    {
      return Err(MemoryError::Unique("phrases.message_id"));
    }
    let phrase = Phrase {
      phrase_id:  PhraseId(state.next_id()),
      user_id:    input.user_id,
      message_id: input.message_id,
      text:       input.text,
      mastered:   false,
      created_at: Utc::now(),
    };
    for name in input.tags {
      let existing = state.tags.iter().find(|t| t.name == name).map(|t| t.tag_id);
      let tag_id = match existing {
        Some(id) => id,
        None => {
          let tag = Tag { tag_id: TagId(state.next_id()), name };
          let id = tag.tag_id;
          state.tags.push(tag);
          id
        }
      };
      state.phrase_tags.push((phrase.phrase_id, tag_id));
    }
    state.phrases.push(phrase.clone());
    Ok(phrase)
  }

  async fn get_phrase(&self, id: PhraseId) -> Result<Option<Phrase>, MemoryError> {
    Ok(self.lock().phrases.iter().find(|p| p.phrase_id == id).cloned())
  }

  async fn find_phrase_by_message(
    &self,
    user_id: UserId,
    message_id: i64,
  ) -> Result<Option<Phrase>, MemoryError> {
    Ok(
      self
        .lock()
        .phrases
        .iter()
        .find(|p| p.user_id == user_id && p.message_id == message_id)
        .cloned(),
    )
  }

  async fn unreviewed_phrases(
    &self,
    user_id: UserId,
    limit: usize,
  ) -> Result<Vec<Phrase>, MemoryError> {
    let state = self.lock();
    let mut phrases: Vec<Phrase> = state
      .phrases
      .iter()
      .filter(|p| p.user_id == user_id && !p.mastered)
      .filter(|p| {
        !state
          .reviews
          .iter()
          .any(|r| r.user_id == user_id && r.phrase_id == p.phrase_id)
      })
      .cloned()
      .collect();
    phrases.sort_by_key(|p| p.phrase_id);
    phrases.truncate(limit);
    Ok(phrases)
  }

  async fn tags_for_phrase(&self, phrase_id: PhraseId) -> Result<Vec<Tag>, MemoryError> {
    let state = self.lock();
    Ok(
      state
        .phrase_tags
        .iter()
        .filter(|(p, _)| *p == phrase_id)
        .filter_map(|(_, t)| state.tags.iter().find(|tag| tag.tag_id == *t))
        .cloned()
        .collect(),
    )
  }

  async fn get_review(
    &self,
    user_id: UserId,
    phrase_id: PhraseId,
  ) -> Result<Option<Review>, MemoryError> {
    Ok(
      self
        .lock()
        .reviews
        .iter()
        .find(|r| r.user_id == user_id && r.phrase_id == phrase_id)
        .cloned(),
    )
  }

  async fn due_reviews(&self, query: DueQuery) -> Result<Vec<Review>, MemoryError> {
    let mut due: Vec<Review> = self
      .lock()
      .reviews
      .iter()
      .filter(|r| r.user_id == query.user_id && r.is_due(query.now))
      .cloned()
      .collect();
    due.sort_by(|a, b| {
      a.next_review_at
        .cmp(&b.next_review_at)
        .then(a.ease_factor.total_cmp(&b.ease_factor))
        .then(a.phrase_id.cmp(&b.phrase_id))
    });
    Ok(due.into_iter().skip(query.offset).take(query.limit).collect())
  }

  async fn count_reviewed_in_session(&self, session_id: SessionId) -> Result<u32, MemoryError> {
    if self.fail_count_once.swap(false, Ordering::SeqCst) {
      return Err(MemoryError::Injected("count_reviewed_in_session"));
    }
    let state = self.lock();
    let mut phrases: Vec<PhraseId> = state
      .history
      .iter()
      .filter(|h| h.review.session_id == session_id)
      .map(|h| h.review.phrase_id)
      .collect();
    phrases.sort();
    phrases.dedup();
    Ok(phrases.len() as u32)
  }

  async fn record_review(
    &self,
    review: Review,
    mark_mastered: bool,
  ) -> Result<ReviewHistory, MemoryError> {
    let mut state = self.lock();
    state
      .reviews
      .retain(|r| (r.user_id, r.phrase_id) != (review.user_id, review.phrase_id));
    state.reviews.push(review.clone());
    let history = ReviewHistory {
      history_id: HistoryId(state.next_id()),
      review:     review.clone(),
    };
    state.history.push(history.clone());
    if mark_mastered
      && let Some(p) = state.phrases.iter_mut().find(|p| p.phrase_id == review.phrase_id)
    {
      p.mastered = true;
    }
    Ok(history)
  }

  async fn review_history(
    &self,
    user_id: UserId,
    phrase_id: PhraseId,
  ) -> Result<Vec<ReviewHistory>, MemoryError> {
    let mut rows: Vec<ReviewHistory> = self
      .lock()
      .history
      .iter()
      .filter(|h| h.review.user_id == user_id && h.review.phrase_id == phrase_id)
      .cloned()
      .collect();
    rows.reverse();
    Ok(rows)
  }

  async fn start_session(
    &self,
    user_id: UserId,
    started_at: DateTime<Utc>,
  ) -> Result<Option<Session>, MemoryError> {
    let mut state = self.lock();
    if state.sessions.iter().any(|s| s.user_id == user_id && s.is_active()) {
      return Ok(None);
    }
    let session = Session {
      session_id: SessionId(state.next_id()),
      user_id,
      started_at,
      ended_at: None,
    };
    state.sessions.push(session.clone());
    Ok(Some(session))
  }

  async fn close_session(
    &self,
    session_id: SessionId,
    ended_at: DateTime<Utc>,
  ) -> Result<bool, MemoryError> {
    let mut state = self.lock();
    match state
      .sessions
      .iter_mut()
      .find(|s| s.session_id == session_id && s.is_active())
    {
      Some(session) => {
        session.ended_at = Some(ended_at);
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn get_session(&self, id: SessionId) -> Result<Option<Session>, MemoryError> {
    Ok(self.lock().sessions.iter().find(|s| s.session_id == id).cloned())
  }

  async fn active_session(&self, user_id: UserId) -> Result<Option<Session>, MemoryError> {
    if self.hide_active_once.swap(false, Ordering::SeqCst) {
      return Ok(None);
    }
    Ok(
      self
        .lock()
        .sessions
        .iter()
        .find(|s| s.user_id == user_id && s.is_active())
        .cloned(),
    )
  }
}
