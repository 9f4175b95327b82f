//! Encoding and decoding helpers between Rust domain types and the plain
//! values stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC with
//! microsecond precision, so lexicographic order in SQL is chronological
//! order. Booleans are stored as `0`/`1` integers.

use chrono::{DateTime, SecondsFormat, Utc};
use phrasemate_core::{
  RecallQuality,
  model::{
    HistoryId, Phrase, PhraseId, Review, ReviewHistory, Session, SessionId,
    Tag, TagId, User, UserId,
  },
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn decode_quality(value: i64) -> Result<RecallQuality> {
  let byte = u8::try_from(value).map_err(|_| Error::InvalidValue {
    column: "recall_quality",
    value:  value.to_string(),
  })?;
  Ok(RecallQuality::try_from(byte)?)
}

pub fn decode_interval(value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| Error::InvalidValue {
    column: "interval_days",
    value:  value.to_string(),
  })
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, chat_id, first_name, last_name, \
                                username, language_code, is_bot, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:       i64,
  pub chat_id:       i64,
  pub first_name:    String,
  pub last_name:     String,
  pub username:      String,
  pub language_code: String,
  pub is_bot:        bool,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      chat_id:       row.get(1)?,
      first_name:    row.get(2)?,
      last_name:     row.get(3)?,
      username:      row.get(4)?,
      language_code: row.get(5)?,
      is_bot:        row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       UserId(self.user_id),
      chat_id:       self.chat_id,
      first_name:    self.first_name,
      last_name:     self.last_name,
      username:      self.username,
      language_code: self.language_code,
      is_bot:        self.is_bot,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

// ─── Phrases ─────────────────────────────────────────────────────────────────

pub const PHRASE_COLUMNS: &str =
  "phrase_id, user_id, message_id, text, mastered, created_at";

/// Raw values read directly from a `phrases` row.
pub struct RawPhrase {
  pub phrase_id:  i64,
  pub user_id:    i64,
  pub message_id: i64,
  pub text:       String,
  pub mastered:   bool,
  pub created_at: String,
}

impl RawPhrase {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      phrase_id:  row.get(0)?,
      user_id:    row.get(1)?,
      message_id: row.get(2)?,
      text:       row.get(3)?,
      mastered:   row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_phrase(self) -> Result<Phrase> {
    Ok(Phrase {
      phrase_id:  PhraseId(self.phrase_id),
      user_id:    UserId(self.user_id),
      message_id: self.message_id,
      text:       self.text,
      mastered:   self.mastered,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub fn tag_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
  Ok(Tag { tag_id: TagId(row.get(0)?), name: row.get(1)? })
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

/// Shared by `reviews` and `review_history`.
pub const REVIEW_COLUMNS: &str = "user_id, phrase_id, session_id, \
                                  recall_quality, ease_factor, interval_days, \
                                  reviewed_at, next_review_at";

/// Raw values read from the review columns of a `reviews` or
/// `review_history` row, starting at `offset`.
pub struct RawReview {
  pub user_id:        i64,
  pub phrase_id:      i64,
  pub session_id:     i64,
  pub recall_quality: i64,
  pub ease_factor:    f64,
  pub interval_days:  i64,
  pub reviewed_at:    String,
  pub next_review_at: String,
}

impl RawReview {
  pub fn from_row(
    row: &rusqlite::Row<'_>,
    offset: usize,
  ) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:        row.get(offset)?,
      phrase_id:      row.get(offset + 1)?,
      session_id:     row.get(offset + 2)?,
      recall_quality: row.get(offset + 3)?,
      ease_factor:    row.get(offset + 4)?,
      interval_days:  row.get(offset + 5)?,
      reviewed_at:    row.get(offset + 6)?,
      next_review_at: row.get(offset + 7)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      user_id:        UserId(self.user_id),
      phrase_id:      PhraseId(self.phrase_id),
      session_id:     SessionId(self.session_id),
      recall_quality: decode_quality(self.recall_quality)?,
      ease_factor:    self.ease_factor,
      interval_days:  decode_interval(self.interval_days)?,
      reviewed_at:    decode_dt(&self.reviewed_at)?,
      next_review_at: decode_dt(&self.next_review_at)?,
    })
  }
}

/// Raw values read from a `review_history` row: the id, then the review
/// columns.
pub struct RawHistory {
  pub history_id: i64,
  pub review:     RawReview,
}

impl RawHistory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id: row.get(0)?,
      review:     RawReview::from_row(row, 1)?,
    })
  }

  pub fn into_history(self) -> Result<ReviewHistory> {
    Ok(ReviewHistory {
      history_id: HistoryId(self.history_id),
      review:     self.review.into_review()?,
    })
  }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

pub const SESSION_COLUMNS: &str = "session_id, user_id, started_at, ended_at";

/// Raw values read directly from a `sessions` row.
pub struct RawSession {
  pub session_id: i64,
  pub user_id:    i64,
  pub started_at: String,
  pub ended_at:   Option<String>,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id: row.get(0)?,
      user_id:    row.get(1)?,
      started_at: row.get(2)?,
      ended_at:   row.get(3)?,
    })
  }

  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      session_id: SessionId(self.session_id),
      user_id:    UserId(self.user_id),
      started_at: decode_dt(&self.started_at)?,
      ended_at:   self.ended_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
