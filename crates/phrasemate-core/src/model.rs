//! Domain records: users, phrases, tags, reviews and sessions.
//!
//! Identities are store-assigned integers. Every timestamp is UTC.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quality::RecallQuality;

// ─── Identities ──────────────────────────────────────────────────────────────

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl FromStr for $name {
      type Err = std::num::ParseIntError;

      fn from_str(s: &str) -> Result<Self, Self::Err> { s.parse().map(Self) }
    }
  };
}

id_type!(UserId);
id_type!(PhraseId);
id_type!(TagId);
id_type!(SessionId);
id_type!(
  /// Identity of one append-only [`ReviewHistory`] row.
  HistoryId
);

// ─── Users ───────────────────────────────────────────────────────────────────

/// A learner, known by the identity of the chat they talk to us from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:       UserId,
  /// External chat identity; unique across users.
  pub chat_id:       i64,
  pub first_name:    String,
  pub last_name:     String,
  pub username:      String,
  pub language_code: String,
  pub is_bot:        bool,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::Repository::create_user`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
  pub chat_id:       i64,
  #[serde(default)]
  pub first_name:    String,
  #[serde(default)]
  pub last_name:     String,
  #[serde(default)]
  pub username:      String,
  #[serde(default)]
  pub language_code: String,
  #[serde(default)]
  pub is_bot:        bool,
}

// ─── Phrases and tags ────────────────────────────────────────────────────────

/// A short text the user wants to memorise.
///
/// The only mutation after creation is the one-way `mastered` flag, which is
/// written exclusively by the review path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
  pub phrase_id:  PhraseId,
  pub user_id:    UserId,
  /// Chat message the phrase was ingested from; unique per user.
  pub message_id: i64,
  pub text:       String,
  pub mastered:   bool,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::Repository::create_phrase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhrase {
  pub user_id:    UserId,
  pub message_id: i64,
  pub text:       String,
  /// Lower-cased tag names without the leading `#`.
  pub tags:       Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub tag_id: TagId,
  pub name:   String,
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

/// The current scheduling state for one (user, phrase) pair.
///
/// Upserted on every accepted attempt. `ease_factor >= 1.3`,
/// `interval_days >= 1`, and `next_review_at` is a midnight no earlier than
/// the day of `reviewed_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
  pub user_id:        UserId,
  pub phrase_id:      PhraseId,
  /// Session in which the most recent attempt happened.
  pub session_id:     SessionId,
  pub recall_quality: RecallQuality,
  pub ease_factor:    f64,
  pub interval_days:  u32,
  pub reviewed_at:    DateTime<Utc>,
  pub next_review_at: DateTime<Utc>,
}

impl Review {
  /// A review is due once its `next_review_at` is not in the future.
  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.next_review_at <= now
  }
}

/// Immutable snapshot of a [`Review`] at the moment it was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewHistory {
  pub history_id: HistoryId,
  #[serde(flatten)]
  pub review:     Review,
}

// ─── Sessions ────────────────────────────────────────────────────────────────

/// A bounded review sitting. Active while `ended_at` is `None`; at most one
/// active session exists per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub session_id: SessionId,
  pub user_id:    UserId,
  pub started_at: DateTime<Utc>,
  pub ended_at:   Option<DateTime<Utc>>,
}

impl Session {
  pub fn is_active(&self) -> bool { self.ended_at.is_none() }
}
