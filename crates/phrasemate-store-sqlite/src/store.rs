//! [`SqliteStore`]: the SQLite implementation of [`Repository`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use phrasemate_core::{
  model::{
    HistoryId, NewPhrase, NewUser, Phrase, PhraseId, Review, ReviewHistory,
    Session, SessionId, Tag, User, UserId,
  },
  store::{DueQuery, Repository},
};

use crate::{
  Error, Result,
  encode::{
    PHRASE_COLUMNS, RawHistory, RawPhrase, RawReview, RawSession, RawUser,
    REVIEW_COLUMNS, SESSION_COLUMNS, USER_COLUMNS, encode_dt, tag_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A phrasemate repository backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The schema version recorded in `PRAGMA user_version`.
  pub async fn schema_version(&self) -> Result<i64> {
    let version = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?)
      })
      .await?;
    Ok(version)
  }

  /// Direct access to the connection for fault-injection in tests.
  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn query_phrase(
    &self,
    sql: String,
    params: Vec<i64>,
  ) -> Result<Option<Phrase>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params_from_iter(params),
              RawPhrase::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawPhrase::into_phrase).transpose()
  }

  async fn query_session(
    &self,
    sql: String,
    id: i64,
  ) -> Result<Option<Session>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawSession::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSession::into_session).transpose()
  }

  async fn query_user(&self, sql: String, id: i64) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }
}

/// `true` when `err` is a UNIQUE (or PRIMARY KEY) constraint violation.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

// ─── Repository impl ─────────────────────────────────────────────────────────

impl Repository for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let created_at = Utc::now();
    let created_str = encode_dt(created_at);
    let row = input.clone();

    let user_id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users
             (chat_id, first_name, last_name, username, language_code,
              is_bot, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            row.chat_id,
            row.first_name,
            row.last_name,
            row.username,
            row.language_code,
            row.is_bot,
            created_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::debug!(user_id, chat_id = input.chat_id, "created user");

    Ok(User {
      user_id: UserId(user_id),
      chat_id: input.chat_id,
      first_name: input.first_name,
      last_name: input.last_name,
      username: input.username,
      language_code: input.language_code,
      is_bot: input.is_bot,
      created_at,
    })
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1");
    self.query_user(sql, id.0).await
  }

  async fn find_user_by_chat_id(&self, chat_id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE chat_id = ?1");
    self.query_user(sql, chat_id).await
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users ORDER BY user_id"
        ))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  // ── Phrases ───────────────────────────────────────────────────────────

  async fn create_phrase(&self, input: NewPhrase) -> Result<Phrase> {
    let created_at = Utc::now();
    let created_str = encode_dt(created_at);
    let user_id = input.user_id.0;
    let message_id = input.message_id;
    let text = input.text.clone();
    let tags = input.tags;

    let phrase_id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "INSERT INTO phrases (user_id, message_id, text, mastered, created_at)
           VALUES (?1, ?2, ?3, 0, ?4)",
          rusqlite::params![user_id, message_id, text, created_str],
        )?;
        let phrase_id = tx.last_insert_rowid();

        for name in &tags {
          tx.execute(
            "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            rusqlite::params![name],
          )?;
          let tag_id: i64 = tx.query_row(
            "SELECT tag_id FROM tags WHERE name = ?1",
            rusqlite::params![name],
            |r| r.get(0),
          )?;
          tx.execute(
            "INSERT OR IGNORE INTO phrase_tags (phrase_id, tag_id)
             VALUES (?1, ?2)",
            rusqlite::params![phrase_id, tag_id],
          )?;
        }

        tx.commit()?;
        Ok(phrase_id)
      })
      .await?;

    Ok(Phrase {
      phrase_id: PhraseId(phrase_id),
      user_id: input.user_id,
      message_id,
      text: input.text,
      mastered: false,
      created_at,
    })
  }

  async fn get_phrase(&self, id: PhraseId) -> Result<Option<Phrase>> {
    let sql =
      format!("SELECT {PHRASE_COLUMNS} FROM phrases WHERE phrase_id = ?1");
    self.query_phrase(sql, vec![id.0]).await
  }

  async fn find_phrase_by_message(
    &self,
    user_id: UserId,
    message_id: i64,
  ) -> Result<Option<Phrase>> {
    let sql = format!(
      "SELECT {PHRASE_COLUMNS} FROM phrases
       WHERE user_id = ?1 AND message_id = ?2"
    );
    self.query_phrase(sql, vec![user_id.0, message_id]).await
  }

  async fn unreviewed_phrases(
    &self,
    user_id: UserId,
    limit: usize,
  ) -> Result<Vec<Phrase>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawPhrase> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PHRASE_COLUMNS} FROM phrases p
           WHERE p.user_id = ?1
             AND p.mastered = 0
             AND NOT EXISTS (
               SELECT 1 FROM reviews r
               WHERE r.user_id = p.user_id AND r.phrase_id = p.phrase_id
             )
           ORDER BY p.phrase_id ASC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id.0, limit], RawPhrase::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPhrase::into_phrase).collect()
  }

  async fn tags_for_phrase(&self, phrase_id: PhraseId) -> Result<Vec<Tag>> {
    let tags = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT t.tag_id, t.name FROM tags t
           JOIN phrase_tags pt ON pt.tag_id = t.tag_id
           WHERE pt.phrase_id = ?1
           ORDER BY t.tag_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![phrase_id.0], tag_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(tags)
  }

  // ── Reviews ───────────────────────────────────────────────────────────

  async fn get_review(
    &self,
    user_id: UserId,
    phrase_id: PhraseId,
  ) -> Result<Option<Review>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews
                 WHERE user_id = ?1 AND phrase_id = ?2"
              ),
              rusqlite::params![user_id.0, phrase_id.0],
              |r| RawReview::from_row(r, 0),
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawReview::into_review).transpose()
  }

  async fn due_reviews(&self, query: DueQuery) -> Result<Vec<Review>> {
    let user_id = query.user_id.0;
    let now = encode_dt(query.now);
    let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

    let raws: Vec<RawReview> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REVIEW_COLUMNS} FROM reviews
           WHERE user_id = ?1 AND next_review_at <= ?2
           ORDER BY next_review_at ASC, ease_factor ASC, phrase_id ASC
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, now, limit, offset], |r| {
            RawReview::from_row(r, 0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReview::into_review).collect()
  }

  async fn count_reviewed_in_session(
    &self,
    session_id: SessionId,
  ) -> Result<u32> {
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(DISTINCT phrase_id) FROM review_history
           WHERE session_id = ?1",
          rusqlite::params![session_id.0],
          |r| r.get(0),
        )?)
      })
      .await?;

    u32::try_from(count).map_err(|_| Error::InvalidValue {
      column: "review_history.session_id",
      value:  count.to_string(),
    })
  }

  async fn record_review(
    &self,
    review: Review,
    mark_mastered: bool,
  ) -> Result<ReviewHistory> {
    let user_id = review.user_id.0;
    let phrase_id = review.phrase_id.0;
    let session_id = review.session_id.0;
    let quality = u8::from(review.recall_quality);
    let ease_factor = review.ease_factor;
    let interval_days = review.interval_days;
    let reviewed_at = encode_dt(review.reviewed_at);
    let next_review_at = encode_dt(review.next_review_at);

    let history_id: i64 = self
      .conn
      .call(move |conn| {
        // Dropping `tx` without commit rolls every statement back.
        let tx = conn.transaction()?;

        tx.execute(
          &format!(
            "INSERT INTO reviews ({REVIEW_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(user_id, phrase_id) DO UPDATE SET
               session_id     = excluded.session_id,
               recall_quality = excluded.recall_quality,
               ease_factor    = excluded.ease_factor,
               interval_days  = excluded.interval_days,
               reviewed_at    = excluded.reviewed_at,
               next_review_at = excluded.next_review_at"
          ),
          rusqlite::params![
            user_id,
            phrase_id,
            session_id,
            quality,
            ease_factor,
            interval_days,
            reviewed_at,
            next_review_at,
          ],
        )?;

        tx.execute(
          &format!(
            "INSERT INTO review_history ({REVIEW_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
          ),
          rusqlite::params![
            user_id,
            phrase_id,
            session_id,
            quality,
            ease_factor,
            interval_days,
            reviewed_at,
            next_review_at,
          ],
        )?;
        let history_id = tx.last_insert_rowid();

        if mark_mastered {
          tx.execute(
            "UPDATE phrases SET mastered = 1 WHERE phrase_id = ?1",
            rusqlite::params![phrase_id],
          )?;
        }

        tx.commit()?;
        Ok(history_id)
      })
      .await?;

    tracing::debug!(
      user_id,
      phrase_id,
      history_id,
      mastered = mark_mastered,
      "recorded review"
    );

    Ok(ReviewHistory { history_id: HistoryId(history_id), review })
  }

  async fn review_history(
    &self,
    user_id: UserId,
    phrase_id: PhraseId,
  ) -> Result<Vec<ReviewHistory>> {
    let raws: Vec<RawHistory> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT history_id, {REVIEW_COLUMNS} FROM review_history
           WHERE user_id = ?1 AND phrase_id = ?2
           ORDER BY reviewed_at DESC, history_id DESC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_id.0, phrase_id.0],
            RawHistory::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistory::into_history).collect()
  }

  // ── Sessions ──────────────────────────────────────────────────────────

  async fn start_session(
    &self,
    user_id: UserId,
    started_at: DateTime<Utc>,
  ) -> Result<Option<Session>> {
    let started_str = encode_dt(started_at);

    let session_id: Option<i64> = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO sessions (user_id, started_at) VALUES (?1, ?2)",
          rusqlite::params![user_id.0, started_str],
        );
        match inserted {
          Ok(_) => Ok(Some(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(session_id.map(|id| Session {
      session_id: SessionId(id),
      user_id,
      started_at,
      ended_at: None,
    }))
  }

  async fn close_session(
    &self,
    session_id: SessionId,
    ended_at: DateTime<Utc>,
  ) -> Result<bool> {
    let ended_str = encode_dt(ended_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sessions SET ended_at = ?2
           WHERE session_id = ?1 AND ended_at IS NULL",
          rusqlite::params![session_id.0, ended_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
    let sql =
      format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = ?1");
    self.query_session(sql, id.0).await
  }

  async fn active_session(&self, user_id: UserId) -> Result<Option<Session>> {
    let sql = format!(
      "SELECT {SESSION_COLUMNS} FROM sessions
       WHERE user_id = ?1 AND ended_at IS NULL"
    );
    self.query_session(sql, user_id.0).await
  }
}
