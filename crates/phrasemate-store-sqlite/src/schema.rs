//! SQL schema for the phrasemate SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id       INTEGER NOT NULL UNIQUE,
    first_name    TEXT    NOT NULL DEFAULT '',
    last_name     TEXT    NOT NULL DEFAULT '',
    username      TEXT    NOT NULL DEFAULT '',
    language_code TEXT    NOT NULL DEFAULT '',
    is_bot        INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT    NOT NULL
);

-- `mastered` only ever goes from 0 to 1.
CREATE TABLE IF NOT EXISTS phrases (
    phrase_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(user_id),
    message_id  INTEGER NOT NULL,
    text        TEXT    NOT NULL,
    mastered    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT    NOT NULL,
    UNIQUE (user_id, message_id)
);

CREATE TABLE IF NOT EXISTS tags (
    tag_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name    TEXT    NOT NULL UNIQUE   -- lower-cased, no leading '#'
);

CREATE TABLE IF NOT EXISTS phrase_tags (
    phrase_id  INTEGER NOT NULL REFERENCES phrases(phrase_id),
    tag_id     INTEGER NOT NULL REFERENCES tags(tag_id),
    PRIMARY KEY (phrase_id, tag_id)
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(user_id),
    started_at  TEXT    NOT NULL,
    ended_at    TEXT                -- NULL while active
);

-- At most one active session per user.
CREATE UNIQUE INDEX IF NOT EXISTS sessions_one_active_idx
    ON sessions(user_id) WHERE ended_at IS NULL;

-- Current scheduling state, upserted on every accepted attempt.
CREATE TABLE IF NOT EXISTS reviews (
    user_id         INTEGER NOT NULL REFERENCES users(user_id),
    phrase_id       INTEGER NOT NULL REFERENCES phrases(phrase_id),
    session_id      INTEGER NOT NULL REFERENCES sessions(session_id),
    recall_quality  INTEGER NOT NULL CHECK (recall_quality BETWEEN 1 AND 5),
    ease_factor     REAL    NOT NULL CHECK (ease_factor >= 1.3),
    interval_days   INTEGER NOT NULL CHECK (interval_days >= 1),
    reviewed_at     TEXT    NOT NULL,
    next_review_at  TEXT    NOT NULL,
    PRIMARY KEY (user_id, phrase_id)
);

-- Strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS review_history (
    history_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         INTEGER NOT NULL REFERENCES users(user_id),
    phrase_id       INTEGER NOT NULL REFERENCES phrases(phrase_id),
    session_id      INTEGER NOT NULL REFERENCES sessions(session_id),
    recall_quality  INTEGER NOT NULL,
    ease_factor     REAL    NOT NULL,
    interval_days   INTEGER NOT NULL,
    reviewed_at     TEXT    NOT NULL,
    next_review_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS phrases_user_idx    ON phrases(user_id);
CREATE INDEX IF NOT EXISTS reviews_due_idx     ON reviews(user_id, next_review_at, ease_factor);
CREATE INDEX IF NOT EXISTS history_pair_idx    ON review_history(user_id, phrase_id);
CREATE INDEX IF NOT EXISTS history_session_idx ON review_history(session_id);

PRAGMA user_version = 1;
";
