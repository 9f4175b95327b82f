//! Error type for `phrasemate-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] phrasemate_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value that does not fit its domain type.
  #[error("invalid stored value in {column}: {value}")]
  InvalidValue { column: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
