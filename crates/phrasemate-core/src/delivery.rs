//! The delivery adapter seam: how phrases reach the learner and how their
//! answers come back.
//!
//! Outbound, the engine hands a [`Presentation`] to a [`Delivery`]
//! implementation. Inbound, the transport decodes whatever its platform sends
//! into a [`ChoiceMade`]. Transports that round-trip an opaque string per
//! button can use [`CallbackToken`].

use std::{fmt, future::Future, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  Error,
  ingest::strip_hashtags,
  model::{Phrase, PhraseId, SessionId},
  quality::RecallQuality,
};

// ─── Outbound ────────────────────────────────────────────────────────────────

/// One answer button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
  pub quality: RecallQuality,
  pub label:   String,
  /// Opaque token the transport echoes back when this choice is picked.
  pub token:   String,
}

/// A phrase ready to be shown, with the full set of quality choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
  /// External chat identity of the learner.
  pub recipient:    i64,
  pub session_id:   SessionId,
  pub phrase_id:    PhraseId,
  /// Phrase text with its hashtags removed.
  pub display_text: String,
  pub choices:      Vec<Choice>,
}

impl Presentation {
  pub fn new(recipient: i64, session_id: SessionId, phrase: &Phrase) -> Self {
    let choices = RecallQuality::all()
      .map(|quality| Choice {
        quality,
        label: quality.ordinal().to_string(),
        token: CallbackToken {
          session_id,
          phrase_id: phrase.phrase_id,
          quality: quality.ordinal(),
        }
        .to_string(),
      })
      .collect();

    Self {
      recipient,
      session_id,
      phrase_id: phrase.phrase_id,
      display_text: strip_hashtags(&phrase.text),
      choices,
    }
  }
}

/// A transport able to put a [`Presentation`] in front of its recipient.
pub trait Delivery: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn present<'a>(
    &'a self,
    presentation: &'a Presentation,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Inbound ─────────────────────────────────────────────────────────────────

/// The learner picked a quality for a presented phrase.
///
/// `quality` is the raw ordinal; validation happens in the review path so an
/// out-of-range value surfaces as [`Error::InvalidQuality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceMade {
  pub recipient:  i64,
  pub session_id: SessionId,
  pub phrase_id:  PhraseId,
  pub quality:    u8,
}

impl ChoiceMade {
  pub fn from_token(recipient: i64, token: &str) -> Result<Self, Error> {
    let CallbackToken { session_id, phrase_id, quality } = token.parse()?;
    Ok(Self { recipient, session_id, phrase_id, quality })
  }
}

/// `review:<session_id>:<phrase_id>:<quality>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackToken {
  pub session_id: SessionId,
  pub phrase_id:  PhraseId,
  pub quality:    u8,
}

const TOKEN_PREFIX: &str = "review";

impl fmt::Display for CallbackToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{TOKEN_PREFIX}:{}:{}:{}",
      self.session_id, self.phrase_id, self.quality
    )
  }
}

impl FromStr for CallbackToken {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || Error::InvalidCallbackToken(s.to_owned());

    let mut parts = s.split(':');
    let (Some(TOKEN_PREFIX), Some(session), Some(phrase), Some(quality), None) = (
      parts.next(),
      parts.next(),
      parts.next(),
      parts.next(),
      parts.next(),
    ) else {
      return Err(invalid());
    };

    Ok(Self {
      session_id: session.parse().map_err(|_| invalid())?,
      phrase_id:  phrase.parse().map_err(|_| invalid())?,
      quality:    quality.parse().map_err(|_| invalid())?,
    })
  }
}
