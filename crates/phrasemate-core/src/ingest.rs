//! Phrase ingestion from inbound chat messages.
//!
//! A message becomes a phrase when it carries at least one hashtag. The sender
//! is registered on first contact; replays of an already-ingested message are
//! ignored.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  Error, Result,
  engine::ReviewEngine,
  model::{NewPhrase, NewUser, Phrase, Tag, User},
  store::Repository,
};

// ─── Text helpers ────────────────────────────────────────────────────────────

/// Hashtag names in `text`, lower-cased, without `#`, first occurrence order.
pub fn extract_hashtags(text: &str) -> Vec<String> {
  let mut tags: Vec<String> = Vec::new();
  for word in text.split_whitespace() {
    let Some(name) = word.strip_prefix('#') else { continue };
    let name = name.to_lowercase();
    if !name.is_empty() && !tags.contains(&name) {
      tags.push(name);
    }
  }
  tags
}

/// `text` with every hashtag word removed and whitespace normalised.
pub fn strip_hashtags(text: &str) -> String {
  text
    .split_whitespace()
    .filter(|word| !word.starts_with('#'))
    .collect::<Vec<_>>()
    .join(" ")
}

// ─── Inbound message ─────────────────────────────────────────────────────────

/// A plain chat message as decoded by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
  /// Sender profile; `sender.chat_id` is the external identity.
  pub sender:     NewUser,
  pub message_id: i64,
  pub text:       String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
  Created { phrase: Phrase, tags: Vec<Tag> },
  /// The message was ingested before; nothing changed.
  Duplicate { phrase: Phrase },
  /// The message has no hashtags and is not a phrase.
  Ignored,
}

impl<S: Repository> ReviewEngine<S> {
  /// Return the user behind `profile.chat_id`, creating it on first contact.
  pub async fn register_user(&self, profile: NewUser) -> Result<User> {
    let existing = self
      .store()
      .find_user_by_chat_id(profile.chat_id)
      .await
      .map_err(Error::storage)?;
    if let Some(user) = existing {
      return Ok(user);
    }

    let user = self.store().create_user(profile).await.map_err(Error::storage)?;
    info!(user_id = %user.user_id, chat_id = user.chat_id, "user registered");
    Ok(user)
  }

  pub async fn ingest_message(&self, message: InboundMessage) -> Result<IngestOutcome> {
    let user = self.register_user(message.sender).await?;

    let tags = extract_hashtags(&message.text);
    if tags.is_empty() {
      debug!(message_id = message.message_id, "message has no hashtags");
      return Ok(IngestOutcome::Ignored);
    }

    let existing = self
      .store()
      .find_phrase_by_message(user.user_id, message.message_id)
      .await
      .map_err(Error::storage)?;
    if let Some(phrase) = existing {
      debug!(phrase_id = %phrase.phrase_id, "message already ingested");
      return Ok(IngestOutcome::Duplicate { phrase });
    }

    let phrase = self
      .store()
      .create_phrase(NewPhrase {
        user_id: user.user_id,
        message_id: message.message_id,
        text: message.text,
        tags,
      })
      .await
      .map_err(Error::storage)?;
    let tags = self
      .store()
      .tags_for_phrase(phrase.phrase_id)
      .await
      .map_err(Error::storage)?;

    info!(
      user_id = %user.user_id,
      phrase_id = %phrase.phrase_id,
      tags = tags.len(),
      "phrase added"
    );
    Ok(IngestOutcome::Created { phrase, tags })
  }
}
