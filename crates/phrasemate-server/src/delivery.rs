//! Outbound delivery adapters.
//!
//! [`WebhookDelivery`] POSTs each presentation as JSON to the chat bridge;
//! [`LogDelivery`] only logs it, for setups without a bridge URL.

use phrasemate_core::delivery::{Delivery, Presentation};

use crate::error::Error;

// ─── Webhook ─────────────────────────────────────────────────────────────────

pub struct WebhookDelivery {
  client: reqwest::Client,
  url:    String,
}

impl WebhookDelivery {
  pub fn new(url: impl Into<String>) -> Self {
    Self { client: reqwest::Client::new(), url: url.into() }
  }
}

impl Delivery for WebhookDelivery {
  type Error = Error;

  async fn present(&self, presentation: &Presentation) -> Result<(), Error> {
    self
      .client
      .post(&self.url)
      .json(presentation)
      .send()
      .await?
      .error_for_status()?;
    tracing::debug!(
      recipient = presentation.recipient,
      phrase_id = %presentation.phrase_id,
      "presentation delivered"
    );
    Ok(())
  }
}

// ─── Log ─────────────────────────────────────────────────────────────────────

pub struct LogDelivery;

impl Delivery for LogDelivery {
  type Error = Error;

  async fn present(&self, presentation: &Presentation) -> Result<(), Error> {
    tracing::info!(
      recipient = presentation.recipient,
      session_id = %presentation.session_id,
      phrase_id = %presentation.phrase_id,
      text = %presentation.display_text,
      "presentation (no delivery_url configured)"
    );
    Ok(())
  }
}

// ─── Selection ───────────────────────────────────────────────────────────────

/// The adapter picked from configuration.
pub enum ServerDelivery {
  Webhook(WebhookDelivery),
  Log(LogDelivery),
}

impl ServerDelivery {
  pub fn from_url(url: Option<&str>) -> Self {
    match url {
      Some(url) => Self::Webhook(WebhookDelivery::new(url)),
      None => Self::Log(LogDelivery),
    }
  }
}

impl Delivery for ServerDelivery {
  type Error = Error;

  async fn present(&self, presentation: &Presentation) -> Result<(), Error> {
    match self {
      Self::Webhook(d) => d.present(presentation).await,
      Self::Log(d) => d.present(presentation).await,
    }
  }
}
