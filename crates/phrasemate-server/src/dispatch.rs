//! Periodic dispatch: every tick, present the next phrase to every user.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use phrasemate_core::{
  ReviewEngine, delivery::Delivery, engine::DispatchSummary, store::Repository,
};
use tokio::time::MissedTickBehavior;

/// One pass over all users at the current time.
pub async fn run_once<S, D>(
  engine: &ReviewEngine<S>,
  delivery: &D,
) -> phrasemate_core::Result<DispatchSummary>
where
  S: Repository,
  D: Delivery,
{
  engine.dispatch_all(delivery, Utc::now()).await
}

/// Dispatch every `period` until the task is aborted. The first pass runs
/// immediately; ticks missed while a pass was running are skipped.
pub async fn run_periodically<S, D>(
  engine: Arc<ReviewEngine<S>>,
  delivery: Arc<D>,
  period: Duration,
) where
  S: Repository,
  D: Delivery,
{
  let mut ticker = tokio::time::interval(period);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

  loop {
    ticker.tick().await;
    if let Err(e) = run_once(&engine, delivery.as_ref()).await {
      tracing::warn!(error = %e, "dispatch pass failed");
    }
  }
}

#[cfg(test)]
mod tests {
  use phrasemate_core::{
    SchedulingConfig,
    ingest::InboundMessage,
    model::NewUser,
  };
  use phrasemate_store_sqlite::SqliteStore;

  use super::*;
  use crate::delivery::LogDelivery;

  #[tokio::test]
  async fn one_pass_presents_to_users_with_work() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let engine = ReviewEngine::new(store, SchedulingConfig::default());
    for (chat_id, text) in [(1, "ciao #it"), (2, "just chatting")] {
      engine
        .ingest_message(InboundMessage {
          sender:     NewUser { chat_id, ..NewUser::default() },
          message_id: 10,
          text:       text.into(),
        })
        .await
        .unwrap();
    }

    let summary = run_once(&engine, &LogDelivery).await.unwrap();
    assert_eq!(summary.presented, 1);
    assert_eq!(summary.idle, 1);
    assert_eq!(summary.failed, 0);
  }
}
