//! Core types and scheduling logic for phrasemate.
//!
//! This crate holds the review scheduling engine and is deliberately free of
//! HTTP and database dependencies. Storage is reached through the
//! [`store::Repository`] trait; chat transports plug in through
//! [`delivery::Delivery`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod model;
pub mod quality;
pub mod scheduler;
pub mod selector;
pub mod session;
pub mod store;

#[cfg(test)]
mod memory;

pub use config::SchedulingConfig;
pub use engine::{ReviewEngine, ReviewOutcome};
pub use error::{Error, Result};
pub use quality::RecallQuality;
