//! phrasemate server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus
//! `PHRASEMATE_*` environment overrides, opens the SQLite store, and either
//! serves the API or runs a one-shot command.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash` in config.toml:
//!
//! ```text
//! cargo run -p phrasemate-server -- hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::{Parser, Subcommand};
use phrasemate_core::ReviewEngine;
use phrasemate_server::{
  ServerConfig, auth::AuthConfig, delivery::ServerDelivery, dispatch,
};
use phrasemate_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "phrasemate review scheduler")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,
  /// Present the next phrase to every user once, then exit.
  Dispatch,
  /// Create or upgrade the store schema, then exit.
  Migrate,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => hash_password(),
    Command::Migrate => {
      let (_, store_path, store) = open(&cli.config).await?;
      let version = store
        .schema_version()
        .await
        .context("failed to read schema version")?;
      tracing::info!(path = ?store_path, version, "store schema is up to date");
      Ok(())
    }
    Command::Dispatch => {
      let (server_cfg, _, store) = open(&cli.config).await?;
      let engine = ReviewEngine::new(store, server_cfg.scheduling);
      let delivery = ServerDelivery::from_url(server_cfg.delivery_url.as_deref());
      let summary = dispatch::run_once(&engine, &delivery)
        .await
        .context("dispatch failed")?;
      println!(
        "presented {}, idle {}, failed {}",
        summary.presented, summary.idle, summary.failed
      );
      Ok(())
    }
    Command::Serve => {
      let (server_cfg, _, store) = open(&cli.config).await?;
      serve(store, server_cfg).await
    }
  }
}

/// Load configuration and open the store it points at.
async fn open(
  config_path: &Path,
) -> anyhow::Result<(ServerConfig, PathBuf, SqliteStore)> {
  let server_cfg = ServerConfig::load(config_path).with_context(|| {
    format!("failed to load configuration from {config_path:?}")
  })?;

  let store_path = server_cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  Ok((server_cfg, store_path, store))
}

/// Hash a password read from stdin and print the PHC string.
fn hash_password() -> anyhow::Result<()> {
  let password = read_password()?;
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
    .to_string();
  println!("{hash}");
  Ok(())
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  anyhow::ensure!(
    !server_cfg.auth_username.is_empty() && !server_cfg.auth_password_hash.is_empty(),
    "auth_username and auth_password_hash must be set to serve"
  );

  let engine = Arc::new(ReviewEngine::new(store, server_cfg.scheduling));
  let auth = Arc::new(AuthConfig {
    username:      server_cfg.auth_username.clone(),
    password_hash: server_cfg.auth_password_hash.clone(),
  });

  let dispatcher = server_cfg.dispatch_interval_secs.map(|secs| {
    let delivery = Arc::new(ServerDelivery::from_url(server_cfg.delivery_url.as_deref()));
    tracing::info!(every_secs = secs, "periodic dispatch enabled");
    tokio::spawn(dispatch::run_periodically(
      engine.clone(),
      delivery,
      Duration::from_secs(secs.max(1)),
    ))
  });

  let app = phrasemate_server::router(engine, auth);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let served = axum::serve(listener, app).await.context("server error");
  if let Some(handle) = dispatcher {
    handle.abort();
  }
  served
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
