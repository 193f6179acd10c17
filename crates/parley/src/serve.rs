// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` command implementation.
//!
//! Wires the full relay: SQLite storage, key vault and cache, the durable
//! rate limiter, the provider router, and the HTTP gateway. Shuts down
//! gracefully on SIGTERM or Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use parley_config::ParleyConfig;
use parley_core::ParleyError;
use parley_gateway::GatewayState;
use parley_keys::{KeyCache, KeyService};
use parley_limiter::RateLimitStore;
use parley_providers::ProviderRouter;
use parley_storage::Database;
use parley_vault::KeyVault;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    token_clone.cancel();
                    return;
                }
            };

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

/// Runs the `parley serve` command.
pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    info!("starting parley serve");

    let app_secret = config
        .secrets
        .app_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ParleyError::Config(
                "secrets.app_secret is required (set PARLEY_SECRETS_APP_SECRET)".to_string(),
            )
        })?;

    if let Some(parent) = std::path::Path::new(&config.storage.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ParleyError::Config(format!("cannot create data directory {parent:?}: {e}"))
            })?;
        }
    }
    let db = Database::open(&config.storage.path).await?;

    // scrypt makes this deliberately slow; derive once, off the main path.
    let secret = SecretString::from(app_secret.to_string());
    let vault = tokio::task::spawn_blocking(move || KeyVault::new(&secret))
        .await
        .map_err(|e| ParleyError::Internal(format!("vault key derivation panicked: {e}")))??;
    let vault = Arc::new(vault);

    let cache = Arc::new(KeyCache::new(Duration::from_secs(config.key_cache.ttl_secs)));
    let keys = KeyService::new(db.clone(), Arc::clone(&vault), Arc::clone(&cache));

    let limiter = Arc::new(RateLimitStore::new(
        db.clone(),
        Duration::from_millis(config.rate_limit.window_ms),
        config.rate_limit.max_hits,
    ));

    let router = Arc::new(ProviderRouter::from_config(&config.providers)?);

    let shutdown = install_signal_handler();
    cache.start_sweeper(
        Duration::from_secs(config.key_cache.sweep_interval_secs),
        shutdown.clone(),
    );
    limiter.start_sweeper(
        Duration::from_secs(config.rate_limit.sweep_interval_secs),
        shutdown.clone(),
    );

    let state = GatewayState {
        db: db.clone(),
        keys,
        limiter,
        router,
    };
    parley_gateway::start_server(&config.server.host, config.server.port, state, shutdown).await?;

    debug!("server stopped, closing database");
    db.close().await?;
    info!("parley serve stopped");
    Ok(())
}
