// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use custody_server::{
    api::router,
    config::{ConfigError, ServerConfig, DEFAULT_LOG_FILTER},
    logging::{init_logging, LogFormat},
    providers::{DisabledPayoutProvider, HttpPayoutProvider, PayoutError, PayoutProvider},
    state::AppState,
    storage::{CustodyDatabase, DbError},
    workflow::WithdrawalEngine,
};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open database: {0}")]
    Database(#[from] DbError),

    #[error("invalid payout provider configuration: {0}")]
    Payout(#[from] PayoutError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging(DEFAULT_LOG_FILTER, LogFormat::from_env());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Custody server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;

    let auth_config = config.auth_config();
    if auth_config.jwt_secret.is_none() {
        warn!(mode = auth_config.mode(), "JWT_SECRET is not set; admin routes will reject tokens");
    }

    let db_path = config.database_path();
    let db = Arc::new(CustodyDatabase::open(&db_path)?);
    info!(path = %db_path.display(), "Opened custody database");

    let payouts: Arc<dyn PayoutProvider> = if HttpPayoutProvider::is_configured() {
        Arc::new(HttpPayoutProvider::from_env(config.payout_timeout)?)
    } else {
        warn!("PAYOUT_API_URL/PAYOUT_API_KEY not set; automatic payouts disabled");
        Arc::new(DisabledPayoutProvider)
    };

    let engine = WithdrawalEngine::new(db.clone(), db.clone(), db)
        .with_payout_provider(payouts)
        .with_rate_limit(config.rate_limit)
        .with_payout_timeout(config.payout_timeout);
    info!(
        payout_provider = engine.payout_provider_name(),
        rate_limit_max_actions = config.rate_limit.max_actions,
        rate_limit_window_secs = config.rate_limit.window.as_secs(),
        "Withdrawal engine ready"
    );

    let app = router(AppState::new(engine, auth_config));

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Custody server listening (docs at /docs)");

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Custody server stopped");
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received; draining in-flight requests");
    shutdown.cancel();
}
