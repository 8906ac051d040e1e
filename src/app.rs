use crate::config::Config;
use crate::data::seed::load_fixture;
use crate::matching::{CompletionService, DisabledCompletion, GeminiClient};
use crate::state::AppState;
use crate::store::{DocumentStore, MemoryStore, PgStore};
use crate::utils::fmt_duration;
use crate::web::create_router;
use anyhow::Context;
use sqlx::ConnectOptions;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
}

impl App {
    /// Create a new App instance with all necessary components initialized
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let store = Self::connect_store(&config).await?;

        if let Some(path) = &config.seed_path {
            load_fixture(store.as_ref(), path)
                .await
                .context("Failed to load seed fixture")?;
        }

        let completion: Arc<dyn CompletionService> = match config.api_key() {
            Some(key) => {
                let client =
                    GeminiClient::new(&config.gemini_endpoint, key, config.completion_timeout)
                        .context("Failed to create completion client")?;
                info!(
                    timeout = fmt_duration(config.completion_timeout),
                    "completion service configured"
                );
                Arc::new(client)
            }
            None => {
                warn!("GEMINI_API_KEY not set, tutor matching will return no recommendations");
                Arc::new(DisabledCompletion)
            }
        };

        let app_state = AppState::new(store, completion);
        Ok(App { config, app_state })
    }

    async fn connect_store(config: &Config) -> Result<Arc<dyn DocumentStore>, anyhow::Error> {
        let Some(database_url) = config.database_url() else {
            warn!("DATABASE_URL not set, documents are kept in memory and lost on exit");
            return Ok(Arc::new(MemoryStore::new()));
        };

        let connect_options = sqlx::postgres::PgConnectOptions::from_str(database_url)
            .context("Failed to parse database URL")?
            .log_statements(tracing::log::LevelFilter::Debug)
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect_with(connect_options)
            .await
            .context("Failed to create database pool")?;

        info!(
            min_connections = 0,
            max_connections = 4,
            acquire_timeout = "4s",
            idle_timeout = "2m",
            max_lifetime = "30m",
            "database pool established"
        );

        let store = PgStore::new(db_pool);
        info!("Running database migrations...");
        store
            .migrate()
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed successfully");

        Ok(Arc::new(store))
    }

    /// Serve HTTP until a shutdown signal, then drain background matching.
    pub async fn run(self) -> ExitCode {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = ?e, %addr, "failed to bind listener");
                return ExitCode::FAILURE;
            }
        };
        info!(%addr, store = self.app_state.store.backend(), "web server listening");

        let router = create_router(self.app_state.clone());
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!(error = ?e, "web server failed");
            return ExitCode::FAILURE;
        }

        let tasks = &self.app_state.tasks;
        tasks.close();
        let pending = tasks.len();
        let start = Instant::now();
        match tokio::time::timeout(self.config.shutdown_timeout, tasks.wait()).await {
            Ok(()) => {
                info!(
                    pending,
                    duration = fmt_duration(start.elapsed()),
                    "graceful shutdown complete"
                );
                ExitCode::SUCCESS
            }
            Err(_) => {
                warn!(
                    remaining = tasks.len(),
                    timeout = fmt_duration(self.config.shutdown_timeout),
                    "shutdown timed out with matching runs still in flight"
                );
                ExitCode::FAILURE
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = ?e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
