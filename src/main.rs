use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tutormatch::app::App;
use tutormatch::cli::Args;
use tutormatch::config::Config;
use tutormatch::logging::setup_logging;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and setup logging before App::new() so startup logs are never silently dropped
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting tutormatch"
    );

    let app = match App::new(config).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = format!("{e:#}"), "failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    app.run().await
}
