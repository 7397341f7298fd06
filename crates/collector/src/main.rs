use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use vossibility_collector::{App, SyncOptions, telemetry};

/// Collects GitHub activity into Elasticsearch.
#[derive(Parser, Debug)]
#[command(name = "vossibility-collector", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Listen and process GitHub events (default).
    Run,
    /// Sync storage with the GitHub repositories.
    Sync {
        /// Issue number to start from; 0 uses each repository's start_index.
        #[arg(long, default_value_t = 1)]
        from: u64,
        /// Seconds to sleep between each GitHub page queried.
        #[arg(long, default_value_t = 0)]
        sleep: u64,
        /// Repositories to sync (all when omitted).
        repositories: Vec<String>,
    },
    /// Sync the configuration definition with the store mappings.
    SyncMapping,
    /// Sync the user store with the information from a file.
    SyncUsers {
        /// Users description file.
        #[arg(short, long, default_value = "users.toml")]
        file: String,
    },
    /// Get information about your GitHub API rate limits.
    Limits,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.debug);

    let app = match App::load(&cli.config) {
        Ok(app) => app,
        Err(e) => {
            error!(path = %cli.config, error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    match execute(&app, cli.command.unwrap_or(Commands::Run)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(app: &App, command: Commands) -> Result<(), vossibility_collector::CollectorError> {
    match command {
        Commands::Run => app.run(shutdown_signal()).await,
        Commands::Sync {
            from,
            sleep,
            repositories,
        } => {
            let options = SyncOptions {
                from,
                sleep_per_page: Duration::from_secs(sleep),
                ..SyncOptions::default()
            };
            let report = app.sync(&repositories, options).await?;
            print!("{report}");
            Ok(())
        }
        Commands::SyncMapping => app.sync_mapping().await,
        Commands::SyncUsers { file } => {
            let written = app.sync_users(&file).await?;
            info!(count = written, file = %file, "users synchronized");
            Ok(())
        }
        Commands::Limits => {
            print!("{}", app.limits().await?);
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
