//! Recordify CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use recordify::cli::{
    app::{load_merged_config, run_session, EXIT_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use recordify::domain::config::AppConfig;
use recordify::infrastructure::XdgConfigStore;

/// Environment variable holding the log filter
const LOG_ENV: &str = "RECORDIFY_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let presenter = Presenter::new();

    if let Some(Commands::Config { action }) = cli.command {
        let store = XdgConfigStore::new();
        if let Err(e) = handle_config_command(action, &store, &presenter).await {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
        return ExitCode::SUCCESS;
    }

    let cli_config = AppConfig {
        endpoint: cli.endpoint,
        token: cli.token,
        output_dir: cli.output_dir,
        notify: if cli.notify { Some(true) } else { None },
        audio: None,
    };

    let config = load_merged_config(cli_config).await;
    run_session(config).await
}
