//! Interactive session runner

use std::env;
use std::io::BufRead;
use std::process::ExitCode;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::application::ports::{ArtifactStore, CaptureDevice, ConfigStore, Notifier};
use crate::application::{
    ControllerConfig, ControllerError, RecordingController, SaveOutcome, SessionSnapshot,
};
use crate::domain::config::AppConfig;
use crate::infrastructure::{
    create_artifact_store, create_capture_device, create_notifier, XdgConfigStore,
};

use super::args::SessionCommand;
use super::presenter::Presenter;
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;

/// Controller wired to boxed adapters
pub type SessionController =
    RecordingController<Box<dyn CaptureDevice>, Box<dyn ArtifactStore>, Box<dyn Notifier>>;

/// Outcome lines produced by background commands
#[derive(Debug, Clone, PartialEq, Eq)]
enum Report {
    Info(String),
    Success(String),
    Warn(String),
}

/// Run an interactive recording session until quit, EOF or Ctrl-C
pub async fn run_session(config: AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();

    let shutdown = ShutdownSignal::new();
    if let Err(e) = shutdown.setup() {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let controller = create_controller(&config);
    match config.endpoint() {
        Some(endpoint) => presenter.info(&format!("Recordings are uploaded to {}", endpoint)),
        None => presenter.info(&format!(
            "Recordings are saved to {}",
            config.output_dir_or_default().display()
        )),
    }
    presenter.help(SessionCommand::HELP);

    let mut lines = spawn_stdin_reader();
    let mut snapshots = controller.subscribe();
    let (reports_tx, mut reports) = mpsc::unbounded_channel();

    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                debug!("shutdown requested");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                presenter.render(&snapshot);
            }
            Some(report) = reports.recv() => show_report(&presenter, report),
            line = lines.recv() => {
                let Some(line) = line else {
                    debug!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<SessionCommand>() {
                    Ok(SessionCommand::Quit) => break,
                    Ok(command) => dispatch(command, &controller, &presenter, &reports_tx),
                    Err(message) => presenter.warn(&message),
                }
            }
        }
    }

    if controller.snapshot().has_artifact() {
        presenter.warn("Discarding unsaved recording");
    }
    controller.teardown();
    presenter.stop_spinner();
    info!("session ended");

    ExitCode::from(EXIT_SUCCESS)
}

/// Build the controller and its adapters from configuration
pub fn create_controller(config: &AppConfig) -> SessionController {
    RecordingController::new(
        create_capture_device(),
        create_artifact_store(config),
        create_notifier(config.notify_or_default()),
        ControllerConfig::from_app_config(config),
    )
}

fn dispatch(
    command: SessionCommand,
    controller: &SessionController,
    presenter: &Presenter,
    reports: &mpsc::UnboundedSender<Report>,
) {
    match command {
        SessionCommand::Start => {
            let controller = controller.clone();
            let reports = reports.clone();
            tokio::spawn(async move {
                let report = match controller.start().await {
                    Ok(()) => Some(Report::Success("Recording started".into())),
                    // Already surfaced through the notifier
                    Err(ControllerError::Acquisition(_)) | Err(ControllerError::TornDown) => None,
                    Err(e) => Some(Report::Warn(e.to_string())),
                };
                if let Some(report) = report {
                    let _ = reports.send(report);
                }
            });
        }
        SessionCommand::Pause => match controller.pause() {
            Ok(()) => presenter.info("Paused"),
            Err(e) => presenter.warn(&e.to_string()),
        },
        SessionCommand::Resume => match controller.resume() {
            Ok(()) => presenter.info("Resumed"),
            Err(e) => presenter.warn(&e.to_string()),
        },
        SessionCommand::Stop => {
            let controller = controller.clone();
            let reports = reports.clone();
            tokio::spawn(async move {
                let report = match controller.stop().await {
                    Ok(()) => stop_report(&controller.snapshot()),
                    Err(ControllerError::TornDown) => None,
                    Err(e) => Some(Report::Warn(e.to_string())),
                };
                if let Some(report) = report {
                    let _ = reports.send(report);
                }
            });
        }
        SessionCommand::Save => {
            let controller = controller.clone();
            let reports = reports.clone();
            tokio::spawn(async move {
                let report = match controller.save().await {
                    SaveOutcome::Saved(receipt) => receipt
                        .id
                        .map(|id| Report::Info(format!("Stored as {}", id))),
                    SaveOutcome::Skipped => Some(Report::Warn(
                        "Nothing to save. Stop a recording first.".into(),
                    )),
                    // Failures are surfaced through the notifier
                    SaveOutcome::Failed(_) | SaveOutcome::Abandoned => None,
                };
                if let Some(report) = report {
                    let _ = reports.send(report);
                }
            });
        }
        SessionCommand::Status => presenter.status(&controller.snapshot()),
        SessionCommand::Help => presenter.help(SessionCommand::HELP),
        SessionCommand::Quit => {}
    }
}

fn stop_report(snapshot: &SessionSnapshot) -> Option<Report> {
    if snapshot.has_artifact() {
        Some(Report::Success(format!(
            "Recording stopped ({}). Type 'save' to keep it.",
            Presenter::format_status(snapshot)
        )))
    } else {
        Some(Report::Info("Recording reset".into()))
    }
}

fn show_report(presenter: &Presenter, report: Report) {
    match report {
        Report::Info(message) => presenter.info(&message),
        Report::Success(message) => presenter.success(&message),
        Report::Warn(message) => presenter.warn(&message),
    }
}

/// Read stdin on a dedicated thread; the channel closes at EOF
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load_or_empty().await;

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config())
        .merge(cli_config)
}

fn env_config() -> AppConfig {
    AppConfig {
        endpoint: env::var("RECORDIFY_ENDPOINT").ok().filter(|s| !s.is_empty()),
        token: env::var("RECORDIFY_TOKEN").ok().filter(|s| !s.is_empty()),
        ..Default::default()
    }
}
