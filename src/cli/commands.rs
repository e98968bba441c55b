//! CLI command implementations
//!
//! Startup order for sweeping commands:
//! 1. Configuration load
//! 2. Subscriber store load
//! 3. Hazard client construction
//! 4. Mail transport (verified if `mail.verify_on_start`)
//! 5. Sweeps
//!
//! A failure in steps 1-4 is fatal and nothing is swept.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::hazard::HttpHazardClient;
use crate::notifier::{MemoryTransport, Notifier, SmtpMailTransport};
use crate::observability::{log_event, log_event_at, log_event_with_fields, Event, Severity};
use crate::store::SubscriberStore;
use crate::sweep::Sweeper;

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};
use super::signals::wait_for_shutdown_signal;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command. On failure
/// the error is also written to stdout as a JSON error object.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        // stdout may be gone; the caller still reports on stderr.
        let _ = write_error(e.code_str(), e.message());
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Run {
            config,
            interval_secs,
            workers,
            dry_run,
        } => serve(&config, interval_secs, workers, dry_run),
        Command::Sweep { config, dry_run } => sweep(&config, dry_run),
        Command::Subscribe {
            config,
            email,
            x,
            y,
        } => subscribe(&config, &email, x, y),
        Command::Unsubscribe { config, email } => unsubscribe(&config, &email),
        Command::List { config } => list(&config),
    }
}

/// Run sweeps on the configured interval until a shutdown signal
///
/// The cycle in progress at shutdown gets `sweep.shutdown_grace_secs` to
/// finish its in-flight subscribers.
pub fn serve(
    config_path: &Path,
    interval_secs: Option<u64>,
    workers: Option<usize>,
    dry_run: bool,
) -> CliResult<()> {
    log_event(Event::BootStart);

    let mut config = Config::load(config_path).map_err(boot_failure)?;
    if let Some(interval_secs) = interval_secs {
        config.sweep.interval_secs = interval_secs;
    }
    if let Some(workers) = workers {
        config.sweep.workers = workers;
    }
    config.validate().map_err(boot_failure)?;
    log_config_loaded(config_path, &config, dry_run);

    let rt = runtime()?;
    let sweeper = rt.block_on(boot(&config, dry_run)).map_err(boot_failure)?.0;

    let cancel = CancellationToken::new();
    let interval = config.sweep.interval_secs.to_string();
    let workers = config.sweep.workers.to_string();
    log_event_with_fields(
        Event::BootComplete,
        &[
            ("interval_secs", interval.as_str()),
            ("workers", workers.as_str()),
            ("dry_run", if dry_run { "true" } else { "false" }),
        ],
    );

    let cycles = rt.block_on(async {
        spawn_shutdown_listener(cancel.clone());
        sweeper.run(cancel).await
    });

    let metrics = sweeper.metrics().snapshot();
    log_event_with_fields(
        Event::ShutdownComplete,
        &[("cycles", cycles.to_string().as_str())],
    );

    write_response(json!({
        "cycles": cycles,
        "metrics": metrics,
    }))?;

    Ok(())
}

/// Run one sweep and print its summary
pub fn sweep(config_path: &Path, dry_run: bool) -> CliResult<()> {
    log_event(Event::BootStart);

    let config = Config::load(config_path).map_err(boot_failure)?;
    log_config_loaded(config_path, &config, dry_run);

    let rt = runtime()?;
    let (sweeper, outbox) = rt.block_on(boot(&config, dry_run)).map_err(boot_failure)?;
    log_event(Event::BootComplete);

    let cancel = CancellationToken::new();
    let summary = rt
        .block_on(async {
            spawn_shutdown_listener(cancel.clone());
            sweeper.run_once(&cancel).await
        })
        .map_err(|e| CliError::sweep_aborted(e.to_string()))?;

    let mut data = serde_json::to_value(&summary)?;
    if let Some(outbox) = outbox {
        data["dry_run_messages"] = json!(outbox.sent_count());
    }
    write_response(data)?;

    Ok(())
}

/// Register a subscriber
pub fn subscribe(config_path: &Path, email: &str, x: f64, y: f64) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let store = SubscriberStore::open(&config.store_path)?;

    let subscriber = store.add(email, x, y)?;

    write_response(json!({ "subscriber": subscriber }))?;
    Ok(())
}

/// Remove a subscriber
pub fn unsubscribe(config_path: &Path, email: &str) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let store = SubscriberStore::open(&config.store_path)?;

    let removed = store.remove(email)?;

    write_response(json!({ "removed": removed }))?;
    Ok(())
}

/// Print all subscribers
pub fn list(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let store = SubscriberStore::open(&config.store_path)?;

    let subscribers = store.list()?;

    write_response(json!({
        "count": subscribers.len(),
        "subscribers": subscribers,
    }))?;
    Ok(())
}

/// Bring up store, hazard client and notifier
///
/// In dry-run mode the in-memory outbox is returned alongside the sweeper.
async fn boot(
    config: &Config,
    dry_run: bool,
) -> CliResult<(Sweeper, Option<Arc<MemoryTransport>>)> {
    let store = SubscriberStore::open(&config.store_path)
        .map_err(|e| CliError::boot_failed(format!("subscriber store: {}", e)))?;

    let hazard = HttpHazardClient::new(&config.hazard)
        .map_err(|e| CliError::boot_failed(format!("hazard client: {}", e)))?;

    let (notifier, outbox) = if dry_run {
        let outbox = Arc::new(MemoryTransport::new());
        let notifier = Notifier::dry_run(outbox.clone(), config.dry_run_sender());
        (notifier, Some(outbox))
    } else {
        let mail = config.delivery_mail()?;
        if mail.verify_on_start {
            SmtpMailTransport::new(mail.clone())
                .verify()
                .await
                .map_err(|e| CliError::boot_failed(format!("mail transport: {}", e)))?;
            log_event_with_fields(
                Event::MailVerified,
                &[
                    ("smtp_host", mail.smtp_host.as_str()),
                    ("smtp_port", mail.smtp_port.to_string().as_str()),
                ],
            );
        }
        (Notifier::smtp(mail.clone()), None)
    };

    let sweeper = Sweeper::new(
        Arc::new(store),
        Arc::new(hazard),
        notifier,
        config.sweep.clone(),
    );

    Ok((sweeper, outbox))
}

fn runtime() -> CliResult<Runtime> {
    Runtime::new().map_err(|e| {
        boot_failure(CliError::boot_failed(format!(
            "Failed to create tokio runtime: {}",
            e
        )))
    })
}

/// Cancel `cancel` on SIGINT/SIGTERM/SIGQUIT
///
/// If signal handlers cannot be installed the service stops rather than
/// run unstoppable.
fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => return,
            result = wait_for_shutdown_signal() => {
                if let Err(e) = result {
                    log_event_at(
                        Severity::Error,
                        Event::ShutdownStart,
                        &[("reason", format!("signal handler failed: {}", e).as_str())],
                    );
                } else {
                    log_event(Event::ShutdownStart);
                }
            }
        }
        cancel.cancel();
    });
}

fn log_config_loaded(config_path: &Path, config: &Config, dry_run: bool) {
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("config", config_path.display().to_string().as_str()),
            ("store_path", config.store_path.display().to_string().as_str()),
            ("hazard_url", config.hazard.base_url.as_str()),
            ("dry_run", if dry_run { "true" } else { "false" }),
        ],
    );
}

/// Log a startup failure and pass it through
fn boot_failure(e: CliError) -> CliError {
    log_event_with_fields(
        Event::BootFailed,
        &[("code", e.code_str()), ("reason", e.message())],
    );
    e
}
