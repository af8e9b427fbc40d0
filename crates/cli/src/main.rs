mod cli;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use birthday_carddav::CardDavClient;
use birthday_core::config::load_dotenv;
use birthday_core::{Clock, Config, SystemClock};
use birthday_notify::{Dispatcher, NotifierRegistry, TemplateRenderer};
use birthday_scheduler::{BirthdayScheduler, SchedulerOptions};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> ExitCode {
    // Before parsing so env-backed flags can come from .env.
    load_dotenv();
    let args = CliArgs::parse();

    // RUST_LOG wins over --log-level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    exit_code(run(args).await)
}

/// Log a fatal error once and map it to the process exit status.
fn exit_code(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "birthday-notifier starting");

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;
    config.log_summary();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let renderer = Arc::new(TemplateRenderer::new(config.template.clone(), clock.clone()));
    renderer
        .validate()
        .context("invalid notification template")?;

    let registry = NotifierRegistry::from_configs(&config.notifiers, renderer)
        .context("invalid notifier configuration")?;
    if registry.is_empty() {
        warn!("no notifiers configured, reminders will not be delivered");
    }

    let options = SchedulerOptions::from_config(&config).context("invalid dispatch schedule")?;
    let source = Arc::new(CardDavClient::new(&config.webdav).context("invalid webdav settings")?);
    let dispatcher = Arc::new(Dispatcher::new(config.max_concurrent_deliveries));
    let scheduler = Arc::new(BirthdayScheduler::new(
        source,
        clock,
        registry,
        dispatcher.clone(),
        options,
    ));

    let birthdays = scheduler
        .refresh()
        .await
        .context("initial contact fetch failed")?;
    info!(birthdays, "initial roster loaded");

    let refresh = tokio::spawn(scheduler.clone().run_refresh_loop());
    let dispatch = tokio::spawn(scheduler.clone().run_dispatch_loop());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    scheduler.shutdown();
    for (name, handle) in [("refresh", refresh), ("dispatch", dispatch)] {
        if let Err(e) = handle.await {
            warn!(task = name, error = %e, "timer task ended abnormally");
        }
    }

    let timeout = Duration::from_secs(args.shutdown_timeout);
    match tokio::time::timeout(timeout, dispatcher.flush()).await {
        Ok(results) => info!(
            deliveries = results.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "in-flight deliveries flushed"
        ),
        Err(_) => warn!(
            timeout_secs = args.shutdown_timeout,
            "gave up waiting for in-flight deliveries"
        ),
    }

    info!("birthday-notifier stopped");
    Ok(())
}
