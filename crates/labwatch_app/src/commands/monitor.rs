use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use labwatch_engine::{
    zoned_timestamps, CancellationToken, CommandNotifier, FsHashLedger, FsSnapshotStore,
    MessageTemplate, ReqwestFetcher, Scheduler, TargetMonitor,
};
use labwatch_logging::{watch_error, watch_info};

use crate::config::{Settings, DEFAULT_CONFIG};

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub(crate) config: PathBuf,

    /// Run a single pass over all targets and exit
    #[arg(long)]
    pub(crate) once: bool,
}

pub async fn execute(args: MonitorArgs) -> Result<()> {
    let settings = Settings::load(&args.config)
        .with_context(|| format!("invalid configuration {}", args.config.display()))?;
    let scheduler = build_scheduler(settings, args.once)?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => watch_info!("interrupt received; stopping after the current target"),
            Err(err) => watch_error!("cannot listen for interrupts: {}", err),
        }
        trigger.cancel();
    });

    scheduler.run(cancel).await;
    Ok(())
}

fn build_scheduler(settings: Settings, once: bool) -> Result<Scheduler> {
    let fetcher =
        Arc::new(ReqwestFetcher::new(settings.fetch).context("cannot build HTTP client")?);
    let store = Arc::new(FsSnapshotStore::new(settings.archive_dir.clone()));
    let ledger = Arc::new(FsHashLedger::new(settings.archive_dir));

    let mut monitor = TargetMonitor::new(fetcher, store, ledger, zoned_timestamps(settings.timezone))
        .with_normalizer(settings.normalizer);
    if let Some(notifier) = settings.notifier {
        watch_info!(
            "notifications go to {} via {}",
            notifier.recipient,
            notifier.program
        );
        monitor = monitor.with_notifier(
            Arc::new(CommandNotifier::new(
                notifier.program,
                notifier.script,
                notifier.recipient,
            )),
            MessageTemplate::new(notifier.template),
        );
    }

    let scheduler = Scheduler::new(monitor, settings.registry, settings.interval);
    Ok(if once {
        scheduler.with_max_cycles(1)
    } else {
        scheduler
    })
}
