use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use labwatch_engine::{validate_target_id, verify_history, FsSnapshotStore, SnapshotStore};
use labwatch_logging::watch_warn;

use crate::config::{Settings, DEFAULT_CONFIG};

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Target (patient) id
    pub(crate) target: String,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub(crate) config: PathBuf,

    /// Recompute each snapshot's digest and compare it to the stored one
    #[arg(long)]
    pub(crate) verify: bool,
}

pub fn execute(args: HistoryArgs) -> Result<()> {
    let settings = Settings::load(&args.config)
        .with_context(|| format!("invalid configuration {}", args.config.display()))?;
    validate_target_id(&args.target)?;
    let store = FsSnapshotStore::new(settings.archive_dir.clone());

    if !args.verify {
        let snapshots = store.list(&args.target)?;
        if snapshots.is_empty() {
            println!("no snapshots for {}", args.target);
        }
        for snapshot in snapshots {
            println!(
                "{}  {}  {}",
                snapshot.captured_at,
                snapshot.digest,
                snapshot.content_path.display()
            );
        }
        return Ok(());
    }

    let checks = verify_history(&store, &settings.normalizer, &args.target)?;
    let mut mismatches = 0;
    for check in &checks {
        let verdict = if check.is_intact() {
            "ok"
        } else {
            mismatches += 1;
            watch_warn!(
                "{} snapshot {} digest mismatch: stored {}, recomputed {}",
                args.target,
                check.snapshot.captured_at,
                check.snapshot.digest,
                check.recomputed
            );
            "MISMATCH"
        };
        println!(
            "{}  {}  {}",
            check.snapshot.captured_at, check.snapshot.digest, verdict
        );
    }
    if mismatches > 0 {
        bail!(
            "{mismatches} of {} snapshot(s) for {} failed verification",
            checks.len(),
            args.target
        );
    }
    Ok(())
}
