//! `nbcache sweep`.

use crate::cache::{EvictionMode, FolderOutcome, SweepReport};
use crate::cli::args::SweepArgs;
use crate::cli::output::UserInterface;
use crate::config::{format_duration, CacheConfig};
use crate::error::Result;

use super::dispatcher::{open_cache, Command, CommandResult};

/// Runs one retention sweep over the cache root.
pub struct SweepCommand {
    config: CacheConfig,
    args: SweepArgs,
}

impl SweepCommand {
    pub fn new(config: CacheConfig, args: SweepArgs) -> Self {
        Self { config, args }
    }
}

impl Command for SweepCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let mut config = self.config.clone();
        if self.args.dry_run {
            config.eviction = EvictionMode::Report;
        }

        let cache = open_cache(&config, &self.args.open)?;
        let report = cache.sweep_now();

        if self.args.json {
            let output = serde_json::to_string_pretty(&report)
                .map_err(|e| anyhow::anyhow!("Failed to serialize sweep report: {}", e))?;
            ui.message(&output);
        } else {
            show_report(&report, self.args.dry_run, ui);
        }

        Ok(match report.root_error {
            Some(_) => CommandResult::failure(1),
            None => CommandResult::success(),
        })
    }
}

fn show_report(report: &SweepReport, dry_run: bool, ui: &mut dyn UserInterface) {
    if let Some(error) = &report.root_error {
        ui.error(&format!("Cannot read cache root: {}", error));
        return;
    }

    for swept in &report.folders {
        let folder = swept.folder.display();
        match &swept.outcome {
            FolderOutcome::Evicted { age_secs } => {
                ui.message(&format!("  evicted  {} ({})", folder, age(*age_secs)));
            }
            FolderOutcome::Eligible { age_secs } => {
                ui.message(&format!("  stale    {} ({})", folder, age(*age_secs)));
            }
            FolderOutcome::Failed { error } => {
                ui.warning(&format!("{}: {}", folder, error));
            }
            _ => {}
        }
    }

    if dry_run {
        ui.success(&format!(
            "Scanned {} entries, {} would be evicted",
            report.scanned,
            report.eligible()
        ));
    } else {
        ui.success(&format!(
            "Scanned {} entries, evicted {}",
            report.scanned,
            report.evicted()
        ));
    }
}

fn age(secs: i64) -> String {
    format!("{} old", format_duration(chrono::Duration::seconds(secs)))
}
