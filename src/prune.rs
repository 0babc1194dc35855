//! Compaction: rewrite a repo so its shards hold only current records.

use crate::catalogue::{RepoCatalogue, RepoSettings};
use crate::error::Result;
use crate::index::LoadStats;
use crate::types::Codec;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Layout overrides for the rewritten repo. `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PruneOptions {
    pub shard_count: Option<u32>,
    pub codec: Option<Codec>,
    pub compressed: Option<bool>,
    /// Carry tombstones over instead of dropping them.
    pub keep_tombstones: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PruneSummary {
    pub before: LoadStats,
    pub written: u64,
    pub dropped: u64,
    pub elapsed: Duration,
}

/// Rewrite `name` through a temporary repo and swap it in.
///
/// The swap is three directory renames (`name` → `name_del`, `name_temp` →
/// `name`, delete `name_del`) and is not atomic: a crash in between leaves the
/// index reachable only as `name_del` or `name_temp`.
pub fn prune_repo(
    catalogue: &dyn RepoCatalogue,
    name: &str,
    options: PruneOptions,
) -> Result<PruneSummary> {
    let started = Instant::now();
    let mut source = catalogue.open(name)?;
    let repo = source.repo().clone();

    let temp_name = format!("{}_temp", name);
    if catalogue.get_repo(&temp_name)?.is_some() {
        warn!("Removing stale {} from an interrupted prune", temp_name);
        catalogue.delete_repo(&temp_name)?;
    }

    let settings = RepoSettings {
        shard_count: options.shard_count.unwrap_or(repo.shard_count),
        codec: options.codec.unwrap_or(repo.codec),
        compressed: options.compressed.unwrap_or(repo.compressed),
    };
    catalogue.create_repo(&temp_name, &repo.absolute_path, settings)?;

    let mut summary = PruneSummary {
        before: source.load()?,
        ..Default::default()
    };
    let mut temp = catalogue.open(&temp_name)?;
    temp.load()?;

    for record in source.stream() {
        if record.missing && !options.keep_tombstones {
            summary.dropped += 1;
            continue;
        }
        temp.add_repo_file(record)?;
        summary.written += 1;
    }
    temp.close()?;
    source.close()?;
    drop(temp);
    drop(source);

    let doomed = format!("{}_del", name);
    catalogue.rename_repo(name, &doomed)?;
    catalogue.rename_repo(&temp_name, name)?;
    catalogue.delete_repo(&doomed)?;

    summary.elapsed = started.elapsed();
    info!(
        repo = name,
        written = summary.written,
        dropped = summary.dropped,
        "Pruned repo in {:?}",
        summary.elapsed
    );
    Ok(summary)
}
