//! Subcommand implementations.

mod collect;
mod info;

pub use collect::run_collect;
pub use info::{run_info, InfoReport};

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::cli::args::SourceArgs;
use crate::config::TableConfig;
use crate::distributed::{distribute, from_chunks, ChunkHandle, DistributedTable, Partitioning};
use crate::scheduler::{Scheduler, Task};
use crate::table::csv::read_csv;
use crate::table::LocalTable;

/// Load the input files as one distributed table.
///
/// A single file is read eagerly and split into `--chunks` (or the
/// configured default) chunks. Several files become one pending chunk each,
/// read by scheduler tasks in a single batch.
pub async fn load_source(
    scheduler: &Scheduler,
    config: &TableConfig,
    source: &SourceArgs,
) -> Result<DistributedTable> {
    if let [path] = source.files.as_slice() {
        let chunks = source.chunks.unwrap_or(config.distribute.chunks);
        info!("Reading {} into {} chunks", path.display(), chunks);
        let local = read_blocking(path.clone(), source.key.clone()).await?;
        return distribute(&local, &Partitioning::Chunks(chunks))
            .with_context(|| format!("Failed to distribute {}", path.display()));
    }

    if source.chunks.is_some() {
        debug!("--chunks ignored: each input file is one chunk");
    }
    let handles = source
        .files
        .iter()
        .map(|path| {
            ChunkHandle::pending(Task::new(read_blocking(path.clone(), source.key.clone())))
        })
        .collect();

    Ok(from_chunks(scheduler, handles)
        .await
        .context("Failed to load input files")?)
}

/// Read one CSV file on tokio's blocking pool.
async fn read_blocking(path: PathBuf, key: Vec<String>) -> Result<LocalTable> {
    let table = tokio::task::spawn_blocking(move || read_csv(&path, key.as_slice()))
        .await
        .context("CSV reader thread failed")??;
    Ok(table)
}
