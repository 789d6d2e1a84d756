//! `disttable collect`

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

use super::load_source;
use crate::cli::args::SourceArgs;
use crate::config::TableConfig;
use crate::scheduler::Scheduler;
use crate::table::csv::write_csv;
use crate::table::display;

/// Merge every chunk of the inputs and print or write the result.
pub async fn run_collect(
    scheduler: &Scheduler,
    config: &TableConfig,
    source: SourceArgs,
    output: Option<PathBuf>,
    rows: Option<usize>,
) -> Result<()> {
    let table = load_source(scheduler, config, &source).await?;
    let collected = table.collect(scheduler).await?;

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_csv(&collected, BufWriter::new(file))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} rows to {}", collected.num_rows(), path.display());
        }
        None => {
            let max_rows = rows.unwrap_or(config.display.max_rows);
            println!("{}", display::render(&collected, max_rows));
        }
    }
    Ok(())
}
