//! `disttable info`

use anyhow::Result;
use serde::Serialize;

use super::load_source;
use crate::cli::args::SourceArgs;
use crate::config::TableConfig;
use crate::distributed::{DistributedTable, IndexSpace};
use crate::scheduler::Scheduler;

/// Summary of a distributed table's layout.
#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub pkey: Vec<String>,
    pub schema: String,
    pub chunks: Vec<IndexSpace>,
    pub domain: Option<IndexSpace>,
    pub ordered: bool,
    pub length: Option<usize>,
}

impl InfoReport {
    pub fn from_table(table: &DistributedTable) -> Self {
        Self {
            pkey: table.pkey().to_vec(),
            schema: table.schema().to_string(),
            chunks: table.domains().to_vec(),
            domain: table.domain(),
            ordered: table.is_ordered(),
            length: table.row_count(),
        }
    }

    /// Human-readable form.
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("Primary key: ({})", self.pkey.join(", ")),
            format!("Schema: {}", self.schema),
            format!("Chunks: {}", self.chunks.len()),
        ];
        for (i, space) in self.chunks.iter().enumerate() {
            lines.push(format!("  [{}] {}", i, describe(space)));
        }
        if let Some(domain) = &self.domain {
            lines.push(format!("Domain: {}", describe(domain)));
        }
        lines.push(format!("Ordered: {}", if self.ordered { "yes" } else { "no" }));
        lines.push(match self.length {
            Some(n) => format!("Length: {}", n),
            None => "Length: unknown".to_string(),
        });
        lines.join("\n")
    }
}

fn describe(space: &IndexSpace) -> String {
    let rows = space
        .row_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());
    format!(
        "{} .. {} (bounds {} .. {}, {} rows)",
        space.first(),
        space.last(),
        space.bounding_rectangle.0,
        space.bounding_rectangle.1,
        rows
    )
}

/// Print the layout of the inputs without merging them.
pub async fn run_info(
    scheduler: &Scheduler,
    config: &TableConfig,
    source: SourceArgs,
    json: bool,
) -> Result<()> {
    let table = load_source(scheduler, config, &source).await?;
    let report = InfoReport::from_table(&table);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render());
    }
    Ok(())
}
