//! Command routing and execution
//!
//! Resolves layered settings, then hands each subcommand to its handler.

use anyhow::Result;
use tracing::debug;

use crate::app::AppConfig;
use crate::cli::args::Commands;
use crate::cli::commands::{run_collect, run_info};
use crate::config::TableConfig;
use crate::scheduler::Scheduler;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands, app: &AppConfig) -> Result<()> {
    let config = TableConfig::load(app.config_path.as_deref())?;
    debug!("Effective configuration: {:?}", config);
    let scheduler = Scheduler::from_config(&config.scheduler);

    match command {
        Commands::Collect {
            source,
            output,
            rows,
        } => run_collect(&scheduler, &config, source, output, rows).await,
        Commands::Info { source, json } => run_info(&scheduler, &config, source, json).await,
    }
}
