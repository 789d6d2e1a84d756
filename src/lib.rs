//! # disttable
//!
//! Distributed key-sorted tables: a logical table split into chunks that are
//! each sorted by a primary key, with the chunks materialized lazily by a
//! bounded async scheduler and merged back with a fixed reduction tree.
//!
//! ## Usage
//!
//! ```bash
//! disttable collect orders-*.csv --key id [--output merged.csv]
//! disttable info orders.csv --key id --chunks 8 [--json]
//! ```
//!
//! ## Modules
//!
//! - `table` - Local key-sorted tables, values, schemas, CSV and display
//! - `distributed` - Chunk handles, index spaces, the builder, merging and lifecycle
//! - `scheduler` - Shared-future tasks, batched submission and the chunk store
//! - `config` - Layered configuration (defaults, TOML file, environment)
//! - `error` - Error taxonomy with stable codes
//! - `app` - Logging setup and fatal error reporting for the binary
//! - `cli` - Command-line interface
pub mod app;
pub mod cli;
pub mod config;
pub mod distributed;
pub mod error;
pub mod scheduler;
pub mod table;

pub use config::TableConfig;
pub use distributed::{
    distribute, from_chunks, ChunkHandle, DistributedTable, IndexSpace, Partitioning,
    TableBuilder,
};
pub use error::{Result, TableError};
pub use scheduler::{Scheduler, Task, TaskGraph};
pub use table::{Aggregate, Key, LocalTable, Schema, Value};
