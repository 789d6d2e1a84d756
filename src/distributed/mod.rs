//! Distributed tables: key-sorted chunks spread over scheduler work units.
//!
//! A [`DistributedTable`] is built from [`ChunkHandle`]s by the
//! [`TableBuilder`], split from a local table by [`distribute`], and turned
//! back into one local table by `collect`, which reduces the chunks with a
//! fixed binary merge tree.

pub mod builder;
pub mod chunk;
pub mod distribute;
pub mod index_space;
mod lifecycle;
pub mod merge;
pub mod table;

pub use builder::{from_chunks, TableBuilder};
pub use chunk::{ChunkHandle, MaterializedChunk};
pub use distribute::{distribute, Partitioning};
pub use index_space::{derive_domain, ChunkDomain, IndexSpace};
pub use merge::{merge_many, merge_pair, merge_tree, plan_merge, MergePath};
pub use table::DistributedTable;
