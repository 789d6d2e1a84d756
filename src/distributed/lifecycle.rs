//! Evaluation, collection and release of distributed tables.

use std::sync::Arc;
use tracing::{debug, info};

use super::builder::TableBuilder;
use super::chunk::ChunkHandle;
use super::merge::merge_tree;
use super::table::DistributedTable;
use crate::error::{Result, TableError};
use crate::scheduler::{Scheduler, Task};
use crate::table::{Aggregate, LocalTable};

impl DistributedTable {
    /// Materialize every chunk and pin it in the scheduler's chunk store.
    ///
    /// Pending chunks are resolved in one batch and the table is rebuilt with
    /// freshly derived domains. A fully materialized table keeps its chunks
    /// and only gains pins.
    pub async fn compute(self, scheduler: &Scheduler) -> Result<Self> {
        let table = if self.has_pending() {
            info!(
                "Computing {} pending chunks",
                self.chunks.iter().filter(|c| c.is_pending()).count()
            );
            TableBuilder::new(self.chunks)
                .pkey(self.pkey)
                .build(scheduler)
                .await?
        } else {
            self
        };
        Ok(table.persist(scheduler))
    }

    fn persist(mut self, scheduler: &Scheduler) -> Self {
        let mut pinned = 0;
        for chunk in &mut self.chunks {
            if let ChunkHandle::Materialized(chunk) = chunk {
                if !chunk.is_persisted() {
                    let guard = scheduler.store().pin(chunk.id(), Arc::clone(chunk.table()));
                    chunk.set_pin(guard);
                    pinned += 1;
                }
            }
        }
        debug!("Pinned {} chunks", pinned);
        self
    }

    /// Merge all chunks into one local table, later chunks winning on key
    /// collisions.
    pub async fn collect(&self, scheduler: &Scheduler) -> Result<Arc<LocalTable>> {
        self.collect_with(scheduler, &Aggregate::default()).await
    }

    /// Merge all chunks into one local table, combining colliding rows with
    /// `aggregate`. Pending chunks are resolved as part of the same reduction.
    pub async fn collect_with(
        &self,
        scheduler: &Scheduler,
        aggregate: &Aggregate,
    ) -> Result<Arc<LocalTable>> {
        if self.chunks.is_empty() {
            return Err(TableError::EmptyTable);
        }
        let collected = merge_tree(scheduler, aggregate, self.chunks.clone()).await?;
        info!(
            "Collected {} chunks into {} rows",
            self.num_chunks(),
            collected.num_rows()
        );
        Ok(collected)
    }

    /// Total number of rows, or `None` if any chunk's count is unknown.
    pub fn row_count(&self) -> Option<usize> {
        self.domains.iter().map(|d| d.row_count).sum()
    }

    /// Total number of rows. Never evaluates anything.
    pub fn length(&self) -> Result<usize> {
        self.row_count().ok_or_else(|| TableError::UnknownLength {
            unknown_chunks: self
                .domains
                .iter()
                .filter(|d| d.row_count.is_none())
                .count(),
        })
    }

    /// Drop this table's pins now and return how many it held.
    ///
    /// Clones share pins; a chunk is unpinned once the last clone holding
    /// it releases or drops.
    pub fn release(mut self) -> usize {
        let released = self
            .chunks
            .iter_mut()
            .filter_map(|chunk| match chunk {
                ChunkHandle::Materialized(chunk) => chunk.take_pin(),
                ChunkHandle::Pending(_) => None,
            })
            .count();
        debug!("Released {} pins", released);
        released
    }

    /// Lazily apply `f` to every chunk.
    ///
    /// `f` must preserve key order, must not produce keys outside the chunk's
    /// domain, and must keep the column names. The result has only pending
    /// chunks; its row counts are known only when `keeps_lengths` is set.
    pub fn map_chunks<F>(&self, f: F, keeps_lengths: bool) -> DistributedTable
    where
        F: Fn(&LocalTable) -> anyhow::Result<LocalTable> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let chunks = self
            .chunks
            .iter()
            .map(|chunk| {
                let f = Arc::clone(&f);
                let task = match chunk {
                    ChunkHandle::Materialized(chunk) => {
                        let input = Arc::clone(chunk.table());
                        Task::new(async move { f(&input) })
                    }
                    ChunkHandle::Pending(upstream) => {
                        let upstream = upstream.output();
                        Task::new(async move {
                            let input = upstream.await?;
                            f(&input)
                        })
                    }
                };
                ChunkHandle::Pending(task)
            })
            .collect();

        let domains = self
            .domains
            .iter()
            .map(|d| {
                if keeps_lengths {
                    d.clone()
                } else {
                    d.without_row_count()
                }
            })
            .collect();

        DistributedTable {
            pkey: self.pkey.clone(),
            schema: Arc::clone(&self.schema),
            key_schema: Arc::clone(&self.key_schema),
            domains,
            chunks,
        }
    }
}
