//! Assembling distributed tables from chunk handles.

use std::sync::Arc;
use tracing::{debug, info};

use super::chunk::{ChunkHandle, MaterializedChunk};
use super::index_space::{derive_domain, ChunkDomain};
use super::table::DistributedTable;
use crate::error::{ErrorCode, Result, TableError};
use crate::scheduler::{Scheduler, TaskGraph};
use crate::table::Schema;

/// Builds a [`DistributedTable`] from an arbitrary list of chunk handles.
///
/// Domains and primary key may be supplied; otherwise they are derived from
/// the chunks themselves.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    chunks: Vec<ChunkHandle>,
    domains: Option<Vec<ChunkDomain>>,
    pkey: Option<Vec<String>>,
}

impl TableBuilder {
    pub fn new(chunks: Vec<ChunkHandle>) -> Self {
        Self {
            chunks,
            domains: None,
            pkey: None,
        }
    }

    /// Use precomputed domains, one per chunk.
    pub fn domains(mut self, domains: Vec<ChunkDomain>) -> Self {
        self.domains = Some(domains);
        self
    }

    /// Use an explicit primary key. Chunks keyed differently are re-keyed.
    pub fn pkey<S: Into<String>>(mut self, pkey: impl IntoIterator<Item = S>) -> Self {
        self.pkey = Some(pkey.into_iter().map(Into::into).collect());
        self
    }

    /// Resolve pending chunks through `scheduler` in a single batch, then
    /// assemble the table.
    pub async fn build(self, scheduler: &Scheduler) -> Result<DistributedTable> {
        self.ensure_chunks()?;

        let graph: TaskGraph = self
            .chunks
            .iter()
            .filter_map(|chunk| match chunk {
                ChunkHandle::Pending(task) => Some(task.clone()),
                ChunkHandle::Materialized(_) => None,
            })
            .collect();

        if graph.is_empty() {
            return self.assemble();
        }

        info!("Resolving {} pending chunks in one batch", graph.len());
        let mut resolved = scheduler.submit(graph).await?.into_iter();
        let chunks = self
            .chunks
            .into_iter()
            .map(|chunk| match chunk {
                ChunkHandle::Pending(task) => resolved
                    .next()
                    .map(|table| ChunkHandle::Materialized(MaterializedChunk::new(task.id(), table)))
                    .ok_or_else(|| TableError::construction("scheduler returned too few results")),
                materialized => Ok(materialized),
            })
            .collect::<Result<Vec<_>>>()?;

        Self { chunks, ..self }.assemble()
    }

    /// Assemble a table whose chunks are all materialized, without a
    /// scheduler round-trip.
    pub fn build_resolved(self) -> Result<DistributedTable> {
        self.ensure_chunks()?;
        if self.chunks.iter().any(ChunkHandle::is_pending) {
            return Err(TableError::construction_with_code(
                ErrorCode::CONSTRUCTION_PENDING_CHUNK,
                "pending chunk requires an async build",
            ));
        }
        self.assemble()
    }

    fn ensure_chunks(&self) -> Result<()> {
        if self.chunks.is_empty() {
            return Err(TableError::construction_with_code(
                ErrorCode::CONSTRUCTION_NO_CHUNKS,
                "need at least one chunk",
            ));
        }
        if let Some(domains) = &self.domains {
            if domains.len() != self.chunks.len() {
                return Err(TableError::construction_with_code(
                    ErrorCode::CONSTRUCTION_DOMAIN_MISMATCH,
                    format!(
                        "{} domains supplied for {} chunks",
                        domains.len(),
                        self.chunks.len()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn assemble(self) -> Result<DistributedTable> {
        let mut materialized = Vec::with_capacity(self.chunks.len());
        for chunk in self.chunks {
            let ChunkHandle::Materialized(chunk) = chunk else {
                return Err(TableError::construction_with_code(
                    ErrorCode::CONSTRUCTION_PENDING_CHUNK,
                    "chunk left unresolved",
                ));
            };
            materialized.push(chunk);
        }

        let pkey = match self.pkey {
            Some(pkey) => pkey,
            None => materialized
                .first()
                .map(|chunk| chunk.table().pkey())
                .unwrap_or_default(),
        };

        let chunks = materialized
            .into_iter()
            .map(|chunk| {
                if chunk.table().pkey() == pkey {
                    return Ok(chunk);
                }
                debug!("Re-keying {} by ({})", chunk.id(), pkey.join(", "));
                let rekeyed = chunk.table().with_primary_key(pkey.as_slice())?;
                Ok(MaterializedChunk::new(chunk.id(), Arc::new(rekeyed)))
            })
            .collect::<Result<Vec<_>>>()?;

        let domains = match self.domains {
            Some(domains) => domains,
            None => chunks
                .iter()
                .map(|chunk| derive_domain(chunk.table()).1)
                .collect(),
        };

        let (schema, key_schema) = promote_schemas(&chunks, &pkey)?;

        let total = chunks.len();
        let (domains, chunks): (Vec<_>, Vec<_>) = domains
            .into_iter()
            .zip(chunks)
            .filter_map(|(domain, chunk)| {
                domain
                    .into_space()
                    .map(|space| (space, ChunkHandle::Materialized(chunk)))
            })
            .unzip();

        info!(
            "Built distributed table keyed by ({}) with {} chunks ({} empty dropped)",
            pkey.join(", "),
            chunks.len(),
            total - chunks.len()
        );
        Ok(DistributedTable::from_parts(
            pkey, schema, key_schema, domains, chunks,
        ))
    }
}

/// Promote row and key schemas across every chunk.
fn promote_schemas(chunks: &[MaterializedChunk], pkey: &[String]) -> Result<(Schema, Schema)> {
    let mut row_schema: Option<Schema> = None;
    let mut key_schema: Option<Schema> = None;

    for chunk in chunks {
        let table = chunk.table();
        let key_indices = pkey
            .iter()
            .map(|name| table.schema().index_of(name))
            .collect::<Result<Vec<_>>>()?;
        let chunk_key_schema = table.schema().project(&key_indices);

        row_schema = Some(match row_schema {
            Some(acc) => acc.promote(table.schema())?,
            None => table.schema().as_ref().clone(),
        });
        key_schema = Some(match key_schema {
            Some(acc) => acc.promote(&chunk_key_schema)?,
            None => chunk_key_schema,
        });
    }

    Ok((row_schema.unwrap_or_default(), key_schema.unwrap_or_default()))
}

/// Build a table from chunk handles, resolving pending ones in one batch.
pub async fn from_chunks(
    scheduler: &Scheduler,
    chunks: Vec<ChunkHandle>,
) -> Result<DistributedTable> {
    TableBuilder::new(chunks).build(scheduler).await
}
