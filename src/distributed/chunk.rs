//! Chunk handles: pending work or materialized data.

use std::sync::Arc;

use crate::scheduler::{ChunkId, PinGuard, Task};
use crate::table::LocalTable;

/// A chunk whose data is in memory.
#[derive(Debug, Clone)]
pub struct MaterializedChunk {
    id: ChunkId,
    table: Arc<LocalTable>,
    pin: Option<Arc<PinGuard>>,
}

impl MaterializedChunk {
    pub fn new(id: ChunkId, table: Arc<LocalTable>) -> Self {
        Self {
            id,
            table,
            pin: None,
        }
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    pub fn table(&self) -> &Arc<LocalTable> {
        &self.table
    }

    /// True if the chunk holds a pin in the scheduler's chunk store.
    pub fn is_persisted(&self) -> bool {
        self.pin.is_some()
    }

    pub(crate) fn set_pin(&mut self, guard: PinGuard) {
        self.pin = Some(Arc::new(guard));
    }

    pub(crate) fn take_pin(&mut self) -> Option<Arc<PinGuard>> {
        self.pin.take()
    }
}

/// Reference to the data of one chunk.
#[derive(Debug, Clone)]
pub enum ChunkHandle {
    /// Not yet computed; resolved through the scheduler.
    Pending(Task),
    /// Computed and held in memory.
    Materialized(MaterializedChunk),
}

impl ChunkHandle {
    /// Wrap an in-memory table as an unpinned chunk.
    pub fn materialized(table: LocalTable) -> Self {
        Self::from_shared(Arc::new(table))
    }

    pub fn from_shared(table: Arc<LocalTable>) -> Self {
        ChunkHandle::Materialized(MaterializedChunk::new(ChunkId::next(), table))
    }

    pub fn pending(task: Task) -> Self {
        ChunkHandle::Pending(task)
    }

    pub fn id(&self) -> ChunkId {
        match self {
            ChunkHandle::Pending(task) => task.id(),
            ChunkHandle::Materialized(chunk) => chunk.id(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ChunkHandle::Pending(_))
    }

    pub fn is_persisted(&self) -> bool {
        match self {
            ChunkHandle::Pending(_) => false,
            ChunkHandle::Materialized(chunk) => chunk.is_persisted(),
        }
    }

    /// The chunk's data, if materialized.
    pub fn table(&self) -> Option<&Arc<LocalTable>> {
        match self {
            ChunkHandle::Pending(_) => None,
            ChunkHandle::Materialized(chunk) => Some(chunk.table()),
        }
    }
}

impl From<LocalTable> for ChunkHandle {
    fn from(table: LocalTable) -> Self {
        ChunkHandle::materialized(table)
    }
}

impl From<Task> for ChunkHandle {
    fn from(task: Task) -> Self {
        ChunkHandle::Pending(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn test_handle_states() {
        let table = LocalTable::from_rows(&["id"], vec![vec![Value::Int(1)]], &["id"]).unwrap();
        let materialized = ChunkHandle::materialized(table.clone());
        assert!(!materialized.is_pending());
        assert!(!materialized.is_persisted());
        assert_eq!(materialized.table().unwrap().num_rows(), 1);

        let task = Task::new(async move { Ok(table) });
        let id = task.id();
        let pending = ChunkHandle::from(task);
        assert!(pending.is_pending());
        assert!(pending.table().is_none());
        assert_eq!(pending.id(), id);
    }
}
