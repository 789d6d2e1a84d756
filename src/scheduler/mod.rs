//! Task scheduler for chunk computations.
//!
//! Pending chunks are [`Task`]s: lazily started, shared futures that produce a
//! local table. The [`Scheduler`] runs batches of tasks as one [`TaskGraph`]
//! on the tokio runtime, bounded by `max_parallel` permits, and records every
//! materialized result in its [`ChunkStore`] for as long as some table still
//! holds it.

pub mod memory;

pub use memory::{ChunkId, ChunkStore, PinGuard, StoreMetrics};

use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::SchedulerConfig;
use crate::table::LocalTable;

/// Failure of one scheduled unit of work.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[E4000] {unit} failed: {message}")]
pub struct TaskFailure {
    /// The unit that failed, e.g. `chunk-12` or `merge`.
    pub unit: String,
    pub message: String,
}

impl TaskFailure {
    pub fn new(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            message: message.into(),
        }
    }
}

/// Result of running a task.
pub type TaskOutput = std::result::Result<Arc<LocalTable>, TaskFailure>;

/// A pending unit of work that yields one chunk.
///
/// Tasks are cheap to clone; every clone refers to the same computation,
/// which runs at most once.
#[derive(Clone)]
pub struct Task {
    id: ChunkId,
    output: Shared<BoxFuture<'static, TaskOutput>>,
}

impl Task {
    /// Wrap a future producing a table. Nothing runs until the task is
    /// submitted or resolved.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<LocalTable>> + Send + 'static,
    {
        let id = ChunkId::next();
        let unit = id.to_string();
        let output = async move {
            future
                .await
                .map(Arc::new)
                .map_err(|e| TaskFailure::new(unit, format!("{:#}", e)))
        }
        .boxed()
        .shared();
        Self { id, output }
    }

    /// Wrap a synchronous computation.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<LocalTable> + Send + 'static,
    {
        Self::new(async move { f() })
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Output of the task, if it has already completed.
    pub fn peek(&self) -> Option<TaskOutput> {
        self.output.peek().cloned()
    }

    /// Await the output without taking a scheduler permit. Used by tasks
    /// that depend on other tasks and already hold a permit of their own.
    pub(crate) fn output(&self) -> Shared<BoxFuture<'static, TaskOutput>> {
        self.output.clone()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("done", &self.output.peek().is_some())
            .finish()
    }
}

/// A batch of tasks submitted to the scheduler in one round-trip.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    units: Vec<Task>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.units.push(task);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn ids(&self) -> Vec<ChunkId> {
        self.units.iter().map(Task::id).collect()
    }
}

impl FromIterator<Task> for TaskGraph {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}

/// Executes tasks on a bounded pool of tokio workers.
#[derive(Clone)]
pub struct Scheduler {
    permits: Arc<Semaphore>,
    store: Arc<ChunkStore>,
    max_parallel: usize,
}

impl Scheduler {
    /// Create a scheduler running at most `max_parallel` units at once.
    pub fn new(max_parallel: usize) -> Self {
        let max_parallel = max_parallel.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_parallel)),
            store: Arc::new(ChunkStore::new()),
            max_parallel,
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.max_parallel)
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// The chunk memory manager shared by every table built on this scheduler.
    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    /// Run one task to completion on the current worker.
    pub async fn resolve(&self, task: &Task) -> TaskOutput {
        let output = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| TaskFailure::new(task.id.to_string(), "scheduler closed"))?;
            task.output.clone().await
        };
        match &output {
            Ok(table) => self.store.insert(task.id, table),
            Err(failure) => warn!("Task {} failed: {}", task.id, failure.message),
        }
        output
    }

    /// Run every unit of `graph` concurrently and return their outputs in
    /// graph order.
    ///
    /// All units run to completion; the first failure in graph order is
    /// returned and no partial results are exposed.
    pub async fn submit(&self, graph: TaskGraph) -> Result<Vec<Arc<LocalTable>>, TaskFailure> {
        debug!(
            "Submitting task graph with {} units (max parallel: {})",
            graph.len(),
            self.max_parallel
        );

        let handles: Vec<_> = graph
            .units
            .into_iter()
            .map(|task| {
                let scheduler = self.clone();
                tokio::spawn(async move { scheduler.resolve(&task).await })
            })
            .collect();

        let mut tables = Vec::with_capacity(handles.len());
        let mut failure = None;
        for result in join_all(handles).await {
            match result {
                Ok(Ok(table)) => tables.push(table),
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    failure.get_or_insert(TaskFailure::new("scheduler", format!("task panicked: {}", e)));
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(tables),
        }
    }

    /// Run a CPU-bound step while holding a worker permit.
    pub(crate) async fn run_bounded<T, F>(&self, unit: &str, f: F) -> Result<T, TaskFailure>
    where
        F: FnOnce() -> T,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TaskFailure::new(unit, "scheduler closed"))?;
        Ok(f())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("max_parallel", &self.max_parallel)
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn one_row(id: i64) -> LocalTable {
        LocalTable::from_rows(&["id"], vec![vec![Value::Int(id)]], &["id"]).unwrap()
    }

    #[tokio::test]
    async fn test_submit_preserves_graph_order() {
        let scheduler = Scheduler::new(2);
        let graph: TaskGraph = (0..5)
            .map(|i| Task::new(async move { Ok(one_row(i)) }))
            .collect();
        let ids = graph.ids();

        let tables = scheduler.submit(graph).await.unwrap();
        let firsts: Vec<Value> = tables.iter().map(|t| t.row(0).unwrap()[0].clone()).collect();
        assert_eq!(firsts, (0..5).map(Value::Int).collect::<Vec<_>>());
        assert!(ids.iter().all(|id| scheduler.store().get(*id).is_some()));

        drop(tables);
        assert!(ids.iter().all(|id| scheduler.store().get(*id).is_none()));
        assert_eq!(scheduler.store().metrics().resident, 0);
    }

    #[tokio::test]
    async fn test_submit_reports_failure() {
        let scheduler = Scheduler::new(4);
        let bad = Task::new(async { Err(anyhow::anyhow!("boom")) });
        let bad_id = bad.id();
        let graph: TaskGraph = vec![Task::new(async { Ok(one_row(1)) }), bad]
            .into_iter()
            .collect();

        let err = scheduler.submit(graph).await.unwrap_err();
        assert_eq!(err.unit, bad_id.to_string());
        assert_eq!(err.message, "boom");
    }

    #[tokio::test]
    async fn test_task_runs_once_across_clones() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = Task::from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(one_row(7))
        });
        assert!(task.peek().is_none());

        let scheduler = Scheduler::new(1);
        let graph: TaskGraph = vec![task.clone(), task.clone()].into_iter().collect();
        scheduler.submit(graph).await.unwrap();
        scheduler.resolve(&task).await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(task.peek().is_some());
    }

    #[test]
    fn test_scheduler_clamps_parallelism() {
        assert_eq!(Scheduler::new(0).max_parallel(), 1);
    }
}
