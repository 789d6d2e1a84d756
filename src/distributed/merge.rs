//! Merging key-sorted chunks.
//!
//! Pairs of chunks are merged by [`merge_pair`], which concatenates when the
//! key ranges are disjoint and falls back to an ordered merge otherwise. Whole
//! tables are reduced with a fixed binary tree: the left subtree always holds
//! the earlier chunks, so the result does not depend on completion order.

use futures::future::{BoxFuture, FutureExt};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::chunk::ChunkHandle;
use crate::error::{Result, TableError};
use crate::scheduler::{Scheduler, TaskFailure};
use crate::table::{Aggregate, LocalTable};

/// How two tables are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePath {
    /// Neither side has a primary key; rows are appended.
    Unkeyed,
    /// The left side has no rows.
    LeftEmpty,
    /// The right side has no rows.
    RightEmpty,
    /// Every left key precedes every right key.
    Concat,
    /// Every right key precedes every left key.
    ConcatReversed,
    /// Key ranges overlap; a full ordered merge is needed.
    Interleave,
}

/// Decide how to merge two tables keyed by the same columns.
pub fn plan_merge(left: &LocalTable, right: &LocalTable) -> MergePath {
    if !left.is_keyed() && !right.is_keyed() {
        return MergePath::Unkeyed;
    }
    let (Some(left_first), Some(left_last)) = (left.first_key(), left.last_key()) else {
        return MergePath::LeftEmpty;
    };
    let (Some(right_first), Some(right_last)) = (right.first_key(), right.last_key()) else {
        return MergePath::RightEmpty;
    };
    if left_last < right_first {
        MergePath::Concat
    } else if right_last < left_first {
        MergePath::ConcatReversed
    } else {
        MergePath::Interleave
    }
}

/// Bring both tables onto one primary key. An unkeyed side takes the other
/// side's key; otherwise the right side is re-keyed to match the left.
fn align_keys<'a>(
    left: &'a LocalTable,
    right: &'a LocalTable,
) -> Result<(Cow<'a, LocalTable>, Cow<'a, LocalTable>)> {
    match (left.is_keyed(), right.is_keyed()) {
        (false, true) => Ok((
            Cow::Owned(left.with_primary_key(right.pkey().as_slice())?),
            Cow::Borrowed(right),
        )),
        (true, false) => Ok((
            Cow::Borrowed(left),
            Cow::Owned(right.with_primary_key(left.pkey().as_slice())?),
        )),
        (true, true) if left.pkey() != right.pkey() => Ok((
            Cow::Borrowed(left),
            Cow::Owned(right.with_primary_key(left.pkey().as_slice())?),
        )),
        _ => Ok((Cow::Borrowed(left), Cow::Borrowed(right))),
    }
}

/// Merge two key-sorted tables, combining rows with equal keys through
/// `aggregate` with `left` taken as the earlier chunk.
pub fn merge_pair(aggregate: &Aggregate, left: &LocalTable, right: &LocalTable) -> Result<LocalTable> {
    let (left, right) = align_keys(left, right)?;
    let path = plan_merge(&left, &right);
    debug!(
        "Merging {} rows with {} rows via {:?}",
        left.num_rows(),
        right.num_rows(),
        path
    );

    match path {
        MergePath::Unkeyed | MergePath::Concat => left.concat(&right),
        MergePath::LeftEmpty => Ok(right.into_owned()),
        MergePath::RightEmpty => Ok(left.into_owned()),
        MergePath::ConcatReversed => right.concat(&left),
        MergePath::Interleave => left.merge_with(&right, aggregate),
    }
}

/// Size of the left subtree when reducing `n >= 2` inputs: the largest power
/// of two strictly below `n`.
pub fn tree_split(n: usize) -> usize {
    debug_assert!(n >= 2);
    1 << (usize::BITS - 1 - (n - 1).leading_zeros())
}

/// Reduce local tables with a balanced merge tree.
pub fn merge_many(aggregate: &Aggregate, mut tables: Vec<LocalTable>) -> Result<LocalTable> {
    match tables.len() {
        0 => Err(TableError::EmptyTable),
        1 => Ok(tables.remove(0)),
        n => {
            let right = tables.split_off(tree_split(n));
            let left = merge_many(aggregate, tables)?;
            let right = merge_many(aggregate, right)?;
            merge_pair(aggregate, &left, &right)
        }
    }
}

/// Reduce chunk handles with a balanced merge tree run on `scheduler`.
///
/// Pending leaves are resolved as scheduler tasks and both halves of every
/// node run concurrently, so merging of ready chunks overlaps with slow
/// resolutions elsewhere in the tree. Permits are only held while a leaf
/// resolves or a merge computes, never while waiting on children.
pub async fn merge_tree(
    scheduler: &Scheduler,
    aggregate: &Aggregate,
    handles: Vec<ChunkHandle>,
) -> Result<Arc<LocalTable>> {
    if handles.is_empty() {
        return Err(TableError::EmptyTable);
    }
    debug!("Reducing {} chunks", handles.len());
    reduce(scheduler.clone(), aggregate.clone(), handles).await
}

fn reduce(
    scheduler: Scheduler,
    aggregate: Aggregate,
    mut handles: Vec<ChunkHandle>,
) -> BoxFuture<'static, Result<Arc<LocalTable>>> {
    async move {
        if handles.len() <= 1 {
            return match handles.pop() {
                None => Err(TableError::EmptyTable),
                Some(ChunkHandle::Materialized(chunk)) => Ok(Arc::clone(chunk.table())),
                Some(ChunkHandle::Pending(task)) => Ok(scheduler.resolve(&task).await?),
            };
        }

        let right = handles.split_off(tree_split(handles.len()));
        let left_half = Subtree::spawn(reduce(scheduler.clone(), aggregate.clone(), handles));
        let right_half = Subtree::spawn(reduce(scheduler.clone(), aggregate.clone(), right));
        // A failed half drops the other one, which aborts it
        let (left, right) = futures::try_join!(left_half.join(), right_half.join())?;

        let merged = scheduler
            .run_bounded("merge", || merge_pair(&aggregate, &left, &right))
            .await??;
        Ok(Arc::new(merged))
    }
    .boxed()
}

/// A spawned half of the merge tree, aborted when dropped before it is joined.
struct Subtree(JoinHandle<Result<Arc<LocalTable>>>);

impl Subtree {
    fn spawn(reduction: BoxFuture<'static, Result<Arc<LocalTable>>>) -> Self {
        Self(tokio::spawn(reduction))
    }

    async fn join(mut self) -> Result<Arc<LocalTable>> {
        (&mut self.0)
            .await
            .map_err(|e| TaskFailure::new("merge", format!("merge task panicked: {}", e)))?
    }
}

impl Drop for Subtree {
    fn drop(&mut self) {
        self.0.abort();
    }
}
