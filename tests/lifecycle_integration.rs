//! End-to-end behavior of distributed tables through the public API.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{id_table, pairs_of, pairs_table};
use disttable::distributed::{merge_pair, plan_merge, MergePath};
use disttable::error::ErrorCode;
use disttable::table::DataType;
use disttable::{
    distribute, from_chunks, Aggregate, ChunkHandle, Partitioning, Scheduler, Task, TableBuilder,
    TableError,
};

fn counting_aggregate() -> (Aggregate, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let aggregate = Aggregate::custom(move |_, right| {
        counter.fetch_add(1, Ordering::SeqCst);
        right.to_vec()
    });
    (aggregate, calls)
}

#[tokio::test]
async fn test_disjoint_chunks_take_fast_path() {
    let scheduler = Scheduler::new(2);
    let table = from_chunks(
        &scheduler,
        vec![id_table(1..=5).into(), id_table(6..=10).into()],
    )
    .await
    .unwrap();
    assert!(table.is_ordered());

    let (aggregate, calls) = counting_aggregate();
    let collected = table.collect_with(&scheduler, &aggregate).await.unwrap();

    assert_eq!(pairs_of(&collected), pairs_of(&id_table(1..=10)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_duplicate_key_keeps_later_chunk() {
    let scheduler = Scheduler::new(2);
    let table = from_chunks(
        &scheduler,
        vec![
            pairs_table(&[(1, 1), (3, 3), (5, 50)]).into(),
            pairs_table(&[(5, 99), (7, 7)]).into(),
        ],
    )
    .await
    .unwrap();
    assert!(!table.is_ordered());

    let collected = table.collect(&scheduler).await.unwrap();
    let fives: Vec<_> = pairs_of(&collected)
        .into_iter()
        .filter(|(k, _)| *k == 5)
        .collect();
    assert_eq!(fives, vec![(5, 99)]);
    assert_eq!(collected.num_rows(), 4);
}

#[tokio::test]
async fn test_later_chunk_wins_even_when_it_finishes_first() {
    let scheduler = Scheduler::new(4);
    let slow = Task::new(async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Ok(pairs_table(&[(1, 1)]))
    });
    let fast = Task::new(async { Ok(pairs_table(&[(1, 2)])) });
    let table = TableBuilder::new(vec![slow.into(), fast.into()])
        .build(&scheduler)
        .await
        .unwrap();

    let collected = table.collect(&scheduler).await.unwrap();
    assert_eq!(pairs_of(&collected), vec![(1, 2)]);
}

#[tokio::test]
async fn test_from_no_chunks_fails() {
    let err = from_chunks(&Scheduler::new(1), vec![]).await.unwrap_err();
    assert!(matches!(err, TableError::Construction { .. }));
    assert_eq!(err.code(), ErrorCode::CONSTRUCTION_NO_CHUNKS);
}

#[tokio::test]
async fn test_distribute_collect_round_trip() {
    let scheduler = Scheduler::new(3);
    let source = id_table(1..=7);
    for n in [1, 2, 10] {
        let table = distribute(&source, &Partitioning::Chunks(n)).unwrap();
        assert_eq!(table.length().unwrap(), 7);
        let collected = table.collect(&scheduler).await.unwrap();
        assert_eq!(pairs_of(&collected), pairs_of(&source), "chunks = {}", n);
    }
}

#[tokio::test]
async fn test_length_unknown_until_compute() {
    let scheduler = Scheduler::new(2);
    let table = distribute(&id_table(1..=6), &Partitioning::Chunks(3)).unwrap();
    let filtered = table.map_chunks(
        |chunk| {
            let rows = chunk
                .rows()
                .filter(|row| row[0] != disttable::Value::Int(4))
                .collect();
            Ok(disttable::LocalTable::from_rows(&["id", "value"], rows, &["id"])?)
        },
        false,
    );

    assert!(matches!(
        filtered.length(),
        Err(TableError::UnknownLength { unknown_chunks: 3 })
    ));
    let computed = filtered.compute(&scheduler).await.unwrap();
    assert_eq!(computed.length().unwrap(), 5);
}

#[tokio::test]
async fn test_compute_pins_until_release() {
    let scheduler = Scheduler::new(2);
    let computed = distribute(&id_table(1..=4), &Partitioning::Chunks(2))
        .unwrap()
        .compute(&scheduler)
        .await
        .unwrap();
    let ids: Vec<_> = computed.chunks().iter().map(ChunkHandle::id).collect();

    assert_eq!(scheduler.store().metrics().pinned, 2);
    assert_eq!(scheduler.store().evict_unpinned(), 0);

    assert_eq!(computed.release(), 2);
    assert!(ids.iter().all(|id| scheduler.store().pin_count(*id) == 0));
    assert_eq!(scheduler.store().metrics().resident, 0);
}

#[tokio::test]
async fn test_repeated_collects_do_not_grow_store() {
    let scheduler = Scheduler::new(2);
    for round in 0..50 {
        let pending = Task::new(async move { Ok(pairs_table(&[(round, round)])) });
        let table = from_chunks(&scheduler, vec![pending.into()]).await.unwrap();
        let collected = table.collect(&scheduler).await.unwrap();
        assert_eq!(pairs_of(&collected), vec![(round, round)]);
    }

    let metrics = scheduler.store().metrics();
    assert_eq!(metrics.resident, 0);
    assert_eq!(metrics.pinned, 0);
}

#[tokio::test]
async fn test_dropping_computed_table_frees_store() {
    let scheduler = Scheduler::new(2);
    let pending = Task::new(async { Ok(id_table(1..=3)) });
    let computed = TableBuilder::new(vec![pending.into(), id_table(4..=6).into()])
        .build(&scheduler)
        .await
        .unwrap()
        .compute(&scheduler)
        .await
        .unwrap();
    assert_eq!(scheduler.store().metrics().resident, 2);

    drop(computed);
    assert_eq!(scheduler.store().metrics().resident, 0);
}

#[tokio::test]
async fn test_failing_chunk_is_upstream_error() {
    let scheduler = Scheduler::new(2);
    let chunks = vec![
        ChunkHandle::from(id_table(1..=3)),
        ChunkHandle::from(Task::new(async { Err(anyhow::anyhow!("source offline")) })),
    ];
    let err = from_chunks(&scheduler, chunks).await.unwrap_err();
    match err {
        TableError::UpstreamCompute(failure) => {
            assert_eq!(failure.message, "source offline");
            assert!(failure.unit.starts_with("chunk-"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_type_promotion_across_chunks() {
    let scheduler = Scheduler::new(2);
    let floats = disttable::LocalTable::from_rows(
        &["id", "value"],
        vec![vec![disttable::Value::Int(9), disttable::Value::Float(2.5)]],
        &["id"],
    )
    .unwrap();
    let table = from_chunks(&scheduler, vec![id_table(1..=2).into(), floats.into()])
        .await
        .unwrap();
    assert_eq!(table.schema().fields()[1].data_type, DataType::Float);

    let collected = table.collect(&scheduler).await.unwrap();
    assert_eq!(collected.row(0).unwrap()[1], disttable::Value::Float(10.0));

    let strings = disttable::LocalTable::from_rows(
        &["id", "value"],
        vec![vec![disttable::Value::Int(9), disttable::Value::str("n/a")]],
        &["id"],
    )
    .unwrap();
    let err = from_chunks(&scheduler, vec![id_table(1..=2).into(), strings.into()])
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PROMOTION_GENERIC);
}

#[test]
fn test_plan_merge_is_observable() {
    let left = id_table(1..=3);
    let right = id_table(4..=6);
    assert_eq!(plan_merge(&left, &right), MergePath::Concat);
    let merged = merge_pair(&Aggregate::default(), &right, &left).unwrap();
    assert_eq!(pairs_of(&merged), pairs_of(&id_table(1..=6)));
}
