//! Transaction-level tests: locking, deadlock handling, commit and abort.

use heapstore::recovery::LogFile;
use heapstore::{
    Database, DatabaseConfig, Error, Field, FieldDef, FieldType, LockMode, PageId, Result,
    TableId, Tuple, TupleDesc,
};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::{tempdir, TempDir};

const PAGE_SIZE: usize = 256;

fn create_db(pool_pages: usize) -> (Database, TempDir) {
    let dir = tempdir().unwrap();
    let log = Arc::new(LogFile::create(dir.path().join("wal.log")).unwrap());
    let config = DatabaseConfig::default()
        .with_pool_pages(pool_pages)
        .with_page_size(PAGE_SIZE);
    (Database::new(config, log), dir)
}

fn int_table(db: &Database, dir: &TempDir, pages: u32) -> TableId {
    let table = db
        .catalog()
        .create_table(
            "ints",
            dir.path().join("ints.dat"),
            TupleDesc::from_types(&[FieldType::Int]),
        )
        .unwrap();
    let file = db.catalog().table(table).unwrap();
    for _ in 0..pages {
        file.append_empty_page().unwrap();
    }
    table
}

fn int_values(db: &Database, table: TableId) -> Vec<i32> {
    let txn = db.begin();
    let mut values: Vec<i32> = txn
        .scan(table)
        .unwrap()
        .map(|t| match t.unwrap().fields()[0] {
            Field::Int(v) => v,
            _ => unreachable!(),
        })
        .collect();
    txn.commit().unwrap();
    values.sort();
    values
}

#[test]
fn test_insert_scan_round_trip() {
    let (db, dir) = create_db(8);
    let desc = TupleDesc::new(vec![
        FieldDef::new("id", FieldType::Int),
        FieldDef::new("name", FieldType::Text),
    ]);
    let table = db
        .catalog()
        .create_table("people", dir.path().join("people.dat"), desc)
        .unwrap();

    let txn = db.begin();
    let rid = txn
        .insert_tuple(table, Tuple::new(vec![Field::Int(42), Field::from("ada")]))
        .unwrap();
    assert_eq!(rid.page_id, PageId::new(table, 0));

    let tuples: Vec<Tuple> = txn.scan(table).unwrap().collect::<Result<_>>().unwrap();
    assert_eq!(tuples.len(), 1);
    assert_eq!(tuples[0].fields(), &[Field::Int(42), Field::from("ada")]);
    assert_eq!(tuples[0].record_id(), Some(rid));
    txn.commit().unwrap();
}

#[test]
fn test_schema_mismatch_rejected() {
    let (db, dir) = create_db(8);
    let table = int_table(&db, &dir, 0);

    let txn = db.begin();
    let err = txn
        .insert_tuple(table, Tuple::new(vec![Field::from("not an int")]))
        .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)));
}

#[test]
fn test_delete_then_scan() {
    let (db, dir) = create_db(8);
    let table = int_table(&db, &dir, 0);

    let txn = db.begin();
    for v in [1, 2, 3] {
        txn.insert_tuple(table, Tuple::new(vec![Field::Int(v)])).unwrap();
    }
    txn.commit().unwrap();

    let txn = db.begin();
    let victim = txn
        .scan(table)
        .unwrap()
        .map(|t| t.unwrap())
        .find(|t| t.fields()[0] == Field::Int(2))
        .unwrap();
    txn.delete_tuple(&victim).unwrap();
    assert!(matches!(txn.delete_tuple(&victim), Err(Error::TupleNotFound)));
    txn.commit().unwrap();

    assert_eq!(int_values(&db, table), vec![1, 3]);
}

#[test]
fn test_delete_out_of_range_page() {
    let (db, dir) = create_db(8);
    let table = int_table(&db, &dir, 1);

    let mut ghost = Tuple::new(vec![Field::Int(1)]);
    ghost.set_record_id(Some(heapstore::RecordId::new(PageId::new(table, 9), 0)));

    let txn = db.begin();
    assert!(matches!(
        txn.delete_tuple(&ghost),
        Err(Error::InvalidPageReference { num_pages: 1, .. })
    ));
    // Nothing was locked or dirtied
    assert!(db.buffer_pool().lock_manager().pages_held(txn.id()).is_empty());
}

#[test]
fn test_abort_rolls_back_in_place_change() {
    let (db, dir) = create_db(8);
    let table = int_table(&db, &dir, 0);

    let txn = db.begin();
    txn.insert_tuple(table, Tuple::new(vec![Field::Int(5)])).unwrap();
    txn.commit().unwrap();

    // Change 5 to 99 directly on the page, then abort
    let txn = db.begin();
    let page = txn.get_page(PageId::new(table, 0), LockMode::Exclusive).unwrap();
    {
        let mut data = page.write().unwrap();
        let old = data.tuples().next().cloned().unwrap();
        data.delete_tuple(&old).unwrap();
        data.insert_tuple(Tuple::new(vec![Field::Int(99)])).unwrap();
    }
    db.buffer_pool()
        .mark_dirty(txn.id(), std::slice::from_ref(&page))
        .unwrap();
    drop(page);
    txn.abort().unwrap();

    assert_eq!(int_values(&db, table), vec![5]);
}

#[test]
fn test_dropped_transaction_aborts() {
    let (db, dir) = create_db(8);
    let table = int_table(&db, &dir, 0);

    let tid = {
        let txn = db.begin();
        txn.insert_tuple(table, Tuple::new(vec![Field::Int(7)])).unwrap();
        txn.id()
    };

    assert!(!db.buffer_pool().lock_manager().is_tracked(tid));
    assert!(int_values(&db, table).is_empty());
}

#[test]
fn test_commit_is_durable() {
    let (db, dir) = create_db(8);
    let table = int_table(&db, &dir, 0);

    let txn = db.begin();
    let rid = txn.insert_tuple(table, Tuple::new(vec![Field::Int(8)])).unwrap();
    let tid = txn.id();
    txn.commit().unwrap();

    let pool = db.buffer_pool();
    assert_eq!(pool.dirty_owner(rid.page_id), None);
    assert!(!pool.holds_lock(tid, rid.page_id));

    let on_disk = db.catalog().table(table).unwrap().read_page(rid.page_id).unwrap();
    let values: Vec<&Field> = on_disk.tuples().map(|t| &t.fields()[0]).collect();
    assert_eq!(values, vec![&Field::Int(8)]);

    let records = LogFile::read_records(dir.path().join("wal.log")).unwrap();
    assert!(records.iter().any(|r| r.tid == tid && r.page_id == rid.page_id));
}

/// A locks X, B locks Y, then each asks for the other's page: exactly one
/// request fails with a deadlock and the survivor commits.
#[test]
fn test_deadlock_exactly_one_victim() {
    let (db, dir) = create_db(8);
    let table = int_table(&db, &dir, 2);
    let x = PageId::new(table, 0);
    let y = PageId::new(table, 1);
    let barrier = Barrier::new(2);

    let outcomes: Vec<bool> = thread::scope(|s| {
        let handles: Vec<_> = [(x, y), (y, x)]
            .into_iter()
            .map(|(mine, theirs)| {
                let db = &db;
                let barrier = &barrier;
                s.spawn(move || {
                    let txn = db.begin();
                    drop(txn.get_page(mine, LockMode::Exclusive).unwrap());
                    barrier.wait();

                    match txn.get_page(theirs, LockMode::Exclusive) {
                        Ok(page) => {
                            drop(page);
                            txn.commit().unwrap();
                            true
                        }
                        Err(e) => {
                            assert!(e.is_transaction_aborted());
                            txn.abort().unwrap();
                            false
                        }
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|&&ok| ok).count(), 1);
    assert_eq!(db.buffer_pool().stats().snapshot().deadlocks, 1);
    let lm = db.buffer_pool().lock_manager();
    assert!(lm.holders(x).is_empty());
    assert!(lm.holders(y).is_empty());
}

/// Concurrent writers retry after deadlocks until every insert lands.
#[test]
fn test_concurrent_inserts() {
    const THREADS: i32 = 4;
    const PER_THREAD: i32 = 20;

    let (db, dir) = create_db(4);
    let table = int_table(&db, &dir, 0);

    thread::scope(|s| {
        for thread_no in 0..THREADS {
            let db = &db;
            s.spawn(move || {
                for i in 0..PER_THREAD {
                    let value = thread_no * PER_THREAD + i;
                    loop {
                        let txn = db.begin();
                        match txn.insert_tuple(table, Tuple::new(vec![Field::Int(value)])) {
                            Ok(_) => {
                                txn.commit().unwrap();
                                break;
                            }
                            Err(e) if e.is_transaction_aborted() => txn.abort().unwrap(),
                            Err(e) => panic!("insert failed: {}", e),
                        }
                    }
                }
            });
        }
    });

    let expected: Vec<i32> = (0..THREADS * PER_THREAD).collect();
    assert_eq!(int_values(&db, table), expected);
}

/// Holders of a page are always all shared or a single exclusive.
#[test]
fn test_lock_holders_never_mixed() {
    const THREADS: u64 = 4;
    const ROUNDS: u64 = 50;

    let (db, dir) = create_db(8);
    let table = int_table(&db, &dir, 3);

    thread::scope(|s| {
        for thread_no in 0..THREADS {
            let db = &db;
            s.spawn(move || {
                for round in 0..ROUNDS {
                    let txn = db.begin();
                    let mix = thread_no * 31 + round * 17;
                    let page_id = PageId::new(table, (mix % 3) as u32);
                    let mode = if mix % 4 == 0 {
                        LockMode::Exclusive
                    } else {
                        LockMode::Shared
                    };

                    if let Ok(page) = txn.get_page(page_id, mode) {
                        let holders = db.buffer_pool().lock_manager().holders(page_id);
                        let exclusive = holders
                            .iter()
                            .filter(|(_, m)| *m == LockMode::Exclusive)
                            .count();
                        assert!(exclusive == 0 || holders.len() == 1, "{:?}", holders);
                        drop(page);
                    }
                    txn.commit().unwrap();
                }
            });
        }
    });
}

#[test]
fn test_unsafe_release_lets_writer_in() {
    let (db, dir) = create_db(8);
    let table = int_table(&db, &dir, 1);
    let page_id = PageId::new(table, 0);
    let pool = db.buffer_pool();

    let reader = db.begin();
    drop(reader.get_page(page_id, LockMode::Shared).unwrap());
    assert!(pool.holds_lock(reader.id(), page_id));

    pool.unsafe_release_page(reader.id(), page_id);
    assert!(!pool.holds_lock(reader.id(), page_id));

    let writer = db.begin();
    assert!(pool
        .lock_manager()
        .try_acquire(writer.id(), page_id, LockMode::Exclusive)
        .unwrap());
    writer.commit().unwrap();
    reader.commit().unwrap();
}
