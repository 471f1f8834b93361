use super::*;
use tempfile::tempdir;
use types::Value;

fn pool(dir: &std::path::Path, capacity: usize) -> BufferPool {
    let disk = DiskManager::open(&dir.join("db.pages")).unwrap();
    BufferPool::new(disk, capacity)
}

#[test]
fn allocate_pin_write_unpin_round_trips() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 4);

    let id = pool.allocate_page("DATA").unwrap();
    {
        let page = pool.pin_page(id).unwrap();
        page.append_tuple(b"hello").unwrap();
    }
    pool.unpin_page(id, true).unwrap();
    pool.flush_all().unwrap();

    let page = pool.get_page(id).unwrap();
    assert_eq!(page.get_tuple(0), Some(&b"hello"[..]));
}

#[test]
fn capacity_one_alternating_access_evicts_every_time() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 1);
    let a = pool.allocate_page("DATA").unwrap();
    pool.unpin_page(a, false).unwrap();
    let b = pool.allocate_page("DATA").unwrap();
    pool.unpin_page(b, false).unwrap();

    for _ in 0..3 {
        pool.get_page(a).unwrap();
        pool.unpin_page(a, false).unwrap();
        pool.get_page(b).unwrap();
        pool.unpin_page(b, false).unwrap();
    }

    let stats = pool.stats();
    assert!(stats.evictions >= 6);
    assert!(stats.misses >= 6);
}

#[test]
fn pinned_pages_are_never_evicted() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 1);
    let a = pool.allocate_page("DATA").unwrap();
    pool.pin_page(a).unwrap();

    let b = pool.allocate_page("DATA");
    assert!(b.is_err());
}

#[test]
fn lru_policy_evicts_least_recently_used() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 2);
    let a = pool.allocate_page("DATA").unwrap();
    pool.unpin_page(a, false).unwrap();
    let b = pool.allocate_page("DATA").unwrap();
    pool.unpin_page(b, false).unwrap();

    // touch `a` so `b` becomes the least-recently-used page.
    pool.get_page(a).unwrap();
    pool.unpin_page(a, false).unwrap();

    let c = pool.allocate_page("DATA").unwrap();
    pool.unpin_page(c, false).unwrap();

    assert!(pool.get_page(a).is_ok());
    assert!(pool.get_page(c).is_ok());
}

#[test]
fn table_heap_scan_observes_inserted_rows() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 8);
    let mut heap = TableHeap::new(vec![]);

    heap.insert(&mut pool, &Row::new(vec![Value::Int(1), Value::Text("a".into())]))
        .unwrap();
    heap.insert(&mut pool, &Row::new(vec![Value::Int(2), Value::Text("b".into())]))
        .unwrap();

    let rows = heap.scan(&mut pool).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].values[0], Value::Int(1));
}

#[test]
fn table_heap_delete_without_predicate_empties_table() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 8);
    let mut heap = TableHeap::new(vec![]);
    for i in 0..5 {
        heap.insert(&mut pool, &Row::new(vec![Value::Int(i)])).unwrap();
    }

    let deleted = heap.delete(&mut pool, |_| true).unwrap();
    assert_eq!(deleted, 5);
    assert_eq!(heap.scan(&mut pool).unwrap().len(), 0);
}

#[test]
fn table_heap_update_rewrites_matching_rows() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 8);
    let mut heap = TableHeap::new(vec![]);
    for i in 0..3 {
        heap.insert(&mut pool, &Row::new(vec![Value::Int(i)])).unwrap();
    }

    let updated = heap
        .update(&mut pool, |r| r.values[0] == Value::Int(1), |_| Row::new(vec![Value::Int(99)]))
        .unwrap();
    assert_eq!(updated, 1);

    let rows = heap.scan(&mut pool).unwrap();
    assert!(rows.iter().any(|r| r.values[0] == Value::Int(99)));
    assert!(!rows.iter().any(|r| r.values[0] == Value::Int(1)));
}

#[test]
fn allocating_a_new_page_grows_the_backing_file() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path(), 8);
    let id = pool.allocate_page("DATA").unwrap();
    pool.unpin_page(id, true).unwrap();
    pool.flush_all().unwrap();

    let bytes = std::fs::metadata(dir.path().join("db.pages")).unwrap().len();
    assert_eq!(bytes, storage::PAGE_SIZE as u64 * (id + 1));
}
