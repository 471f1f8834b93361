use super::*;
use tempfile::tempdir;

#[test]
fn page_round_trips_through_bytes() {
    let mut page = Page::new(3, "DATA");
    page.next_page = 7;
    page.prev_page = 1;
    page.append_tuple(b"hello").unwrap();

    let bytes = page.to_bytes();
    let restored = Page::from_bytes(&bytes).unwrap();
    assert_eq!(restored.page_id, 3);
    assert_eq!(restored.page_type, "DATA");
    assert_eq!(restored.next_page, 7);
    assert_eq!(restored.prev_page, 1);
    assert_eq!(restored.get_tuple(0), Some(&b"hello"[..]));
}

#[test]
fn append_tuple_allocates_from_the_end_and_tracks_free_space() {
    let mut page = Page::new(0, "DATA");
    let before = page.free_space();
    page.append_tuple(b"0123456789").unwrap();
    let after = page.free_space();
    assert!(after < before);
    assert_eq!(page.record_count(), 1);
}

#[test]
fn delete_tuple_tombstones_without_shrinking_slot_count() {
    let mut page = Page::new(0, "DATA");
    page.append_tuple(b"a").unwrap();
    page.append_tuple(b"b").unwrap();
    page.delete_tuple(0).unwrap();
    assert_eq!(page.get_tuple(0), None);
    assert_eq!(page.get_tuple(1), Some(&b"b"[..]));
    assert_eq!(page.record_count(), 1);
    assert_eq!(page.iter_tuples().collect::<Vec<_>>(), vec![&b"b"[..]]);
}

#[test]
fn appending_past_capacity_fails() {
    let mut page = Page::new(0, "DATA");
    let big = vec![0u8; PAGE_SIZE];
    assert!(page.append_tuple(&big).is_err());
}

#[test]
fn pin_unpin_tracks_pinned_state() {
    let mut page = Page::new(0, "DATA");
    assert!(!page.is_pinned());
    page.pin();
    page.pin();
    assert!(page.is_pinned());
    page.unpin();
    assert!(page.is_pinned());
    page.unpin();
    assert!(!page.is_pinned());
}

#[test]
fn disk_manager_allocates_pages_at_sequential_offsets() {
    let dir = tempdir().unwrap();
    let mut disk = DiskManager::open(&dir.path().join("db.pages")).unwrap();

    let first = disk.allocate_page().unwrap();
    let second = disk.allocate_page().unwrap();
    assert_eq!(first, 0);
    assert_eq!(second, 1);
    assert_eq!(disk.size_in_bytes().unwrap(), 2 * PAGE_SIZE as u64);
}

#[test]
fn disk_manager_write_then_read_round_trips() {
    let dir = tempdir().unwrap();
    let mut disk = DiskManager::open(&dir.path().join("db.pages")).unwrap();
    let id = disk.allocate_page().unwrap();

    let mut page = Page::new(id as u32, "DATA");
    page.append_tuple(b"payload").unwrap();
    disk.write_page(id, &page.to_bytes()).unwrap();

    let bytes = disk.read_page(id).unwrap().unwrap();
    let restored = Page::from_bytes(&bytes).unwrap();
    assert_eq!(restored.get_tuple(0), Some(&b"payload"[..]));
}

#[test]
fn disk_manager_read_beyond_file_is_absent() {
    let dir = tempdir().unwrap();
    let mut disk = DiskManager::open(&dir.path().join("db.pages")).unwrap();
    assert!(disk.read_page(5).unwrap().is_none());
}

#[test]
fn reopening_pads_to_a_page_boundary() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.pages");
    {
        let mut disk = DiskManager::open(&path).unwrap();
        disk.allocate_page().unwrap();
    }
    std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap()
        .write_all(b"stray")
        .unwrap();

    let disk = DiskManager::open(&path).unwrap();
    assert_eq!(disk.size_in_bytes().unwrap() % PAGE_SIZE as u64, 0);
}
