//! End-to-end tree scenarios with degree 2 (at most four keys per node).

use paged_btree::common::PageId;
use paged_btree::heap::Record;
use paged_btree::{write_data_file, Attributes, BTree, Error, Key, TreeConfig};
use tempfile::tempdir;

fn attrs(key: Key) -> Attributes {
    [key as f64 + 1.0, 1.0, 2.0, 3.0, 4.0]
}

fn create_tree(config: TreeConfig) -> (BTree, tempfile::TempDir) {
    paged_btree::logging::init_for_tests();
    let dir = tempdir().unwrap();
    let tree = BTree::create_in(dir.path(), config).unwrap();
    (tree, dir)
}

fn insert_all(tree: &mut BTree, keys: impl IntoIterator<Item = Key>) {
    for key in keys {
        tree.insert(key, attrs(key)).unwrap();
        tree.validate().unwrap();
        assert_eq!(tree.pinned_pages(), 0);
    }
}

// ============================================================================
// Insert: split and compensation
// ============================================================================

#[test]
fn test_fifth_insert_splits_root() {
    let (mut tree, _dir) = create_tree(TreeConfig::default().with_degree(2));

    insert_all(&mut tree, 1..=4);
    assert_eq!(tree.height().unwrap(), 1);
    assert_eq!(tree.index_page_count(), 1);

    insert_all(&mut tree, [5]);
    let shape = tree.validate().unwrap();
    assert_eq!(shape.height, 2);
    // One root key over two leaves.
    assert_eq!(shape.nodes, 3);
    assert_eq!(tree.keys().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_ascending_inserts_compensate_before_splitting() {
    let (mut tree, _dir) = create_tree(TreeConfig::default().with_degree(2));
    insert_all(&mut tree, 1..=9);

    // Key 8 overflows the right leaf; the left leaf has room, so the pair is
    // redistributed instead of split.
    let shape = tree.validate().unwrap();
    assert_eq!(shape.height, 2);
    assert_eq!(shape.nodes, 3);
    assert_eq!(tree.keys().unwrap(), (1..=9).collect::<Vec<_>>());

    for key in 1..=9 {
        assert_eq!(tree.read(key).unwrap(), attrs(key));
    }
}

#[test]
fn test_many_inserts_grow_three_levels() {
    let (mut tree, _dir) = create_tree(TreeConfig::default().with_degree(2));
    insert_all(&mut tree, (1..=60).rev());

    let shape = tree.validate().unwrap();
    assert_eq!(shape.keys, 60);
    assert!(shape.height >= 3);
    assert_eq!(tree.keys().unwrap(), (1..=60).collect::<Vec<_>>());
}

// ============================================================================
// Remove: merge and shrink
// ============================================================================

#[test]
fn test_remove_triggers_merge_and_shrinks() {
    let (mut tree, _dir) = create_tree(TreeConfig::default().with_degree(2));
    insert_all(&mut tree, [10, 20, 30, 40, 50]);
    assert_eq!(tree.height().unwrap(), 2);

    // 30 is the root separator; both leaves hold exactly two keys.
    tree.remove(30).unwrap();
    let shape = tree.validate().unwrap();
    assert_eq!(shape.height, 1);
    assert_eq!(shape.nodes, 1);
    assert_eq!(tree.keys().unwrap(), vec![10, 20, 40, 50]);
    assert!(matches!(tree.read(30), Err(Error::KeyNotFound(30))));

    // The right leaf and the old root went back on the free list.
    assert_eq!(tree.free_list().unwrap().len(), 2);

    // The next split reuses both pages instead of growing the file.
    insert_all(&mut tree, [60]);
    assert_eq!(tree.height().unwrap(), 2);
    assert!(tree.free_list().unwrap().is_empty());
    assert_eq!(tree.index_page_count(), 3);
}

#[test]
fn test_remove_uses_successor_when_predecessor_leaf_is_minimal() {
    let (mut tree, _dir) = create_tree(TreeConfig::default().with_degree(2));
    insert_all(&mut tree, [10, 20, 30, 40, 50, 60]);
    // Leaves [10, 20] and [40, 50, 60] under root [30].

    tree.remove(30).unwrap();
    tree.validate().unwrap();
    assert_eq!(tree.height().unwrap(), 2);
    assert_eq!(tree.keys().unwrap(), vec![10, 20, 40, 50, 60]);
    assert!(tree.free_list().unwrap().is_empty());
}

#[test]
fn test_remove_compensates_from_rich_sibling() {
    let (mut tree, _dir) = create_tree(TreeConfig::default().with_degree(2));
    insert_all(&mut tree, [10, 20, 30, 40, 50, 60]);

    // Left leaf [10, 20] underflows; the right leaf can spare a key.
    tree.remove(10).unwrap();
    let shape = tree.validate().unwrap();
    assert_eq!(shape.height, 2);
    assert_eq!(shape.nodes, 3);
    assert_eq!(tree.keys().unwrap(), vec![20, 30, 40, 50, 60]);
}

#[test]
fn test_remove_everything_in_mixed_order() {
    let (mut tree, _dir) = create_tree(TreeConfig::default().with_degree(2));
    let keys: Vec<Key> = (0..80).map(|i| (i * 37) % 80).collect();
    insert_all(&mut tree, keys.iter().copied());

    for (n, key) in keys.iter().rev().enumerate() {
        tree.remove(*key).unwrap();
        let shape = tree.validate().unwrap();
        assert_eq!(shape.keys, keys.len() - n - 1);
        assert_eq!(tree.pinned_pages(), 0);
    }

    assert!(tree.is_empty());
    assert_eq!(tree.root(), PageId::INVALID);
    assert_eq!(
        tree.free_list().unwrap().len(),
        tree.index_page_count() as usize
    );
}

// ============================================================================
// Records
// ============================================================================

#[test]
fn test_update_with_invalid_attribute_is_rejected() {
    let (mut tree, _dir) = create_tree(TreeConfig::default().with_degree(2));
    insert_all(&mut tree, 1..=9);

    let err = tree.update(5, [-1.0, 1.0, 1.0, 1.0, 1.0]).unwrap_err();
    assert!(matches!(err, Error::InvalidAttribute { index: 0, .. }));
    assert_eq!(tree.read(5).unwrap(), attrs(5));

    tree.update(5, [1.5; 5]).unwrap();
    assert_eq!(tree.read(5).unwrap(), [1.5; 5]);
}

#[test]
fn test_duplicate_insert_changes_nothing() {
    let (mut tree, _dir) = create_tree(TreeConfig::default().with_degree(2));
    insert_all(&mut tree, 1..=9);
    let before = tree.keys().unwrap();

    assert!(matches!(tree.insert(7, [9.0; 5]), Err(Error::DuplicateKey(7))));
    assert_eq!(tree.keys().unwrap(), before);
    assert_eq!(tree.read(7).unwrap(), attrs(7));
    assert_eq!(tree.len(), 9);
}

#[test]
fn test_deleted_slot_is_reused() {
    let (mut tree, _dir) = create_tree(TreeConfig::default().with_degree(2));
    insert_all(&mut tree, 1..=8);
    let slot_of_3 = tree.locate(3).unwrap().unwrap();

    tree.remove(3).unwrap();
    assert!(matches!(tree.read(3), Err(Error::KeyNotFound(3))));

    tree.insert(100, attrs(100)).unwrap();
    let slot_of_100 = tree.locate(100).unwrap().unwrap();
    assert_eq!(
        (slot_of_100.page_id, slot_of_100.slot),
        (slot_of_3.page_id, slot_of_3.slot)
    );
    assert_eq!(tree.data_page_count(), 2);
}

// ============================================================================
// Small pools and persistence
// ============================================================================

#[test]
fn test_minimal_index_pool_never_exhausts() {
    let config = TreeConfig::default()
        .with_degree(1)
        .with_index_pool_pages(3)
        .with_data_pool_pages(1);
    let (mut tree, _dir) = create_tree(config);

    insert_all(&mut tree, (0..120).map(|i| (i * 7) % 120));
    assert!(tree.height().unwrap() >= 4);

    for key in (0..120).step_by(2) {
        tree.remove(key).unwrap();
        tree.validate().unwrap();
    }
    assert_eq!(tree.keys().unwrap(), (1..120).step_by(2).collect::<Vec<_>>());
    assert_eq!(tree.pinned_pages(), 0);
}

#[test]
fn test_build_from_data_file() {
    paged_btree::logging::init_for_tests();
    let dir = tempdir().unwrap();
    let data = dir.path().join("data.dat");
    let index = dir.path().join("index.dat");

    let mut records: Vec<Record> = (1..=30).rev().map(|k| Record::new(k, attrs(k))).collect();
    records.push(Record::new(12, [7.0; 5]));
    assert_eq!(write_data_file(&data, records, 4).unwrap(), 8);

    let config = TreeConfig::default().with_degree(2);
    let tree = BTree::build_from_data_file(config, &data, &index).unwrap();

    assert_eq!(tree.len(), 30);
    assert_eq!(tree.keys().unwrap(), (1..=30).collect::<Vec<_>>());
    // The first copy of key 12 wins.
    assert_eq!(tree.read(12).unwrap(), attrs(12));
    tree.validate().unwrap();

    // The duplicate's slot was given back.
    assert_eq!(tree.free_data_pages(), vec![PageId::new(7)]);
}

#[test]
fn test_flush_persists_records() {
    let dir = tempdir().unwrap();
    let config = TreeConfig::default().with_degree(2);
    {
        let mut tree = BTree::create_in(dir.path(), config).unwrap();
        insert_all(&mut tree, 1..=40);
        tree.remove(17).unwrap();
        tree.update(18, [2.5; 5]).unwrap();
        tree.flush().unwrap();
    }

    let tree = BTree::build_from_data_file(
        config,
        dir.path().join("data.dat"),
        dir.path().join("index-rebuilt.dat"),
    )
    .unwrap();
    assert_eq!(tree.len(), 39);
    assert!(!tree.contains(17).unwrap());
    assert_eq!(tree.read(18).unwrap(), [2.5; 5]);
}

#[test]
fn test_io_stats_per_operation() {
    let config = TreeConfig::default()
        .with_degree(2)
        .with_index_pool_pages(3)
        .with_data_pool_pages(1);
    let (mut tree, _dir) = create_tree(config);
    insert_all(&mut tree, 1..=50);

    tree.reset_io_stats();
    let before = tree.io_stats();
    tree.read(1).unwrap();
    let delta = tree.io_stats().since(&before);

    // A cold read touches at least the leaf and the data page.
    assert!(delta.disk_reads() >= 2);
    assert!(delta.index.disk_reads as usize <= tree.height().unwrap());
}
