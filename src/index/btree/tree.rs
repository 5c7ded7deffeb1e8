//! Tree handle - whole-tree operations over the index and the data heap.

use std::fmt;
use std::path::Path;

use log::{debug, info, warn};

use super::rebalance::{self, Descent};
use super::store::NodeStore;
use super::validate::{self, TreeShape};
use crate::buffer::StatsSnapshot;
use crate::common::config::{DATA_FILE_NAME, INDEX_FILE_NAME};
use crate::common::{Error, Key, Locator, PageId, Result, TreeConfig};
use crate::heap::{validate_attributes, Attributes, Record, RecordHeap};

/// A B-tree mapping keys to records in a separate data heap.
///
/// Nodes hold [`Locator`]s, so the tree never touches record payloads;
/// reads and updates follow the locator into the heap.
///
/// # Example
/// ```no_run
/// use paged_btree::{BTree, TreeConfig};
///
/// let mut tree = BTree::create_in("/tmp/btree", TreeConfig::default())?;
/// tree.insert(7, [1.0, 2.0, 3.0, 4.0, 5.0])?;
/// assert_eq!(tree.read(7)?, [1.0, 2.0, 3.0, 4.0, 5.0]);
/// tree.remove(7)?;
/// tree.flush()?;
/// # Ok::<(), paged_btree::Error>(())
/// ```
pub struct BTree {
    config: TreeConfig,
    store: NodeStore,
    heap: RecordHeap,
    /// `INVALID` exactly when the tree is empty.
    root: PageId,
    len: usize,
}

impl BTree {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Create an empty tree, truncating both files.
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(
        config: TreeConfig,
        index_path: P,
        data_path: Q,
    ) -> Result<Self> {
        config.validate()?;
        let store = NodeStore::create(index_path, config.degree, config.index_pool_pages)?;
        let heap = RecordHeap::create(data_path, config.records_per_page, config.data_pool_pages)?;
        Ok(Self::with_parts(config, store, heap))
    }

    /// Create an empty tree with the default file names inside `dir`.
    pub fn create_in<P: AsRef<Path>>(dir: P, config: TreeConfig) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        Self::create(config, dir.join(INDEX_FILE_NAME), dir.join(DATA_FILE_NAME))
    }

    /// Index an existing data file from scratch.
    ///
    /// Every occupied slot is inserted in file order. A record whose key is
    /// already indexed is skipped and its slot freed.
    pub fn build_from_data_file<P: AsRef<Path>, Q: AsRef<Path>>(
        config: TreeConfig,
        data_path: P,
        index_path: Q,
    ) -> Result<Self> {
        config.validate()?;
        let heap = RecordHeap::open(&data_path, config.records_per_page, config.data_pool_pages)?;
        let store = NodeStore::create(index_path, config.degree, config.index_pool_pages)?;
        let mut tree = Self::with_parts(config, store, heap);

        let mut skipped = 0usize;
        for locator in tree.heap.scan()? {
            match tree.insert_locator(locator) {
                Ok(()) => {}
                Err(Error::DuplicateKey(key)) => {
                    warn!("skipping duplicate key {} at {}", key, locator);
                    tree.heap.free(&locator)?;
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "built index over {}: {} keys, {} duplicates skipped, height {}",
            data_path.as_ref().display(),
            tree.len,
            skipped,
            tree.height()?
        );
        Ok(tree)
    }

    fn with_parts(config: TreeConfig, store: NodeStore, heap: RecordHeap) -> Self {
        Self {
            config,
            store,
            heap,
            root: PageId::INVALID,
            len: 0,
        }
    }

    // ========================================================================
    // Record operations
    // ========================================================================

    /// Store a new record.
    ///
    /// # Errors
    /// `InvalidKey` / `InvalidAttribute` before anything is touched,
    /// `DuplicateKey` if the key is already present.
    pub fn insert(&mut self, key: Key, attributes: Attributes) -> Result<()> {
        let record = Record::new(key, attributes);
        record.validate()?;

        let leaf = match self.descend(key)? {
            Some(Descent::Found { .. }) => return Err(Error::DuplicateKey(key)),
            Some(Descent::Absent { leaf }) => Some(leaf),
            None => None,
        };
        let locator = self.heap.allocate(record)?;
        let (leaf, overflown) = match self.land(leaf, locator) {
            Ok(landed) => landed,
            Err(err) => {
                self.heap.free(&locator)?;
                return Err(err);
            }
        };
        self.len += 1;
        self.settle(leaf, overflown)
    }

    /// Attributes of the record under `key`.
    pub fn read(&self, key: Key) -> Result<Attributes> {
        let locator = self.locate(key)?.ok_or(Error::KeyNotFound(key))?;
        Ok(self.heap.read(&locator)?.attributes)
    }

    /// Replace a record's attributes. The record stays where it is.
    pub fn update(&mut self, key: Key, attributes: Attributes) -> Result<()> {
        validate_attributes(&attributes)?;
        let locator = self.locate(key)?.ok_or(Error::KeyNotFound(key))?;
        self.heap.update(&locator, attributes)
    }

    /// Delete a record and its index entry.
    pub fn remove(&mut self, key: Key) -> Result<()> {
        let (page_id, pos, locator) = match self.descend(key)? {
            Some(Descent::Found {
                page_id,
                pos,
                locator,
            }) => (page_id, pos, locator),
            _ => return Err(Error::KeyNotFound(key)),
        };

        if let Some(root) = rebalance::remove_at(&self.store, page_id, pos)? {
            self.set_root(root);
        }
        self.len -= 1;
        self.heap.free(&locator)?;
        Ok(())
    }

    /// Where the record under `key` lives, if present.
    pub fn locate(&self, key: Key) -> Result<Option<Locator>> {
        match self.descend(key)? {
            Some(Descent::Found { locator, .. }) => Ok(Some(locator)),
            _ => Ok(None),
        }
    }

    pub fn contains(&self, key: Key) -> Result<bool> {
        Ok(self.locate(key)?.is_some())
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Levels from root to leaves, 0 when empty.
    pub fn height(&self) -> Result<usize> {
        let mut height = 0;
        let mut page_id = self.root;
        while page_id.is_valid() {
            height += 1;
            page_id = self.store.read(page_id)?.first_child();
        }
        Ok(height)
    }

    /// All keys in ascending order.
    pub fn keys(&self) -> Result<Vec<Key>> {
        Ok(self.locators()?.iter().map(|l| l.key).collect())
    }

    /// All locators in key order.
    pub fn locators(&self) -> Result<Vec<Locator>> {
        let mut out = Vec::with_capacity(self.len);
        if self.root.is_valid() {
            self.collect(self.root, &mut out)?;
        }
        Ok(out)
    }

    /// Check every structural invariant of the index and that every
    /// locator reaches its record.
    pub fn validate(&self) -> Result<TreeShape> {
        let (shape, locators) = validate::check_tree(&self.store, self.root)?;
        if shape.keys != self.len {
            return Err(Error::inconsistent(format!(
                "tree holds {} keys, {} were counted",
                shape.keys, self.len
            )));
        }
        for locator in &locators {
            self.heap.read(locator)?;
        }

        let free = self.store.free_list()?;
        let live = shape.nodes + free.len();
        if live != self.store.page_count() as usize {
            return Err(Error::inconsistent(format!(
                "{} index pages, {} in the tree and {} free",
                self.store.page_count(),
                shape.nodes,
                free.len()
            )));
        }
        Ok(shape)
    }

    pub fn root(&self) -> PageId {
        self.root
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Pages in the index file, free ones included.
    pub fn index_page_count(&self) -> u32 {
        self.store.page_count()
    }

    /// Pages in the data file.
    pub fn data_page_count(&self) -> u32 {
        self.heap.page_count()
    }

    /// Index pages waiting for reuse, next to be reused first.
    pub fn free_list(&self) -> Result<Vec<PageId>> {
        self.store.free_list()
    }

    /// Data pages with at least one free slot.
    pub fn free_data_pages(&self) -> Vec<PageId> {
        self.heap.free_pages()
    }

    /// Frames pinned in either pool. Zero between operations.
    pub fn pinned_pages(&self) -> usize {
        self.store.pinned_frames() + self.heap.pinned_frames()
    }

    // ========================================================================
    // Durability and I/O counters
    // ========================================================================

    /// Write back every dirty page of both files and sync them.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()?;
        self.heap.flush()?;
        debug!("flushed index and data files");
        Ok(())
    }

    pub fn io_stats(&self) -> IoStats {
        IoStats {
            index: self.store.stats().snapshot(),
            data: self.heap.stats().snapshot(),
        }
    }

    pub fn reset_io_stats(&self) {
        self.store.stats().reset();
        self.heap.stats().reset();
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// `None` for an empty tree.
    fn descend(&self, key: Key) -> Result<Option<Descent>> {
        if !self.root.is_valid() {
            return Ok(None);
        }
        rebalance::descend(&self.store, self.root, key).map(Some)
    }

    /// Index a record that is already in the heap.
    fn insert_locator(&mut self, locator: Locator) -> Result<()> {
        match self.descend(locator.key)? {
            Some(Descent::Found { .. }) => Err(Error::DuplicateKey(locator.key)),
            Some(Descent::Absent { leaf }) => self.place(Some(leaf), locator),
            None => self.place(None, locator),
        }
    }

    /// Put a locator into its leaf, creating the root for an empty tree.
    fn place(&mut self, leaf: Option<PageId>, locator: Locator) -> Result<()> {
        let (leaf, overflown) = self.land(leaf, locator)?;
        self.len += 1;
        self.settle(leaf, overflown)
    }

    /// Insert the entry into its leaf. Returns the leaf and whether it
    /// overflowed.
    fn land(&mut self, leaf: Option<PageId>, locator: Locator) -> Result<(PageId, bool)> {
        let leaf = match leaf {
            Some(leaf) => leaf,
            None => {
                let root = self.store.allocate(PageId::INVALID)?.page_id();
                self.set_root(root);
                root
            }
        };

        let mut node = self.store.write(leaf)?;
        node.insert_entry(locator, None);
        Ok((leaf, node.is_overflown()))
    }

    fn settle(&mut self, leaf: PageId, overflown: bool) -> Result<()> {
        if overflown {
            if let Some(root) = rebalance::resolve_overflow(&self.store, leaf)? {
                self.set_root(root);
            }
        }
        Ok(())
    }

    fn set_root(&mut self, root: PageId) {
        debug!("root {} -> {}", self.root, root);
        self.root = root;
    }

    fn collect(&self, page_id: PageId, out: &mut Vec<Locator>) -> Result<()> {
        let (locators, children) = {
            let node = self.store.read(page_id)?;
            (node.locators().to_vec(), node.children().to_vec())
        };
        if children.is_empty() {
            out.extend_from_slice(&locators);
            return Ok(());
        }
        for (child, locator) in children.iter().zip(&locators) {
            self.collect(*child, out)?;
            out.push(*locator);
        }
        self.collect(children[locators.len()], out)
    }
}

/// Disk traffic of both files since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStats {
    pub index: StatsSnapshot,
    pub data: StatsSnapshot,
}

impl IoStats {
    pub fn disk_reads(&self) -> u64 {
        self.index.disk_reads + self.data.disk_reads
    }

    pub fn disk_writes(&self) -> u64 {
        self.index.disk_writes + self.data.disk_writes
    }

    /// Per-operation delta against an earlier sample.
    pub fn since(&self, earlier: &IoStats) -> IoStats {
        IoStats {
            index: self.index.since(&earlier.index),
            data: self.data.since(&earlier.data),
        }
    }
}

impl fmt::Display for IoStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index [{}], data [{}]", self.index, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn attrs(key: Key) -> Attributes {
        [key as f64 + 1.0, 2.0, 3.0, 4.0, 5.0]
    }

    fn create_test_tree(degree: usize) -> (BTree, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let tree = BTree::create_in(dir.path(), TreeConfig::default().with_degree(degree)).unwrap();
        (tree, dir)
    }

    #[test]
    fn test_empty_tree() {
        let (tree, _dir) = create_test_tree(2);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), PageId::INVALID);
        assert_eq!(tree.height().unwrap(), 0);
        assert!(matches!(tree.read(1), Err(Error::KeyNotFound(1))));
        assert_eq!(tree.validate().unwrap(), TreeShape::default());
    }

    #[test]
    fn test_insert_read_update() {
        let (mut tree, _dir) = create_test_tree(2);
        tree.insert(5, attrs(5)).unwrap();
        assert_eq!(tree.read(5).unwrap(), attrs(5));

        tree.update(5, [9.0; 5]).unwrap();
        assert_eq!(tree.read(5).unwrap(), [9.0; 5]);
        assert!(matches!(tree.update(6, [9.0; 5]), Err(Error::KeyNotFound(6))));
    }

    #[test]
    fn test_duplicate_leaves_tree_unchanged() {
        let (mut tree, _dir) = create_test_tree(2);
        tree.insert(5, attrs(5)).unwrap();
        let pages = tree.data_page_count();

        assert!(matches!(tree.insert(5, [7.0; 5]), Err(Error::DuplicateKey(5))));
        assert_eq!(tree.read(5).unwrap(), attrs(5));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.data_page_count(), pages);
        assert_eq!(tree.free_data_pages(), vec![PageId::new(0)]);
    }

    #[test]
    fn test_invalid_input_rejected_before_mutation() {
        let (mut tree, _dir) = create_test_tree(2);
        assert!(matches!(
            tree.insert(u32::MAX, attrs(1)),
            Err(Error::InvalidKey(_))
        ));
        assert!(matches!(
            tree.insert(1, [1.0, 1.0, 1.0, 0.0, 1.0]),
            Err(Error::InvalidAttribute { index: 3, .. })
        ));
        assert!(tree.is_empty());
        assert_eq!(tree.index_page_count(), 0);
        assert_eq!(tree.data_page_count(), 0);
    }

    #[test]
    fn test_remove_last_key_empties_tree() {
        let (mut tree, _dir) = create_test_tree(2);
        tree.insert(1, attrs(1)).unwrap();
        tree.remove(1).unwrap();

        assert!(tree.is_empty());
        assert_eq!(tree.root(), PageId::INVALID);
        assert_eq!(tree.free_list().unwrap(), vec![PageId::new(0)]);
        assert!(matches!(tree.remove(1), Err(Error::KeyNotFound(1))));

        tree.insert(2, attrs(2)).unwrap();
        assert_eq!(tree.root(), PageId::new(0));
        assert_eq!(tree.index_page_count(), 1);
        tree.validate().unwrap();
    }

    #[test]
    fn test_failed_remove_keeps_record() {
        let (mut tree, _dir) = create_test_tree(2);
        for key in [10, 20, 30, 40, 50] {
            tree.insert(key, attrs(key)).unwrap();
        }
        let locator = tree.locate(10).unwrap().unwrap();

        // Point the root at a page that does not exist, so the merge after
        // removing 10 cannot reach the right sibling.
        {
            let mut root = tree.store.write(tree.root).unwrap();
            let locators = root.locators().to_vec();
            let mut children = root.children().to_vec();
            children[1] = PageId::new(99);
            root.set_entries(&locators, &children);
        }

        assert!(matches!(tree.remove(10), Err(Error::PageNotFound(_))));
        assert_eq!(tree.pinned_pages(), 0);
        assert_eq!(tree.heap.read(&locator).unwrap().attributes, attrs(10));
    }

    #[test]
    fn test_keys_in_order() {
        let (mut tree, _dir) = create_test_tree(2);
        for key in [50, 10, 40, 20, 30, 70, 60, 5, 15] {
            tree.insert(key, attrs(key)).unwrap();
        }
        assert_eq!(
            tree.keys().unwrap(),
            vec![5, 10, 15, 20, 30, 40, 50, 60, 70]
        );
        assert_eq!(tree.validate().unwrap().keys, 9);
        assert_eq!(tree.pinned_pages(), 0);
    }

    #[test]
    fn test_io_stats_reset() {
        let (mut tree, _dir) = create_test_tree(2);
        for key in 0..40 {
            tree.insert(key, attrs(key)).unwrap();
        }
        assert!(tree.io_stats().disk_writes() > 0);

        tree.reset_io_stats();
        assert_eq!(tree.io_stats(), IoStats::default());
    }
}
