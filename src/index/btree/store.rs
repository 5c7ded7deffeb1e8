//! Node store - the index pool plus the free list of index pages.

use std::path::Path;

use log::debug;
use parking_lot::Mutex;

use super::node::{Node, NodeFormat};
use crate::buffer::{BufferPoolManager, BufferPoolStats, PageReadGuard, PageWriteGuard};
use crate::common::{Error, PageId, Result};
use crate::storage::page::StoredPage;
use crate::storage::DiskManager;

/// All access to index pages goes through here.
///
/// Freed pages are threaded into a singly linked list through their
/// `next_free` field, and [`allocate`](Self::allocate) takes from the head
/// of that list before growing the file.
pub struct NodeStore {
    pool: BufferPoolManager<Node>,

    /// First page on the free list, `INVALID` when empty.
    free_head: Mutex<PageId>,

    degree: usize,
}

impl NodeStore {
    /// Create an empty index file at `path`, truncating it.
    pub fn create<P: AsRef<Path>>(path: P, degree: usize, pool_pages: usize) -> Result<Self> {
        let format = NodeFormat { degree };
        let dm = DiskManager::create(path, Node::page_size(format))?;
        Ok(Self {
            pool: BufferPoolManager::new("index", pool_pages, dm, format)?,
            free_head: Mutex::new(PageId::INVALID),
            degree,
        })
    }

    pub fn read(&self, page_id: PageId) -> Result<PageReadGuard<'_, Node>> {
        self.pool.fetch_page_read(page_id)
    }

    pub fn write(&self, page_id: PageId) -> Result<PageWriteGuard<'_, Node>> {
        self.pool.fetch_page_write(page_id)
    }

    /// A fresh empty leaf under `parent`, reusing a freed page if any.
    pub fn allocate(&self, parent: PageId) -> Result<PageWriteGuard<'_, Node>> {
        let head = *self.free_head.lock();
        if !head.is_valid() {
            return self.pool.new_page(Node::new(self.degree, parent));
        }

        let mut node = self.pool.fetch_page_write(head)?;
        if !node.is_free() {
            return Err(Error::inconsistent(format!(
                "free list head {} is a live node",
                head
            )));
        }
        *self.free_head.lock() = node.next_free();
        *node = Node::new(self.degree, parent);
        debug!("index: reusing {} from the free list", head);
        Ok(node)
    }

    /// Put a page on the free list. Consumes the guard.
    pub fn free(&self, mut node: PageWriteGuard<'_, Node>) {
        let mut head = self.free_head.lock();
        node.make_free(*head);
        *head = node.page_id();
        debug!("index: freed {}", node.page_id());
    }

    pub fn set_parent(&self, child: PageId, parent: PageId) -> Result<()> {
        self.write(child)?.set_parent(parent);
        Ok(())
    }

    /// Pages on the free list, head first.
    pub fn free_list(&self) -> Result<Vec<PageId>> {
        let mut pages = Vec::new();
        let mut next = *self.free_head.lock();
        while next.is_valid() {
            if pages.contains(&next) {
                return Err(Error::inconsistent(format!("free list cycles at {}", next)));
            }
            pages.push(next);
            let node = self.read(next)?;
            if !node.is_free() {
                return Err(Error::inconsistent(format!(
                    "{} is on the free list but not marked free",
                    next
                )));
            }
            next = node.next_free();
        }
        Ok(pages)
    }

    pub fn flush(&self) -> Result<()> {
        self.pool.flush_all_pages()
    }

    pub fn stats(&self) -> &BufferPoolStats {
        self.pool.stats()
    }

    pub fn page_count(&self) -> u32 {
        self.pool.disk_page_count()
    }

    pub fn pinned_frames(&self) -> usize {
        self.pool.pinned_frames()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_store() -> (NodeStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = NodeStore::create(dir.path().join("index.dat"), 2, 3).unwrap();
        (store, dir)
    }

    #[test]
    fn test_allocate_grows_file() {
        let (store, _dir) = create_test_store();
        let a = store.allocate(PageId::INVALID).unwrap().page_id();
        let b = store.allocate(a).unwrap().page_id();

        assert_eq!((a, b), (PageId::new(0), PageId::new(1)));
        assert_eq!(store.read(b).unwrap().parent(), a);
        assert_eq!(store.page_count(), 2);
    }

    #[test]
    fn test_freed_pages_reused_lifo() {
        let (store, _dir) = create_test_store();
        let ids: Vec<PageId> = (0..3)
            .map(|_| store.allocate(PageId::INVALID).unwrap().page_id())
            .collect();

        store.free(store.write(ids[0]).unwrap());
        store.free(store.write(ids[2]).unwrap());
        assert_eq!(store.free_list().unwrap(), vec![ids[2], ids[0]]);

        let reused = store.allocate(ids[1]).unwrap();
        assert_eq!(reused.page_id(), ids[2]);
        assert!(!reused.is_free());
        assert_eq!(reused.parent(), ids[1]);
        drop(reused);

        assert_eq!(store.free_list().unwrap(), vec![ids[0]]);
        assert_eq!(store.allocate(PageId::INVALID).unwrap().page_id(), ids[0]);
        assert!(store.free_list().unwrap().is_empty());
        assert_eq!(store.page_count(), 3);
    }

    #[test]
    fn test_free_list_survives_eviction() {
        let (store, _dir) = create_test_store();
        for _ in 0..5 {
            store.allocate(PageId::INVALID).unwrap();
        }
        store.free(store.write(PageId::new(0)).unwrap());
        store.free(store.write(PageId::new(1)).unwrap());

        // Push both freed pages out of the three-frame pool.
        for pid in 2..5 {
            drop(store.read(PageId::new(pid)).unwrap());
        }

        assert_eq!(
            store.free_list().unwrap(),
            vec![PageId::new(1), PageId::new(0)]
        );
        assert_eq!(store.allocate(PageId::INVALID).unwrap().page_id(), PageId::new(1));
        assert_eq!(store.allocate(PageId::INVALID).unwrap().page_id(), PageId::new(0));
        assert_eq!(store.allocate(PageId::INVALID).unwrap().page_id(), PageId::new(5));
        assert_eq!(store.pinned_frames(), 0);
    }
}
