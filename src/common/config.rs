//! Configuration for paged-btree.
//!
//! Record shape is fixed at compile time. Tree degree, data page capacity
//! and pool sizes are chosen per tree through [`TreeConfig`].

use crate::common::{Error, Result};

/// Number of real-valued attributes carried by every record.
pub const ATTRIBUTE_COUNT: usize = 5;

/// Default degree `d`: non-root nodes hold `d..=2d` keys.
pub const DEFAULT_DEGREE: usize = 2;

/// Default number of node pages the index pool keeps resident.
pub const DEFAULT_INDEX_POOL_PAGES: usize = 5;

/// Default number of data pages the data pool keeps resident.
pub const DEFAULT_DATA_POOL_PAGES: usize = 5;

/// Smallest usable index pool.
///
/// Compensation and merge pin a parent and two siblings at once; a root
/// split pins the old root, its new sibling and the new root.
pub const MIN_INDEX_POOL_PAGES: usize = 3;

/// File name of the index store inside a tree directory.
pub const INDEX_FILE_NAME: &str = "index.dat";

/// File name of the data heap inside a tree directory.
pub const DATA_FILE_NAME: &str = "data.dat";

/// Tunables of a single tree.
///
/// # Example
/// ```
/// use paged_btree::TreeConfig;
///
/// let config = TreeConfig::default().with_degree(3).with_index_pool_pages(8);
/// assert_eq!(config.max_keys(), 6);
/// assert_eq!(config.records_per_page, 6);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Tree degree `d`.
    pub degree: usize,
    /// Record slots per data page.
    pub records_per_page: usize,
    /// Capacity of the index buffer pool, in node pages.
    pub index_pool_pages: usize,
    /// Capacity of the data buffer pool, in data pages.
    pub data_pool_pages: usize,
}

impl TreeConfig {
    /// Set the degree. Records per page follow as `2d`, matching a node.
    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self.records_per_page = 2 * degree;
        self
    }

    pub fn with_records_per_page(mut self, records_per_page: usize) -> Self {
        self.records_per_page = records_per_page;
        self
    }

    pub fn with_index_pool_pages(mut self, pages: usize) -> Self {
        self.index_pool_pages = pages;
        self
    }

    pub fn with_data_pool_pages(mut self, pages: usize) -> Self {
        self.data_pool_pages = pages;
        self
    }

    /// Normal upper bound on keys per node (`2d`).
    #[inline]
    pub fn max_keys(&self) -> usize {
        2 * self.degree
    }

    /// Lower bound on keys per non-root node (`d`).
    #[inline]
    pub fn min_keys(&self) -> usize {
        self.degree
    }

    /// Check that a tree can run with these settings.
    pub fn validate(&self) -> Result<()> {
        if self.degree == 0 {
            return Err(Error::InvalidConfig("degree must be at least 1".into()));
        }
        if self.records_per_page == 0 {
            return Err(Error::InvalidConfig(
                "data pages must hold at least one record".into(),
            ));
        }
        if self.index_pool_pages < MIN_INDEX_POOL_PAGES {
            return Err(Error::InvalidConfig(format!(
                "index pool needs at least {} pages, got {}",
                MIN_INDEX_POOL_PAGES, self.index_pool_pages
            )));
        }
        if self.data_pool_pages == 0 {
            return Err(Error::InvalidConfig(
                "data pool needs at least one page".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
            records_per_page: 2 * DEFAULT_DEGREE,
            index_pool_pages: DEFAULT_INDEX_POOL_PAGES,
            data_pool_pages: DEFAULT_DATA_POOL_PAGES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TreeConfig::default();
        assert_eq!(config.degree, 2);
        assert_eq!(config.max_keys(), 4);
        assert_eq!(config.min_keys(), 2);
        assert_eq!(config.records_per_page, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = TreeConfig::default()
            .with_degree(5)
            .with_records_per_page(7)
            .with_data_pool_pages(2);
        assert_eq!(config.max_keys(), 10);
        assert_eq!(config.records_per_page, 7);
        assert_eq!(config.data_pool_pages, 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TreeConfig::default().with_degree(0).validate().is_err());
        assert!(TreeConfig::default()
            .with_records_per_page(0)
            .validate()
            .is_err());
        assert!(TreeConfig::default()
            .with_index_pool_pages(MIN_INDEX_POOL_PAGES - 1)
            .validate()
            .is_err());
        assert!(TreeConfig::default()
            .with_data_pool_pages(0)
            .validate()
            .is_err());
    }
}
