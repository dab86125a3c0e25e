use std::collections::HashMap;
use std::hash::BuildHasherDefault;

use thiserror::Error;
use xxhash_rust::xxh3::Xxh3;

use crate::dbms::types::{FrameId, PageId};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BufferMapError {
    #[error("page {0} is not resident in the buffer pool")]
    PageNotFound(PageId),
    #[error("page {0} is already loaded in the buffer pool")]
    PageAlreadyLoaded(PageId),
}

/// The resident-page index: PageId -> frame table slot. A thin wrapper
/// around a `HashMap`, but one that never silently overwrites and fails
/// loudly on absent keys, so map drift from the frame table cannot pass
/// unnoticed.
pub struct BufferMap {
    map: HashMap<PageId, FrameId, BuildHasherDefault<Xxh3>>,
}

impl BufferMap {
    pub fn new() -> Self {
        Self {
            map: HashMap::default(),
        }
    }

    pub fn get(&self, page_id: PageId) -> Result<FrameId, BufferMapError> {
        self.map
            .get(&page_id)
            .copied()
            .ok_or(BufferMapError::PageNotFound(page_id))
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.map.contains_key(&page_id)
    }

    pub fn insert(&mut self, page_id: PageId, frame_id: FrameId) -> Result<(), BufferMapError> {
        if self.map.contains_key(&page_id) {
            return Err(BufferMapError::PageAlreadyLoaded(page_id));
        }
        self.map.insert(page_id, frame_id);
        Ok(())
    }

    pub fn remove(&mut self, page_id: PageId) -> Result<FrameId, BufferMapError> {
        self.map
            .remove(&page_id)
            .ok_or(BufferMapError::PageNotFound(page_id))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for BufferMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_get_absent_page() {
        let map = BufferMap::new();
        let page_id = PageId::new(0, 0);
        assert_eq!(map.get(page_id), Err(BufferMapError::PageNotFound(page_id)));
    }

    #[rstest]
    fn test_insert_then_get() {
        let mut map = BufferMap::new();
        let page_id = PageId::new(1, 4);
        map.insert(page_id, 7).unwrap();

        assert!(map.contains(page_id));
        assert_eq!(map.get(page_id), Ok(7));
        assert_eq!(map.len(), 1);
    }

    #[rstest]
    fn test_insert_duplicate_fails_without_overwrite() {
        let mut map = BufferMap::new();
        let page_id = PageId::new(1, 4);
        map.insert(page_id, 7).unwrap();

        assert_eq!(
            map.insert(page_id, 9),
            Err(BufferMapError::PageAlreadyLoaded(page_id))
        );
        assert_eq!(map.get(page_id), Ok(7));
    }

    #[rstest]
    fn test_remove_returns_frame_and_clears_entry() {
        let mut map = BufferMap::new();
        let page_id = PageId::new(1, 4);
        map.insert(page_id, 7).unwrap();

        assert_eq!(map.remove(page_id), Ok(7));
        assert!(!map.contains(page_id));
        assert_eq!(
            map.remove(page_id),
            Err(BufferMapError::PageNotFound(page_id))
        );
    }
}
