use std::collections::HashMap;

use crate::dbms::types::{FileId, PageData, PageId, PAGE_SIZE};

use super::{DiskManagerError, IDiskManager};

/// A purely in-memory implementation of the disk manager for testing.
/// Files are vectors of page slots; a deallocated slot is `None` and is
/// the first candidate for reuse on the next allocation. The underlying
/// structures are exposed for inspection in tests.
pub struct InMemoryDiskManager {
    /// file_id -> page slots, indexed by page_num
    pub files: HashMap<FileId, Vec<Option<Box<PageData>>>>,
}

impl InMemoryDiskManager {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    fn file_mut(
        &mut self,
        file_id: FileId,
    ) -> Result<&mut Vec<Option<Box<PageData>>>, DiskManagerError> {
        self.files
            .get_mut(&file_id)
            .ok_or(DiskManagerError::InvalidFileId(file_id))
    }

    fn slot_mut(&mut self, page_id: PageId) -> Result<&mut Box<PageData>, DiskManagerError> {
        self.file_mut(page_id.file_id)?
            .get_mut(page_id.page_num as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(DiskManagerError::InvalidPageNum(page_id))
    }
}

impl Default for InMemoryDiskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IDiskManager for InMemoryDiskManager {
    fn allocate_page(&mut self, file_id: FileId) -> Result<PageId, DiskManagerError> {
        let file = self.file_mut(file_id)?;
        let fresh = Box::new([0u8; PAGE_SIZE]);
        let page_num = match file.iter().position(|slot| slot.is_none()) {
            Some(hole) => {
                file[hole] = Some(fresh);
                hole
            }
            None => {
                file.push(Some(fresh));
                file.len() - 1
            }
        };
        Ok(PageId::new(file_id, page_num as u32))
    }

    fn deallocate_page(&mut self, page_id: PageId) -> Result<(), DiskManagerError> {
        let file = self.file_mut(page_id.file_id)?;
        match file.get_mut(page_id.page_num as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(DiskManagerError::InvalidPageNum(page_id)),
        }
    }

    fn read_page(&mut self, page_id: PageId, buf: &mut PageData) -> Result<(), DiskManagerError> {
        let slot = self.slot_mut(page_id)?;
        buf.copy_from_slice(&slot[..]);
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, data: &PageData) -> Result<(), DiskManagerError> {
        let slot = self.slot_mut(page_id)?;
        slot.copy_from_slice(data);
        Ok(())
    }

    fn create_file(&mut self, file_id: FileId) -> Result<(), DiskManagerError> {
        // Creating over an existing file would silently clobber its pages
        if self.files.contains_key(&file_id) {
            return Err(DiskManagerError::InvalidFileId(file_id));
        }
        self.files.insert(file_id, Vec::new());
        Ok(())
    }

    fn remove_file(&mut self, file_id: FileId) -> Result<(), DiskManagerError> {
        self.files
            .remove(&file_id)
            .map(|_| ())
            .ok_or(DiskManagerError::InvalidFileId(file_id))
    }

    fn file_size(&self, file_id: FileId) -> Result<u32, DiskManagerError> {
        let file = self
            .files
            .get(&file_id)
            .ok_or(DiskManagerError::InvalidFileId(file_id))?;
        Ok(file.iter().filter(|slot| slot.is_some()).count() as u32)
    }
}
