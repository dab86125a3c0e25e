#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::dbms::types::{FileId, PageData, PageId};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DiskManagerError {
    /// No file with this id exists on disk
    #[error("file {0} does not exist")]
    InvalidFileId(FileId),
    /// The file exists but has no page with this number
    #[error("page {0} is not allocated on disk")]
    InvalidPageNum(PageId),
    /// The file cannot grow any further
    #[error("no space left for a new page")]
    InsufficientSpace,
    /// Underlying file operation failed
    #[error("disk operation failed: {0}")]
    Io(String),
}

/// The disk interface the buffer pool consumes. Implementations own file
/// layout and page placement; the buffer pool only ever addresses whole
/// pages by `PageId`.
#[cfg_attr(test, automock)]
pub trait IDiskManager {
    /// Allocate a fresh page in the given file, returning its id.
    fn allocate_page(&mut self, file_id: FileId) -> Result<PageId, DiskManagerError>;
    /// Release the page's slot on disk.
    fn deallocate_page(&mut self, page_id: PageId) -> Result<(), DiskManagerError>;
    /// Read the page's bytes into `buf`.
    fn read_page(&mut self, page_id: PageId, buf: &mut PageData) -> Result<(), DiskManagerError>;
    /// Write `data` as the page's bytes.
    fn write_page(&mut self, page_id: PageId, data: &PageData) -> Result<(), DiskManagerError>;
    /// Create an empty file for the given id.
    fn create_file(&mut self, file_id: FileId) -> Result<(), DiskManagerError>;
    /// Remove the file and every page in it.
    fn remove_file(&mut self, file_id: FileId) -> Result<(), DiskManagerError>;
    /// Number of pages currently allocated in the file.
    fn file_size(&self, file_id: FileId) -> Result<u32, DiskManagerError>;
}
