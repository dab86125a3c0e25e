use std::fmt;
use std::sync::RwLock;

use log::{debug, warn};
use thiserror::Error;

use crate::dbms::buffer::buffer_map::{BufferMap, BufferMapError};
use crate::dbms::buffer::frame::Frame;
use crate::dbms::buffer::replacer::{
    ClockPolicy, LruPolicy, MruPolicy, PolicyKind, RandomPolicy, ReplacementStats, ReplacerError,
    UnknownPolicy,
};
use crate::dbms::buffer::types::{DiskManagerGeneric, PageReadGuard, PageWriteGuard, PolicyGeneric};
use crate::dbms::storage::disk::DiskManagerError;
use crate::dbms::types::{FileId, FrameId, PageId};

pub const DEFAULT_POOL_SIZE: usize = 16;

#[derive(Debug, Error, PartialEq)]
pub enum BufferManagerError {
    /// Operation on a page that is not resident
    #[error("page {0} is not resident in the buffer pool")]
    PageNotFound(PageId),
    /// A page was installed twice
    #[error("page {0} is already loaded in the buffer pool")]
    PageAlreadyLoaded(PageId),
    /// Release on a page whose pin count is already zero
    #[error("page {0} is not pinned")]
    PageNotPinned(PageId),
    /// Deallocation or file removal hit a pinned page
    #[error("page {0} is pinned")]
    PagePinned(PageId),
    /// The disk layer does not know this page
    #[error("page {0} is not an allocated page")]
    InvalidPageId(PageId),
    /// Every frame is pinned
    #[error("no unpinned frame is available in the buffer pool")]
    InsufficientSpace,
    /// Construction with a replacement policy name nobody implements
    #[error("unknown replacement policy {0:?}")]
    InvalidPolicy(String),
    #[error(transparent)]
    Replacer(ReplacerError),
    #[error(transparent)]
    Disk(#[from] DiskManagerError),
}

impl From<BufferMapError> for BufferManagerError {
    fn from(err: BufferMapError) -> Self {
        match err {
            BufferMapError::PageNotFound(page_id) => BufferManagerError::PageNotFound(page_id),
            BufferMapError::PageAlreadyLoaded(page_id) => {
                BufferManagerError::PageAlreadyLoaded(page_id)
            }
        }
    }
}

impl From<UnknownPolicy> for BufferManagerError {
    fn from(err: UnknownPolicy) -> Self {
        BufferManagerError::InvalidPolicy(err.0)
    }
}

impl From<ReplacerError> for BufferManagerError {
    fn from(err: ReplacerError) -> Self {
        match err {
            ReplacerError::InsufficientSpace => BufferManagerError::InsufficientSpace,
            other => BufferManagerError::Replacer(other),
        }
    }
}

/// Startup parameters for the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolConfig {
    pub pool_size: usize,
    pub policy: PolicyKind,
}

impl BufferPoolConfig {
    pub fn new(pool_size: usize, policy: PolicyKind) -> Self {
        Self { pool_size, policy }
    }

    /// Build a config from a policy name, e.g. out of a config file or a
    /// command line.
    pub fn from_policy_name(pool_size: usize, name: &str) -> Result<Self, BufferManagerError> {
        Ok(Self {
            pool_size,
            policy: name.parse::<PolicyKind>()?,
        })
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            policy: PolicyKind::Clock,
        }
    }
}

/// Point-in-time counts over the pool, for tests and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferState {
    pub total: u32,
    pub valid: u32,
    pub pinned: u32,
    pub unpinned: u32,
    pub dirty: u32,
    pub replace_stats: ReplacementStats,
}

impl fmt::Display for BufferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total frames: {}", self.total)?;
        writeln!(f, "Valid pages: {}", self.valid)?;
        writeln!(f, "Pinned pages: {}", self.pinned)?;
        writeln!(f, "Unpinned pages: {}", self.unpinned)?;
        writeln!(f, "Dirty pages: {}", self.dirty)?;
        write!(f, "{}", self.replace_stats)
    }
}

/// The page-lifecycle interface the rest of the system programs against.
/// Fetched pages stay resident until their pins are released; the guards
/// only scope data access.
pub trait IBufferManager {
    /// Allocate a page on disk and install it pinned in the pool.
    fn allocate_page(&self, file_id: FileId) -> Result<PageWriteGuard<'_>, BufferManagerError>;
    /// Pin the page (reading it in on a miss) and return read access.
    fn fetch_page(&self, page_id: PageId) -> Result<PageReadGuard<'_>, BufferManagerError>;
    /// Pin the page (reading it in on a miss) and return write access.
    fn fetch_page_writable(&self, page_id: PageId)
        -> Result<PageWriteGuard<'_>, BufferManagerError>;
    /// Drop one pin; optionally mark the page dirty. The dirty bit is
    /// never cleared here.
    fn release_page(&self, page_id: PageId, mark_dirty: bool) -> Result<(), BufferManagerError>;
    /// Mark the page dirty.
    fn set_dirty(&self, page_id: PageId) -> Result<(), BufferManagerError>;
    /// Write the page back if dirty; pin state is unchanged.
    fn flush_page(&self, page_id: PageId) -> Result<(), BufferManagerError>;
    /// Drop the page from the pool (it must be unpinned) and from disk.
    fn deallocate_page(&self, page_id: PageId) -> Result<(), BufferManagerError>;
    /// Create a file on disk.
    fn create_file(&self, file_id: FileId) -> Result<(), BufferManagerError>;
    /// Drop every resident page of the file from the pool, then remove
    /// the file from disk. Fails if any of its pages is pinned.
    fn remove_file(&self, file_id: FileId) -> Result<(), BufferManagerError>;
    /// Write back every valid dirty page.
    fn flush_all_pages(&self) -> Result<(), BufferManagerError>;
    /// Snapshot of pool counts and policy statistics.
    fn buffer_state(&self) -> BufferState;
    fn num_unpinned(&self) -> u32;
}

/// Owns the frame table, the resident-page map, the replacement policy,
/// and the handle to the disk layer. Each public operation serializes on
/// the map lock (and the policy lock where the policy is consulted), so
/// callers observe operations in a total order.
pub struct BufferManager {
    frames: Vec<RwLock<Frame>>,
    buf_map: RwLock<BufferMap>,
    replacer: RwLock<PolicyGeneric>,
    disk_manager: RwLock<DiskManagerGeneric>,
}

impl BufferManager {
    pub fn new(disk_manager: DiskManagerGeneric, config: &BufferPoolConfig) -> Self {
        let pool_size = config.pool_size;
        let policy: PolicyGeneric = match config.policy {
            PolicyKind::Clock => Box::new(ClockPolicy::new(pool_size)),
            PolicyKind::Random => Box::new(RandomPolicy::new(pool_size)),
            PolicyKind::Lru => Box::new(LruPolicy::new(pool_size)),
            PolicyKind::Mru => Box::new(MruPolicy::new(pool_size)),
        };

        Self {
            frames: (0..pool_size).map(|_| RwLock::new(Frame::new())).collect(),
            buf_map: RwLock::new(BufferMap::new()),
            replacer: RwLock::new(policy),
            disk_manager: RwLock::new(disk_manager),
        }
    }

    fn count_unpinned(&self) -> u32 {
        self.frames
            .iter()
            .filter(|slot| slot.read().unwrap().pin_count() == 0)
            .count() as u32
    }

    /// Obtain a frame for reuse: ask the policy for a victim, write it
    /// back if it holds dirty data, unmap it, and reset it. Both the
    /// allocate and the miss-fill paths go through here, so no eviction
    /// can drop dirty bytes.
    fn take_victim(
        &self,
        map: &mut BufferMap,
        replacer: &mut PolicyGeneric,
    ) -> Result<FrameId, BufferManagerError> {
        let frame_id = replacer.replace(&self.frames)?;

        let mut frame = self.frames[frame_id].write().unwrap();
        if frame.is_valid() {
            if frame.is_dirty() {
                debug!(
                    "writing back dirty page {} while evicting frame {}",
                    frame.page_id(),
                    frame_id
                );
                let mut disk = self.disk_manager.write().unwrap();
                disk.write_page(frame.page_id(), frame.data())?;
                frame.set_clean();
            }
            map.remove(frame.page_id())?;
        }
        frame.reset();

        Ok(frame_id)
    }

    /// Fetch a page, reading it in from disk if needed, and return the id
    /// of the frame holding it with one pin added.
    fn fetch_frame(&self, page_id: PageId) -> Result<FrameId, BufferManagerError> {
        let mut map = self.buf_map.write().unwrap();
        let mut replacer = self.replacer.write().unwrap();

        // Hit: pin and go. No capacity requirement on this path.
        if let Ok(frame_id) = map.get(page_id) {
            let mut frame = self.frames[frame_id].write().unwrap();
            frame.increment_pin_count();
            if frame.pin_count() == 1 {
                replacer.pin(frame_id)?;
            }
            replacer.record_page_request();
            return Ok(frame_id);
        }

        if self.count_unpinned() == 0 {
            return Err(BufferManagerError::InsufficientSpace);
        }

        let frame_id = self.take_victim(&mut map, &mut replacer)?;

        {
            let mut frame = self.frames[frame_id].write().unwrap();
            let read_result = {
                let mut disk = self.disk_manager.write().unwrap();
                disk.read_page(page_id, frame.data_mut())
            };
            if let Err(err) = read_result {
                // The victim is already invalid and unmapped; hand it to
                // the free list so it stays reachable, then report.
                drop(frame);
                replacer.free_frame(frame_id)?;
                return Err(match err {
                    DiskManagerError::InvalidFileId(_) | DiskManagerError::InvalidPageNum(_) => {
                        BufferManagerError::InvalidPageId(page_id)
                    }
                    other => BufferManagerError::Disk(other),
                });
            }
            frame.load(page_id);
        }

        map.insert(page_id, frame_id)?;
        replacer.pin(frame_id)?;
        replacer.record_page_request();

        Ok(frame_id)
    }

    /// Per-frame diagnostic line, including the policy's view of the
    /// frame.
    pub fn dump_frame(&self, frame_id: FrameId) -> String {
        let Some(slot) = self.frames.get(frame_id) else {
            return format!("Frame {}: out of range", frame_id);
        };
        let replacer = self.replacer.read().unwrap();
        let frame = slot.read().unwrap();

        let mut line = format!("Frame {}: ", frame_id);
        if frame.is_valid() {
            line.push_str(&format!("page_id: {}, ", frame.page_id()));
        }
        line.push_str(&format!(
            "pin_count: {}, valid: {}, dirty: {}",
            frame.pin_count(),
            frame.is_valid(),
            frame.is_dirty()
        ));
        let policy_view = replacer.describe_frame(frame_id);
        if !policy_view.is_empty() {
            line.push_str(", ");
            line.push_str(&policy_view);
        }
        line
    }

    /// Diagnostic line for the frame holding the given page, or a
    /// not-found note.
    pub fn dump_page(&self, page_id: PageId) -> String {
        let frame_id = { self.buf_map.read().unwrap().get(page_id) };
        match frame_id {
            Ok(frame_id) => self.dump_frame(frame_id),
            Err(_) => "Page Not Found".to_string(),
        }
    }

    pub fn dump_all_frames(&self) -> String {
        (0..self.frames.len())
            .map(|frame_id| self.dump_frame(frame_id))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn dump_valid_frames(&self) -> String {
        (0..self.frames.len())
            .filter(|&frame_id| self.frames[frame_id].read().unwrap().is_valid())
            .map(|frame_id| self.dump_frame(frame_id))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The policy's own statistics dump, including policy-specific
    /// counters the common snapshot has no room for.
    pub fn replacement_summary(&self) -> String {
        self.replacer.read().unwrap().stats_summary()
    }
}

impl IBufferManager for BufferManager {
    fn allocate_page(&self, file_id: FileId) -> Result<PageWriteGuard<'_>, BufferManagerError> {
        let mut map = self.buf_map.write().unwrap();
        let mut replacer = self.replacer.write().unwrap();

        if self.count_unpinned() == 0 {
            return Err(BufferManagerError::InsufficientSpace);
        }

        let page_id = {
            let mut disk = self.disk_manager.write().unwrap();
            disk.allocate_page(file_id)?
        };
        let frame_id = self.take_victim(&mut map, &mut replacer)?;

        if let Err(err) = map.insert(page_id, frame_id) {
            replacer.free_frame(frame_id)?;
            return Err(err.into());
        }
        replacer.pin(frame_id)?;
        replacer.record_page_request();

        let mut frame = self.frames[frame_id].write().unwrap();
        frame.load(page_id);
        // A fresh page reads back zeroed
        frame.data_mut().fill(0);
        Ok(frame)
    }

    fn fetch_page(&self, page_id: PageId) -> Result<PageReadGuard<'_>, BufferManagerError> {
        let frame_id = self.fetch_frame(page_id)?;
        Ok(self.frames[frame_id].read().unwrap())
    }

    fn fetch_page_writable(
        &self,
        page_id: PageId,
    ) -> Result<PageWriteGuard<'_>, BufferManagerError> {
        let frame_id = self.fetch_frame(page_id)?;
        Ok(self.frames[frame_id].write().unwrap())
    }

    fn release_page(&self, page_id: PageId, mark_dirty: bool) -> Result<(), BufferManagerError> {
        let map = self.buf_map.read().unwrap();
        let mut replacer = self.replacer.write().unwrap();

        let frame_id = map.get(page_id)?;
        let mut frame = self.frames[frame_id].write().unwrap();

        if frame.pin_count() == 0 {
            return Err(BufferManagerError::PageNotPinned(page_id));
        }
        if mark_dirty {
            frame.set_dirty();
        }
        frame.decrement_pin_count();
        if frame.pin_count() == 0 {
            replacer.unpin(frame_id)?;
        }
        Ok(())
    }

    fn set_dirty(&self, page_id: PageId) -> Result<(), BufferManagerError> {
        let map = self.buf_map.read().unwrap();
        let frame_id = map.get(page_id)?;
        self.frames[frame_id].write().unwrap().set_dirty();
        Ok(())
    }

    fn flush_page(&self, page_id: PageId) -> Result<(), BufferManagerError> {
        let map = self.buf_map.read().unwrap();
        let frame_id = map.get(page_id)?;
        let mut frame = self.frames[frame_id].write().unwrap();

        if frame.is_dirty() {
            let mut disk = self.disk_manager.write().unwrap();
            disk.write_page(page_id, frame.data())?;
            frame.set_clean();
        }
        Ok(())
    }

    fn deallocate_page(&self, page_id: PageId) -> Result<(), BufferManagerError> {
        let mut map = self.buf_map.write().unwrap();
        let mut replacer = self.replacer.write().unwrap();

        if let Ok(frame_id) = map.get(page_id) {
            let mut frame = self.frames[frame_id].write().unwrap();
            if frame.pin_count() > 0 {
                return Err(BufferManagerError::PagePinned(page_id));
            }
            frame.reset();
            map.remove(page_id)?;
            replacer.free_frame(frame_id)?;
        }

        let mut disk = self.disk_manager.write().unwrap();
        disk.deallocate_page(page_id)?;
        Ok(())
    }

    fn create_file(&self, file_id: FileId) -> Result<(), BufferManagerError> {
        let mut disk = self.disk_manager.write().unwrap();
        disk.create_file(file_id)?;
        Ok(())
    }

    fn remove_file(&self, file_id: FileId) -> Result<(), BufferManagerError> {
        let mut map = self.buf_map.write().unwrap();
        let mut replacer = self.replacer.write().unwrap();

        for (frame_id, slot) in self.frames.iter().enumerate() {
            let mut frame = slot.write().unwrap();
            if frame.is_valid() && frame.page_id().file_id == file_id {
                if frame.pin_count() > 0 {
                    return Err(BufferManagerError::PagePinned(frame.page_id()));
                }
                map.remove(frame.page_id())?;
                frame.reset();
                replacer.free_frame(frame_id)?;
            }
        }
        debug!("dropped resident pages of file {} from the pool", file_id);

        let mut disk = self.disk_manager.write().unwrap();
        disk.remove_file(file_id)?;
        Ok(())
    }

    fn flush_all_pages(&self) -> Result<(), BufferManagerError> {
        let _map = self.buf_map.read().unwrap();
        let mut disk = self.disk_manager.write().unwrap();

        for slot in &self.frames {
            let mut frame = slot.write().unwrap();
            if frame.is_valid() && frame.is_dirty() {
                disk.write_page(frame.page_id(), frame.data())?;
                frame.set_clean();
            }
        }
        Ok(())
    }

    fn buffer_state(&self) -> BufferState {
        let _map = self.buf_map.read().unwrap();
        let replacer = self.replacer.read().unwrap();

        let mut state = BufferState {
            total: self.frames.len() as u32,
            valid: 0,
            pinned: 0,
            unpinned: 0,
            dirty: 0,
            replace_stats: replacer.stats(),
        };
        for slot in &self.frames {
            let frame = slot.read().unwrap();
            if frame.is_valid() {
                state.valid += 1;
            }
            if frame.pin_count() > 0 {
                state.pinned += 1;
            }
            if frame.is_dirty() {
                state.dirty += 1;
            }
        }
        state.unpinned = state.total - state.pinned;
        state
    }

    fn num_unpinned(&self) -> u32 {
        self.buffer_state().unpinned
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        // Best-effort write-back; a failure here must not abort teardown
        let mut disk = self.disk_manager.write().unwrap();
        for slot in &self.frames {
            let mut frame = slot.write().unwrap();
            if frame.is_valid() && frame.is_dirty() {
                match disk.write_page(frame.page_id(), frame.data()) {
                    Ok(()) => frame.set_clean(),
                    Err(err) => warn!(
                        "shutdown write-back of page {} failed: {}",
                        frame.page_id(),
                        err
                    ),
                }
            }
        }
    }
}
