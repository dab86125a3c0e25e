use crate::dbms::types::{PageData, PageId, INVALID_PAGE_ID, PAGE_SIZE};

/// One slot of the buffer pool: the metadata for a cached page together
/// with the page bytes themselves. Invariant: whenever `valid` is false,
/// `page_id` is `INVALID_PAGE_ID`, `pin_count` is 0, and `dirty` is false.
pub struct Frame {
    page_id: PageId,
    pin_count: u32,
    valid: bool,
    dirty: bool,
    data: Box<PageData>,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            page_id: INVALID_PAGE_ID,
            pin_count: 0,
            valid: false,
            dirty: false,
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }

    /// Restore the invalid state. The page bytes are left as-is; they are
    /// meaningless while the frame is invalid.
    pub fn reset(&mut self) {
        self.page_id = INVALID_PAGE_ID;
        self.pin_count = 0;
        self.valid = false;
        self.dirty = false;
    }

    /// Take ownership of an installed page: identity set, pinned once,
    /// clean. The page bytes are untouched; callers fill them before or
    /// after, depending on whether the bytes come from disk or are fresh.
    pub fn load(&mut self, page_id: PageId) {
        self.reset();
        self.page_id = page_id;
        self.pin_count = 1;
        self.valid = true;
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn data(&self) -> &PageData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut PageData {
        &mut self.data
    }

    pub(crate) fn increment_pin_count(&mut self) {
        self.pin_count += 1;
    }

    pub(crate) fn decrement_pin_count(&mut self) {
        debug_assert!(self.pin_count > 0);
        self.pin_count -= 1;
    }

    pub(crate) fn set_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_clean(&mut self) {
        self.dirty = false;
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_new_frame_is_invalid() {
        let frame = Frame::new();
        assert!(!frame.is_valid());
        assert!(!frame.is_dirty());
        assert_eq!(frame.pin_count(), 0);
        assert_eq!(frame.page_id(), INVALID_PAGE_ID);
    }

    #[rstest]
    fn test_load_pins_once_and_clears_dirty() {
        let mut frame = Frame::new();
        frame.set_dirty();
        frame.load(PageId::new(2, 5));

        assert!(frame.is_valid());
        assert!(!frame.is_dirty());
        assert_eq!(frame.pin_count(), 1);
        assert_eq!(frame.page_id(), PageId::new(2, 5));
    }

    #[rstest]
    fn test_reset_restores_invalid_state() {
        let mut frame = Frame::new();
        frame.load(PageId::new(2, 5));
        frame.set_dirty();
        frame.reset();

        assert!(!frame.is_valid());
        assert!(!frame.is_dirty());
        assert_eq!(frame.pin_count(), 0);
        assert_eq!(frame.page_id(), INVALID_PAGE_ID);
    }
}
