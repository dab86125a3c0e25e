use std::sync::RwLock;

use crate::dbms::buffer::frame::Frame;
use crate::dbms::types::FrameId;

use super::replacement_policy::{
    IReplacementPolicy, PolicyKind, ReplacementStats, ReplacerCore, ReplacerError,
};

/// Most-recently-used replacement: the frame whose last pin was dropped
/// most recently is evicted first. Counterintuitive in general but the
/// right call for large sequential scans, where the page just released is
/// the one least likely to be touched again.
pub struct MruPolicy {
    core: ReplacerCore,
    stack: Vec<FrameId>,
    remove_calls: u64,
}

impl MruPolicy {
    pub fn new(pool_size: usize) -> Self {
        Self {
            core: ReplacerCore::new(pool_size),
            stack: Vec::with_capacity(pool_size),
            remove_calls: 0,
        }
    }
}

impl IReplacementPolicy for MruPolicy {
    fn replace(&mut self, frames: &[RwLock<Frame>]) -> Result<FrameId, ReplacerError> {
        if let Some(frame_id) = self.core.pop_free() {
            return Ok(frame_id);
        }

        let mut probes: u64 = 0;
        while let Some(frame_id) = self.stack.pop() {
            probes += 1;
            if frames[frame_id].read().unwrap().pin_count() == 0 {
                self.core.record_replacement(probes);
                return Ok(frame_id);
            }
        }
        Err(ReplacerError::InsufficientSpace)
    }

    fn pin(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.core.check_bounds(frame_id)?;
        if let Some(pos) = self.stack.iter().position(|&id| id == frame_id) {
            self.stack.remove(pos);
            self.remove_calls += 1;
        }
        Ok(())
    }

    fn unpin(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.core.check_bounds(frame_id)?;
        self.stack.push(frame_id);
        Ok(())
    }

    fn free_frame(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.core.check_bounds(frame_id)?;
        self.stack.retain(|&id| id != frame_id);
        self.core.push_free(frame_id);
        Ok(())
    }

    fn record_page_request(&mut self) {
        self.core.record_page_request();
    }

    fn stats(&self) -> ReplacementStats {
        self.core.stats(PolicyKind::Mru)
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Mru
    }

    fn stats_summary(&self) -> String {
        format!(
            "{}\nStacked unpinned frames: {}\nStack removals on re-pin: {}",
            self.stats(),
            self.stack.len(),
            self.remove_calls
        )
    }
}
