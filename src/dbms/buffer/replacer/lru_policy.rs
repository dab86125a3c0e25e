use std::collections::VecDeque;
use std::sync::RwLock;

use crate::dbms::buffer::frame::Frame;
use crate::dbms::types::FrameId;

use super::replacement_policy::{
    IReplacementPolicy, PolicyKind, ReplacementStats, ReplacerCore, ReplacerError,
};

/// Exact least-recently-used replacement. Unpinned frames sit in a queue
/// ordered by when their last pin was dropped; the victim is the front.
/// Re-pinning removes a frame from the queue, so everything queued is
/// eligible. Higher bookkeeping cost than CLOCK for strict recency order.
pub struct LruPolicy {
    core: ReplacerCore,
    queue: VecDeque<FrameId>,
    /// Queue removals caused by re-pins, kept for the probes statistic
    remove_calls: u64,
}

impl LruPolicy {
    pub fn new(pool_size: usize) -> Self {
        Self {
            core: ReplacerCore::new(pool_size),
            queue: VecDeque::with_capacity(pool_size),
            remove_calls: 0,
        }
    }
}

impl IReplacementPolicy for LruPolicy {
    fn replace(&mut self, frames: &[RwLock<Frame>]) -> Result<FrameId, ReplacerError> {
        if let Some(frame_id) = self.core.pop_free() {
            return Ok(frame_id);
        }

        let mut probes: u64 = 0;
        while let Some(frame_id) = self.queue.pop_front() {
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
        if let Some(pos) = self.queue.iter().position(|&id| id == frame_id) {
            self.queue.remove(pos);
            self.remove_calls += 1;
        }
        Ok(())
    }

    fn unpin(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.core.check_bounds(frame_id)?;
        self.queue.push_back(frame_id);
        Ok(())
    }

    fn free_frame(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.core.check_bounds(frame_id)?;
        self.queue.retain(|&id| id != frame_id);
        self.core.push_free(frame_id);
        Ok(())
    }

    fn record_page_request(&mut self) {
        self.core.record_page_request();
    }

    fn stats(&self) -> ReplacementStats {
        self.core.stats(PolicyKind::Lru)
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Lru
    }

    fn stats_summary(&self) -> String {
        format!(
            "{}\nQueued unpinned frames: {}\nQueue removals on re-pin: {}",
            self.stats(),
            self.queue.len(),
            self.remove_calls
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use crate::dbms::types::PageId;

    fn unpinned_frames(count: usize) -> Vec<RwLock<Frame>> {
        (0..count)
            .map(|i| {
                let mut frame = Frame::new();
                frame.load(PageId::new(0, i as u32));
                frame.decrement_pin_count();
                RwLock::new(frame)
            })
            .collect()
    }

    fn full_pool_policy(pool_size: usize) -> LruPolicy {
        let mut policy = LruPolicy::new(pool_size);
        while policy.core.pop_free().is_some() {}
        policy
    }

    #[rstest]
    fn test_evicts_least_recently_unpinned() {
        let mut policy = full_pool_policy(4);
        let frames = unpinned_frames(4);

        policy.unpin(2).unwrap();
        policy.unpin(0).unwrap();
        policy.unpin(3).unwrap();

        assert_eq!(policy.replace(&frames), Ok(2));
        assert_eq!(policy.replace(&frames), Ok(0));
        assert_eq!(policy.replace(&frames), Ok(3));
    }

    #[rstest]
    fn test_repin_removes_from_queue() {
        let mut policy = full_pool_policy(3);
        let frames = unpinned_frames(3);

        policy.unpin(0).unwrap();
        policy.unpin(1).unwrap();
        policy.pin(0).unwrap();
        policy.unpin(0).unwrap();

        // Frame 0 moved behind frame 1 when it was re-pinned
        assert_eq!(policy.replace(&frames), Ok(1));
        assert_eq!(policy.replace(&frames), Ok(0));
        assert_eq!(policy.remove_calls, 1);
    }

    #[rstest]
    fn test_empty_queue_fails() {
        let mut policy = full_pool_policy(2);
        let frames = unpinned_frames(2);
        assert_eq!(policy.replace(&frames), Err(ReplacerError::InsufficientSpace));
    }

    #[rstest]
    fn test_free_frame_wins_over_queue() {
        let mut policy = full_pool_policy(3);
        let frames = unpinned_frames(3);

        policy.unpin(0).unwrap();
        policy.free_frame(2).unwrap();

        assert_eq!(policy.replace(&frames), Ok(2));
        assert_eq!(policy.replace(&frames), Ok(0));
    }

    #[rstest]
    fn test_free_frame_purges_queue_entry() {
        let mut policy = full_pool_policy(3);
        policy.unpin(1).unwrap();
        policy.free_frame(1).unwrap();

        // Frame 1 must appear once (from the free list), not twice
        let frames = unpinned_frames(3);
        assert_eq!(policy.replace(&frames), Ok(1));
        assert_eq!(policy.replace(&frames), Err(ReplacerError::InsufficientSpace));
    }
}
