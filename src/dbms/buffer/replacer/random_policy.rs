use std::sync::RwLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dbms::buffer::frame::Frame;
use crate::dbms::types::FrameId;

use super::replacement_policy::{
    IReplacementPolicy, PolicyKind, ReplacementStats, ReplacerCore, ReplacerError,
};

/// Random victim selection. Cheap and surprisingly effective on large
/// pools: draw frame ids at random until an unpinned one turns up, with a
/// bounded number of draws before falling back to one linear scan of the
/// table. Pin state is the only criterion; there is no recency tracking.
pub struct RandomPolicy {
    core: ReplacerCore,
    /// How often each frame has been picked, for judging the spread
    times_chosen: Vec<u32>,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(pool_size: usize) -> Self {
        Self::with_rng(pool_size, StdRng::from_os_rng())
    }

    /// Deterministic construction for tests.
    pub fn with_rng(pool_size: usize, rng: StdRng) -> Self {
        Self {
            core: ReplacerCore::new(pool_size),
            times_chosen: vec![0; pool_size],
            rng,
        }
    }

    fn select(&mut self, frame_id: FrameId, probes: u64) -> FrameId {
        self.core.record_replacement(probes);
        self.times_chosen[frame_id] += 1;
        frame_id
    }
}

impl IReplacementPolicy for RandomPolicy {
    fn replace(&mut self, frames: &[RwLock<Frame>]) -> Result<FrameId, ReplacerError> {
        if let Some(frame_id) = self.core.pop_free() {
            return Ok(frame_id);
        }

        let pool_size = frames.len();
        let mut probes: u64 = 0;

        // One initial draw plus up to pool_size / 2 retries
        for _ in 0..(pool_size / 2 + 1) {
            let candidate = self.rng.random_range(0..pool_size);
            probes += 1;
            if frames[candidate].read().unwrap().pin_count() == 0 {
                return Ok(self.select(candidate, probes));
            }
        }

        // The draws kept landing on pinned frames; sweep the table once
        for (frame_id, slot) in frames.iter().enumerate() {
            probes += 1;
            if slot.read().unwrap().pin_count() == 0 {
                return Ok(self.select(frame_id, probes));
            }
        }

        Err(ReplacerError::InsufficientSpace)
    }

    fn pin(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.core.check_bounds(frame_id)
    }

    fn unpin(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.core.check_bounds(frame_id)
    }

    fn free_frame(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.core.check_bounds(frame_id)?;
        self.core.push_free(frame_id);
        Ok(())
    }

    fn record_page_request(&mut self) {
        self.core.record_page_request();
    }

    fn stats(&self) -> ReplacementStats {
        self.core.stats(PolicyKind::Random)
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Random
    }

    fn stats_summary(&self) -> String {
        let pool_size = self.times_chosen.len() as f64;
        let total: u32 = self.times_chosen.iter().sum();
        let mean = f64::from(total) / pool_size;
        let variance = self
            .times_chosen
            .iter()
            .map(|&count| {
                let diff = f64::from(count) - mean;
                diff * diff
            })
            .sum::<f64>()
            / (pool_size - 1.0).max(1.0);

        format!(
            "{}\nAverage times each frame chosen: {:.2}\nStd dev of times chosen: {:.2}",
            self.stats(),
            mean,
            variance.sqrt()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use crate::dbms::types::PageId;

    fn frame_table(states: &[(bool, u32)]) -> Vec<RwLock<Frame>> {
        states
            .iter()
            .enumerate()
            .map(|(i, &(valid, pins))| {
                let mut frame = Frame::new();
                if valid {
                    frame.load(PageId::new(0, i as u32));
                    if pins == 0 {
                        frame.decrement_pin_count();
                    } else {
                        for _ in 1..pins {
                            frame.increment_pin_count();
                        }
                    }
                }
                RwLock::new(frame)
            })
            .collect()
    }

    fn full_pool_policy(pool_size: usize) -> RandomPolicy {
        let mut policy = RandomPolicy::with_rng(pool_size, StdRng::seed_from_u64(42));
        while policy.core.pop_free().is_some() {}
        policy
    }

    #[rstest]
    fn test_free_list_served_first() {
        let mut policy = RandomPolicy::with_rng(2, StdRng::seed_from_u64(0));
        let frames = frame_table(&[(true, 1), (true, 1)]);
        assert_eq!(policy.replace(&frames), Ok(0));
        assert_eq!(policy.replace(&frames), Ok(1));
        assert_eq!(policy.stats().rep_calls, 0);
    }

    #[rstest]
    fn test_victim_is_always_unpinned() {
        let mut policy = full_pool_policy(8);
        let frames = frame_table(&[
            (true, 1),
            (true, 0),
            (true, 1),
            (true, 0),
            (true, 2),
            (true, 0),
            (true, 1),
            (true, 0),
        ]);

        for _ in 0..32 {
            let victim = policy.replace(&frames).unwrap();
            assert_eq!(frames[victim].read().unwrap().pin_count(), 0);
        }
        assert_eq!(policy.stats().rep_calls, 32);
    }

    #[rstest]
    fn test_single_unpinned_frame_found_by_fallback_scan() {
        let mut policy = full_pool_policy(8);
        // Only one eligible frame: even when every random draw misses it,
        // the linear sweep must land there.
        let mut states = vec![(true, 1); 8];
        states[6] = (true, 0);
        let frames = frame_table(&states);

        for _ in 0..16 {
            assert_eq!(policy.replace(&frames), Ok(6));
        }
    }

    #[rstest]
    fn test_all_pinned_fails_after_scan() {
        let mut policy = full_pool_policy(4);
        let frames = frame_table(&[(true, 1), (true, 1), (true, 1), (true, 1)]);
        assert_eq!(policy.replace(&frames), Err(ReplacerError::InsufficientSpace));
        // The failed call does not count as a replacement
        assert_eq!(policy.stats().rep_calls, 0);
    }

    #[rstest]
    fn test_probe_count_bounded_by_draw_cap_plus_scan() {
        let mut policy = full_pool_policy(8);
        let mut states = vec![(true, 1); 8];
        states[7] = (true, 0);
        let frames = frame_table(&states);

        policy.replace(&frames).unwrap();
        let stats = policy.stats();
        // At most 1 + 8/2 draws plus the 8-frame sweep
        assert!(stats.avg_frames_checked >= 1.0);
        assert!(stats.avg_frames_checked <= 13.0);
    }

    #[rstest]
    fn test_times_chosen_spreads_over_eligible_frames() {
        let mut policy = full_pool_policy(4);
        let frames = frame_table(&[(true, 0), (true, 0), (true, 0), (true, 0)]);

        for _ in 0..100 {
            policy.replace(&frames).unwrap();
        }
        let chosen: u32 = policy.times_chosen.iter().sum();
        assert_eq!(chosen, 100);
        // With a fair source no frame should be starved over 100 picks
        assert!(policy.times_chosen.iter().all(|&count| count > 0));
    }

    #[rstest]
    fn test_out_of_range_frame_rejected() {
        let mut policy = RandomPolicy::with_rng(3, StdRng::seed_from_u64(0));
        assert_eq!(policy.pin(3), Err(ReplacerError::FrameOutOfRange(3)));
        assert_eq!(policy.unpin(4), Err(ReplacerError::FrameOutOfRange(4)));
    }
}
