use std::sync::RwLock;

use crate::dbms::buffer::frame::Frame;
use crate::dbms::types::FrameId;

use super::replacement_policy::{
    IReplacementPolicy, PolicyKind, ReplacementStats, ReplacerCore, ReplacerError,
};

/// Second-chance approximation of LRU. A reference bit per frame is set
/// when the frame's last pin is dropped; the clock hand sweeps the table
/// circularly, sparing referenced frames once (clearing the bit) and
/// evicting the first unpinned frame found with its bit clear. Pinned
/// frames are traversed without touching their bits.
pub struct ClockPolicy {
    core: ReplacerCore,
    clock_hand: FrameId,
    ref_bits: Vec<bool>,
}

enum Probe {
    Pinned,
    Referenced,
    Victim,
}

impl ClockPolicy {
    pub fn new(pool_size: usize) -> Self {
        Self {
            core: ReplacerCore::new(pool_size),
            clock_hand: 0,
            ref_bits: vec![false; pool_size],
        }
    }

    fn advance(&mut self) {
        self.clock_hand = (self.clock_hand + 1) % self.core.pool_size();
    }
}

impl IReplacementPolicy for ClockPolicy {
    fn replace(&mut self, frames: &[RwLock<Frame>]) -> Result<FrameId, ReplacerError> {
        if let Some(frame_id) = self.core.pop_free() {
            return Ok(frame_id);
        }

        // A full lap of nothing but pinned frames means no victim can
        // exist; any unpinned probe (even one merely spared) breaks the
        // streak and the sweep carries on. An invalid frame met here is
        // free and is taken immediately.
        let mut pinned_streak = 0;
        let mut probes: u64 = 0;
        loop {
            let hand = self.clock_hand;
            let probe = {
                let frame = frames[hand].read().unwrap();
                if frame.pin_count() > 0 {
                    Probe::Pinned
                } else if frame.is_valid() && self.ref_bits[hand] {
                    Probe::Referenced
                } else {
                    Probe::Victim
                }
            };
            probes += 1;

            match probe {
                Probe::Pinned => {
                    pinned_streak += 1;
                    self.advance();
                    if pinned_streak >= frames.len() {
                        return Err(ReplacerError::InsufficientSpace);
                    }
                }
                Probe::Referenced => {
                    pinned_streak = 0;
                    self.ref_bits[hand] = false;
                    self.advance();
                }
                Probe::Victim => {
                    self.core.record_replacement(probes);
                    self.advance();
                    return Ok(hand);
                }
            }
        }
    }

    fn pin(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        // Pinning leaves the ref bit alone
        self.core.check_bounds(frame_id)
    }

    fn unpin(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.core.check_bounds(frame_id)?;
        self.ref_bits[frame_id] = true;
        Ok(())
    }

    fn free_frame(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.core.check_bounds(frame_id)?;
        self.core.push_free(frame_id);
        self.ref_bits[frame_id] = false;
        Ok(())
    }

    fn record_page_request(&mut self) {
        self.core.record_page_request();
    }

    fn stats(&self) -> ReplacementStats {
        let mut stats = self.core.stats(PolicyKind::Clock);
        stats.ref_bit_count = self.ref_bits.iter().filter(|&&bit| bit).count() as u32;
        stats.clock_hand = self.clock_hand;
        stats
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Clock
    }

    fn describe_frame(&self, frame_id: FrameId) -> String {
        match self.ref_bits.get(frame_id) {
            Some(bit) => format!("ref_bit: {}", bit),
            None => String::new(),
        }
    }
}
