use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use thiserror::Error;

use crate::dbms::buffer::frame::Frame;
use crate::dbms::types::FrameId;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ReplacerError {
    /// Frame id does not address a slot of this pool
    #[error("frame id {0} is out of range")]
    FrameOutOfRange(FrameId),
    /// Every frame is pinned; no victim exists
    #[error("every frame in the buffer pool is pinned")]
    InsufficientSpace,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("unknown replacement policy {0:?}")]
pub struct UnknownPolicy(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Clock,
    Random,
    Lru,
    Mru,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyKind::Clock => "CLOCK",
            PolicyKind::Random => "RANDOM",
            PolicyKind::Lru => "LRU",
            PolicyKind::Mru => "MRU",
        };
        f.write_str(name)
    }
}

impl FromStr for PolicyKind {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clock" => Ok(PolicyKind::Clock),
            "random" => Ok(PolicyKind::Random),
            "lru" => Ok(PolicyKind::Lru),
            "mru" => Ok(PolicyKind::Mru),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Snapshot of a policy's counters, reported through the buffer state.
/// `ref_bit_count` and `clock_hand` are only meaningful for CLOCK and are
/// zero elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementStats {
    pub kind: PolicyKind,
    pub rep_calls: u64,
    pub new_page_calls: u64,
    pub avg_frames_checked: f64,
    pub ref_bit_count: u32,
    pub clock_hand: FrameId,
}

impl fmt::Display for ReplacementStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Replacement policy: {}", self.kind)?;
        writeln!(f, "Calls to replacement policy: {}", self.rep_calls)?;
        writeln!(f, "Page requests (get/allocate): {}", self.new_page_calls)?;
        write!(
            f,
            "Average frames checked per call: {:.2}",
            self.avg_frames_checked
        )?;
        if self.kind == PolicyKind::Clock {
            writeln!(f)?;
            writeln!(f, "Frames with ref bit set: {}", self.ref_bit_count)?;
            write!(f, "Clock hand position: {}", self.clock_hand)?;
        }
        Ok(())
    }
}

/// Chooses victim frames when the pool is full. The manager calls these
/// under its own exclusion; `replace` gets the frame table as a shared
/// borrow for the duration of the call and must return a frame that is
/// either invalid (free) or valid and unpinned.
pub trait IReplacementPolicy {
    /// Select a frame to hand back to the pool, free frames first.
    fn replace(&mut self, frames: &[RwLock<Frame>]) -> Result<FrameId, ReplacerError>;
    /// A frame's pin count just went from 0 to 1.
    fn pin(&mut self, frame_id: FrameId) -> Result<(), ReplacerError>;
    /// A frame's pin count just went from 1 to 0; it is now replacement
    /// eligible.
    fn unpin(&mut self, frame_id: FrameId) -> Result<(), ReplacerError>;
    /// The frame was invalidated by the pool and goes back on the free
    /// list.
    fn free_frame(&mut self, frame_id: FrameId) -> Result<(), ReplacerError>;
    /// A get or allocate succeeded; feeds the replacement-rate statistic.
    fn record_page_request(&mut self);
    /// Counter snapshot for the buffer state.
    fn stats(&self) -> ReplacementStats;
    fn kind(&self) -> PolicyKind;

    /// Policy-specific per-frame state, for diagnostics.
    fn describe_frame(&self, _frame_id: FrameId) -> String {
        String::new()
    }

    /// Human-readable statistics dump.
    fn stats_summary(&self) -> String {
        self.stats().to_string()
    }
}

/// State every policy carries: the free list of invalid frames and the
/// shared counters. Concrete policies embed one of these.
pub struct ReplacerCore {
    pool_size: usize,
    free: VecDeque<FrameId>,
    rep_calls: u64,
    new_page_calls: u64,
    avg_frames_checked: f64,
}

impl ReplacerCore {
    /// At construction every frame is invalid, so all of them seed the
    /// free list in index order.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            free: (0..pool_size).collect(),
            rep_calls: 0,
            new_page_calls: 0,
            avg_frames_checked: 0.0,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn pop_free(&mut self) -> Option<FrameId> {
        self.free.pop_front()
    }

    pub fn push_free(&mut self, frame_id: FrameId) {
        self.free.push_back(frame_id);
    }

    pub fn check_bounds(&self, frame_id: FrameId) -> Result<(), ReplacerError> {
        if frame_id >= self.pool_size {
            return Err(ReplacerError::FrameOutOfRange(frame_id));
        }
        Ok(())
    }

    /// Fold one successful replacement into the running mean of probes
    /// per call. Free-list pops bypass this entirely.
    pub fn record_replacement(&mut self, probes: u64) {
        self.rep_calls += 1;
        self.avg_frames_checked +=
            (probes as f64 - self.avg_frames_checked) / self.rep_calls as f64;
    }

    pub fn record_page_request(&mut self) {
        self.new_page_calls += 1;
    }

    pub fn stats(&self, kind: PolicyKind) -> ReplacementStats {
        ReplacementStats {
            kind,
            rep_calls: self.rep_calls,
            new_page_calls: self.new_page_calls,
            avg_frames_checked: self.avg_frames_checked,
            ref_bit_count: 0,
            clock_hand: 0,
        }
    }
}
