mod clock_policy;
mod lru_policy;
mod mru_policy;
mod random_policy;
mod replacement_policy;

pub use clock_policy::ClockPolicy;
pub use lru_policy::LruPolicy;
pub use mru_policy::MruPolicy;
pub use random_policy::RandomPolicy;
pub use replacement_policy::{
    IReplacementPolicy, PolicyKind, ReplacementStats, ReplacerError, UnknownPolicy,
};
