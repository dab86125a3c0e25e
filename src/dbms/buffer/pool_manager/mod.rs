mod buffer_manager;
pub mod testing;

pub use buffer_manager::{
    BufferManager, BufferManagerError, BufferPoolConfig, BufferState, IBufferManager,
    DEFAULT_POOL_SIZE,
};
