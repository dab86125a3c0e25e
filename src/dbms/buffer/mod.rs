pub mod buffer_map;
pub mod frame;
pub mod pool_manager;
pub mod replacer;
pub mod types;
