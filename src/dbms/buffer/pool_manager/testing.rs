use crate::dbms::buffer::replacer::PolicyKind;
use crate::dbms::storage::disk::testing::InMemoryDiskManager;

use super::{BufferManager, BufferPoolConfig};

/// Build a pool of the given size and policy over an in-memory disk.
pub fn create_testing_buffer_manager(pool_size: usize, policy: PolicyKind) -> BufferManager {
    let disk_manager = InMemoryDiskManager::new();
    BufferManager::new(
        Box::new(disk_manager),
        &BufferPoolConfig::new(pool_size, policy),
    )
}
