use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use crate::dbms::storage::disk::IDiskManager;

use super::frame::Frame;
use super::replacer::IReplacementPolicy;

pub type PolicyGeneric = Box<dyn IReplacementPolicy + Send + Sync>;
pub type DiskManagerGeneric = Box<dyn IDiskManager + Send + Sync>;

/// Read access to a resident page's frame. Valid only while held; the pin
/// count, not the guard, is what keeps the page resident.
pub type PageReadGuard<'a> = RwLockReadGuard<'a, Frame>;
/// Write access to a resident page's frame.
pub type PageWriteGuard<'a> = RwLockWriteGuard<'a, Frame>;
