use crate::sync::{Arc, AtomicUsize, Mutex};
use std::vec::Vec;

/// Default threshold for automatic reclamation (count of pending retired objects).
/// 自动回收的默认阈值（待回收的退役对象数量）。
pub(crate) const AUTO_RECLAIM_THRESHOLD: usize = 64;

/// Default interval for pruning dead reader slots (in collection cycles).
/// 清理失效读者槽位的默认间隔（以回收周期计）。
pub(crate) const DEFAULT_CLEANUP_INTERVAL: usize = 16;

/// Marks a reader that is outside any read-side critical section.
/// 标记不在任何读侧临界区内的读者。
pub(crate) const INACTIVE_EPOCH: usize = usize::MAX;

/// Per-reader slot recording the epoch the reader entered its critical section in.
///
/// Cache-aligned to prevent false sharing between readers.
///
/// 每个读者的槽位，记录读者进入临界区时的纪元。
/// 按缓存行对齐以防止读者之间的伪共享。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct ReaderSlot {
    /// Epoch observed when the current critical section began, or `INACTIVE_EPOCH`.
    pub(crate) active_epoch: AtomicUsize,
}

impl ReaderSlot {
    pub(crate) fn new() -> Self {
        Self {
            active_epoch: AtomicUsize::new(INACTIVE_EPOCH),
        }
    }
}

/// State shared between a reclaimer and every reader registered with it.
///
/// Its address identifies the reclamation domain: a list accepts only guards whose
/// readers point at the same `SharedState` as its reclaimer.
///
/// 回收器与其所有已注册读者之间共享的状态。
/// 其地址标识回收域：链表只接受读者指向与其回收器相同 `SharedState` 的守卫。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct SharedState {
    /// Global monotonic epoch counter. Advanced by `synchronize` and `collect`.
    pub(crate) global_epoch: AtomicUsize,
    /// Minimum epoch among active readers as of the last collection.
    pub(crate) min_active_epoch: AtomicUsize,
    /// Every registered reader slot.
    pub(crate) readers: Mutex<Vec<Arc<ReaderSlot>>>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            global_epoch: AtomicUsize::new(0),
            min_active_epoch: AtomicUsize::new(0),
            readers: Mutex::new(Vec::new()),
        }
    }

    /// Clone the current slot list so callers can wait on it without holding the lock.
    /// 克隆当前槽位列表，以便调用者在不持有锁的情况下等待。
    pub(crate) fn reader_snapshot(&self) -> Vec<Arc<ReaderSlot>> {
        self.readers.lock().iter().map(Arc::clone).collect()
    }
}
