use crate::garbage::{GarbageSet, RetiredObject};
use crate::reader::Reader;
use crate::state::{AUTO_RECLAIM_THRESHOLD, DEFAULT_CLEANUP_INTERVAL, INACTIVE_EPOCH, SharedState};
use crate::sync::{Arc, AtomicUsize, Mutex, Ordering, backoff, fence};
use std::boxed::Box;

/// How a retired object is reclaimed.
/// 退役对象的回收方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetireMode {
    /// Block the retiring writer for one grace period, then destroy the object inline.
    /// 阻塞退役的写者一个宽限期，然后就地销毁对象。
    Synchronous,
    /// Queue the object and return at once; a later collection destroys it.
    /// 将对象入队并立即返回，由之后的回收销毁。
    Deferred,
}

impl std::fmt::Display for RetireMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetireMode::Synchronous => f.write_str("synchronous"),
            RetireMode::Deferred => f.write_str("deferred"),
        }
    }
}

/// Tuning for a [`Reclaimer`].
///
/// - `auto_reclaim_threshold`: pending count that triggers an automatic collection
/// - `cleanup_interval`: how often dead reader slots are pruned
///
/// # Example
/// ```
/// use rcu_shelf::ReclaimConfig;
///
/// let config = ReclaimConfig::new()
///     .auto_reclaim_threshold(128)
///     .cleanup_interval(32);
/// ```
///
/// [`Reclaimer`] 的调优参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimConfig {
    auto_reclaim_threshold: Option<usize>,
    cleanup_interval: usize,
}

impl ReclaimConfig {
    /// Default settings: threshold `Some(64)`, cleanup every `16` collections.
    /// 默认设置：阈值 `Some(64)`，每 `16` 次回收清理一次。
    #[inline]
    pub fn new() -> Self {
        Self {
            auto_reclaim_threshold: Some(AUTO_RECLAIM_THRESHOLD),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }

    /// Run a collection whenever more than `threshold` deferred objects are pending.
    ///
    /// Pass `None` to leave collection to explicit calls or a background worker.
    ///
    /// Default: `Some(64)`
    ///
    /// 当待回收对象超过 `threshold` 时自动执行一次回收。
    /// 传递 `None` 则交由显式调用或后台线程回收。
    #[inline]
    pub fn auto_reclaim_threshold(mut self, threshold: impl Into<Option<usize>>) -> Self {
        self.auto_reclaim_threshold = threshold.into();
        self
    }

    /// Prune slots of dropped readers every `interval` collections. `0` disables pruning.
    ///
    /// Default: `16`
    ///
    /// 每 `interval` 次回收清理一次已 drop 读者的槽位。`0` 表示禁用清理。
    #[inline]
    pub fn cleanup_interval(mut self, interval: usize) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters describing a reclaimer's progress, as returned by [`Reclaimer::stats`].
///
/// The fields are read one after another without a common lock, so under concurrent
/// use they form an approximate picture rather than one atomic snapshot.
///
/// 描述回收器进度的计数器，由 [`Reclaimer::stats`] 返回。
/// 各字段依次读取，不共享同一把锁，并发使用时只是近似值而非原子快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReclaimStats {
    /// Deferred objects waiting for their grace period.
    pub pending: usize,
    /// Objects destroyed so far, synchronous and deferred.
    pub reclaimed: usize,
    /// Completed `synchronize` calls.
    pub grace_periods: usize,
    /// Current global epoch.
    pub epoch: usize,
    /// Registered reader slots, including dropped readers not yet pruned.
    pub readers: usize,
}

struct GarbageState {
    set: GarbageSet,
    collections: usize,
}

/// Grace-period tracker and deferred-free queue for one domain.
///
/// Every reader registered here publishes the epoch its critical section started
/// in. An object retired at epoch `e` is destroyed only once no reader is still
/// active at an epoch `<= e`.
///
/// A `Reclaimer` is shared (`Arc`) by the lists built on it; dropping the last
/// reference destroys everything still pending.
///
/// 单个回收域的宽限期跟踪器与延迟释放队列。
///
/// 在此注册的每个读者都会发布其临界区开始时的纪元。在纪元 `e` 退役的对象，
/// 只有在不再有读者活跃于 `<= e` 的纪元时才会被销毁。
/// `Reclaimer` 由构建于其上的链表共享（`Arc`），最后一个引用被 drop 时会销毁所有待回收对象。
pub struct Reclaimer {
    shared: Arc<SharedState>,
    garbage: Mutex<GarbageState>,
    auto_reclaim_threshold: Option<usize>,
    cleanup_interval: usize,
    reclaimed: AtomicUsize,
    grace_periods: AtomicUsize,
}

impl Reclaimer {
    /// Create a reclaimer with no readers and an empty garbage set.
    ///
    /// `config` fixes the automatic collection threshold and the slot cleanup
    /// interval for the reclaimer's lifetime.
    ///
    /// # Example
    /// ```
    /// use rcu_shelf::{ReclaimConfig, Reclaimer, RetireMode};
    ///
    /// let reclaimer = Reclaimer::new(ReclaimConfig::new().auto_reclaim_threshold(None));
    /// reclaimer.retire(Box::new(42u64), RetireMode::Deferred);
    /// assert_eq!(reclaimer.pending(), 1);
    /// assert_eq!(reclaimer.collect(), 1);
    /// ```
    ///
    /// 创建一个没有读者、垃圾集为空的回收器。
    /// `config` 在回收器的生命周期内固定自动回收阈值和槽位清理间隔。
    pub fn new(config: ReclaimConfig) -> Self {
        Self {
            shared: Arc::new(SharedState::new()),
            garbage: Mutex::new(GarbageState {
                set: GarbageSet::new(),
                collections: 0,
            }),
            auto_reclaim_threshold: config.auto_reclaim_threshold,
            cleanup_interval: config.cleanup_interval,
            reclaimed: AtomicUsize::new(0),
            grace_periods: AtomicUsize::new(0),
        }
    }

    /// Register a reader with this domain.
    /// 在此域中注册一个读者。
    #[inline]
    pub fn register_reader(&self) -> Reader {
        Reader::new(Arc::clone(&self.shared))
    }

    pub(crate) fn owns(&self, shared: &SharedState) -> bool {
        std::ptr::eq(&*self.shared, shared)
    }

    /// Retire an object that is no longer reachable by new readers.
    ///
    /// The caller must have unlinked `value` before calling, and must not hold a read
    /// guard of this domain when `mode` is [`RetireMode::Synchronous`].
    ///
    /// 退役一个新读者已无法访问的对象。
    /// 调用者必须在调用前摘除 `value`；`mode` 为同步时不得持有此域的读守卫。
    pub fn retire<T: Send + 'static>(&self, value: Box<T>, mode: RetireMode) {
        match mode {
            RetireMode::Synchronous => {
                self.synchronize();
                drop(value);
                self.reclaimed.fetch_add(1, Ordering::Relaxed);
            }
            RetireMode::Deferred => self.enqueue(RetiredObject::new(value)),
        }
    }

    /// Run `callback` once every reader active now has left its critical section.
    ///
    /// The callback runs on whichever thread performs the collection and must not call
    /// back into this reclaimer.
    ///
    /// 在当前所有活跃读者离开临界区后运行 `callback`。
    pub fn defer<F: FnOnce() + Send + 'static>(&self, callback: F, mode: RetireMode) {
        match mode {
            RetireMode::Synchronous => {
                self.synchronize();
                callback();
                self.reclaimed.fetch_add(1, Ordering::Relaxed);
            }
            RetireMode::Deferred => self.enqueue(RetiredObject::callback(callback)),
        }
    }

    fn enqueue(&self, object: RetiredObject) {
        let mut garbage = self.garbage.lock();

        // Orders the caller's unlink before the epoch read.
        fence(Ordering::SeqCst);
        let epoch = self.shared.global_epoch.load(Ordering::SeqCst);
        garbage.set.add(object, epoch);
        log::trace!("retired object at epoch {epoch}, {} pending", garbage.set.len());

        if let Some(threshold) = self.auto_reclaim_threshold {
            if garbage.set.len() > threshold {
                self.collect_locked(&mut garbage);
            }
        }
    }

    /// Wait for a full grace period.
    ///
    /// Advances the epoch and blocks until every reader that was inside a critical
    /// section at the time of the call has left it. Readers that enter afterwards are
    /// not waited on.
    ///
    /// 等待一个完整的宽限期：推进纪元，并阻塞直到调用时处于临界区的每个读者都已离开。
    pub fn synchronize(&self) {
        let target = self.shared.global_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        fence(Ordering::SeqCst);

        for slot in self.shared.reader_snapshot() {
            let mut round = 0;
            loop {
                let epoch = slot.active_epoch.load(Ordering::SeqCst);
                if epoch == INACTIVE_EPOCH || epoch >= target {
                    break;
                }
                backoff(round);
                round += 1;
            }
        }

        fence(Ordering::Acquire);
        self.grace_periods.fetch_add(1, Ordering::Relaxed);
        log::trace!("grace period complete at epoch {target}");
    }

    /// Destroy every deferred object whose grace period has elapsed.
    ///
    /// Never blocks on readers. Returns the number of objects destroyed.
    ///
    /// 销毁所有宽限期已过的延迟对象。从不阻塞于读者，返回销毁的对象数量。
    pub fn collect(&self) -> usize {
        let mut garbage = self.garbage.lock();
        self.collect_locked(&mut garbage)
    }

    fn collect_locked(&self, garbage: &mut GarbageState) -> usize {
        let new_epoch = self.shared.global_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        fence(Ordering::SeqCst);

        let mut min_active_epoch = new_epoch;
        garbage.collections += 1;

        let should_cleanup =
            self.cleanup_interval > 0 && garbage.collections % self.cleanup_interval == 0;

        let mut readers = self.shared.readers.lock();
        let mut dead = 0;

        for slot in readers.iter() {
            let epoch = slot.active_epoch.load(Ordering::SeqCst);
            if epoch != INACTIVE_EPOCH {
                min_active_epoch = min_active_epoch.min(epoch);
            } else if should_cleanup && Arc::strong_count(slot) == 1 {
                // Only the list holds it: the reader was dropped.
                dead += 1;
            }
        }

        if dead > 0 {
            readers.retain(|slot| Arc::strong_count(slot) > 1);
        }

        drop(readers);

        self.shared
            .min_active_epoch
            .store(min_active_epoch, Ordering::Release);

        let reclaimed = garbage.set.collect(min_active_epoch, new_epoch);
        if reclaimed > 0 {
            self.reclaimed.fetch_add(reclaimed, Ordering::Relaxed);
        }
        log::debug!(
            "collection at epoch {new_epoch}: min active {min_active_epoch}, reclaimed {reclaimed}, {} pending, pruned {dead} readers",
            garbage.set.len()
        );

        reclaimed
    }

    /// Wait until everything retired in deferred mode before this call is destroyed.
    ///
    /// Same caller contract as synchronous retirement: no read guard of this domain
    /// may be held by the calling thread.
    ///
    /// 等待直到此调用之前以延迟方式退役的所有对象都被销毁。
    pub fn barrier(&self) -> usize {
        self.synchronize();
        self.collect()
    }

    /// Number of deferred objects still waiting for their grace period.
    /// 仍在等待宽限期的延迟对象数量。
    pub fn pending(&self) -> usize {
        self.garbage.lock().set.len()
    }

    /// Snapshot of the reclaimer's counters.
    ///
    /// `reclaimed` counts objects destroyed by both modes; `grace_periods` counts
    /// completed [`synchronize`](Self::synchronize) calls, including those made by
    /// synchronous retirement and [`barrier`](Self::barrier).
    ///
    /// 回收器计数器的快照。`reclaimed` 统计两种模式下销毁的对象；
    /// `grace_periods` 统计完成的 `synchronize` 调用，包括同步退役和 `barrier` 中的调用。
    pub fn stats(&self) -> ReclaimStats {
        ReclaimStats {
            pending: self.pending(),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            grace_periods: self.grace_periods.load(Ordering::Relaxed),
            epoch: self.shared.global_epoch.load(Ordering::Relaxed),
            readers: self.shared.readers.lock().len(),
        }
    }
}

impl Default for Reclaimer {
    fn default() -> Self {
        Self::new(ReclaimConfig::default())
    }
}

impl std::fmt::Debug for Reclaimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reclaimer")
            .field("stats", &self.stats())
            .field("auto_reclaim_threshold", &self.auto_reclaim_threshold)
            .field("cleanup_interval", &self.cleanup_interval)
            .finish()
    }
}
