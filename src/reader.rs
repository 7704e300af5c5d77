use crate::state::{INACTIVE_EPOCH, ReaderSlot, SharedState};
use crate::sync::{Arc, Cell, Ordering, backoff, fence};

/// A registered reader of one reclamation domain.
///
/// Obtain one per thread from [`RcuList::register_reader`](crate::RcuList::register_reader)
/// or [`Library::register_reader`](crate::Library::register_reader) and keep it for the
/// thread's lifetime. A `Reader` is `!Sync` (it tracks nesting in a `Cell`), so each
/// thread needs its own.
///
/// A `Reader` only protects data of the domain it was registered with. Passing it,
/// or a guard opened on it, to a list of another domain panics.
///
/// Dropping a `Reader` releases its slot; the reclaimer prunes dead slots on a later
/// collection.
///
/// 某个回收域中已注册的读者。
/// 每个线程通过 [`RcuList::register_reader`](crate::RcuList::register_reader) 或
/// [`Library::register_reader`](crate::Library::register_reader) 获取一个，并在线程生命周期内持有。
/// `Reader` 是 `!Sync` 的（用 `Cell` 记录嵌套深度），因此每个线程都需要自己的实例。
/// `Reader` 只保护其注册所在域的数据；把它或它打开的守卫交给其他域的链表会 panic。
/// drop `Reader` 会释放其槽位，回收器会在之后的回收中清理失效槽位。
pub struct Reader {
    slot: Arc<ReaderSlot>,
    shared: Arc<SharedState>,
    depth: Cell<usize>,
}

impl Reader {
    pub(crate) fn new(shared: Arc<SharedState>) -> Self {
        let slot = Arc::new(ReaderSlot::new());

        shared.readers.lock().push(Arc::clone(&slot));

        Reader {
            slot,
            shared,
            depth: Cell::new(0),
        }
    }

    /// Begin a read-side critical section.
    ///
    /// While the returned guard (or any clone of it) is alive, nothing retired after
    /// this call can be reclaimed. Nested calls are allowed and the section ends
    /// when the last guard drops.
    ///
    /// Never blocks on writers. Do not perform a synchronous retirement or a barrier
    /// on the same list while holding a guard: the grace period would wait on this
    /// reader.
    ///
    /// **Example**:
    /// ```
    /// use rcu_shelf::RcuList;
    ///
    /// let list = RcuList::<u32>::new();
    /// let reader = list.register_reader();
    ///
    /// let outer = reader.read();
    /// let inner = reader.read(); // Reentrant call
    /// let cloned = outer.clone();
    /// drop(outer);
    /// drop(inner);
    /// assert!(reader.is_reading());
    /// drop(cloned);
    /// assert!(!reader.is_reading());
    /// ```
    ///
    /// 开始一个读侧临界区。
    ///
    /// 在返回的守卫（或其任何克隆）存活期间，此调用之后退役的对象都不会被回收。
    /// 允许嵌套调用，临界区在最后一个守卫 drop 时结束。
    ///
    /// 从不阻塞于写者。持有守卫时不要对同一链表执行同步退役或屏障：宽限期会等待此读者自身。
    #[inline]
    pub fn read(&self) -> ReadGuard<'_> {
        let depth = self.depth.get();

        if depth == 0 {
            let mut round = 0;
            loop {
                let current_epoch = self.shared.global_epoch.load(Ordering::SeqCst);
                self.slot
                    .active_epoch
                    .store(current_epoch, Ordering::SeqCst);
                // Orders the slot store before every pointer load inside the section.
                fence(Ordering::SeqCst);

                let min_active = self.shared.min_active_epoch.load(Ordering::Acquire);
                if current_epoch >= min_active {
                    break;
                }
                backoff(round);
                round += 1;
            }
        }

        self.depth.set(depth + 1);

        ReadGuard { reader: self }
    }

    /// Whether a read-side critical section is currently open on this reader.
    /// 此读者当前是否处于读侧临界区中。
    pub fn is_reading(&self) -> bool {
        self.depth.get() > 0
    }

    pub(crate) fn shared(&self) -> &SharedState {
        &self.shared
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("active_epoch", &self.slot.active_epoch.load(Ordering::Relaxed))
            .field("depth", &self.depth.get())
            .finish()
    }
}

/// An open read-side critical section.
///
/// References loaded from an [`RcuList`](crate::RcuList) borrow the guard, so the
/// compiler rejects any use of them after the section ends.
///
/// **Reentrancy**: cloning a guard nests the section; the reader stays active until
/// every clone has been dropped.
///
/// 一个打开的读侧临界区。
///
/// 从 [`RcuList`](crate::RcuList) 加载的引用借用此守卫，因此编译器会拒绝在临界区结束后使用它们。
///
/// **可重入性**：克隆守卫会嵌套临界区，读者在所有克隆都被 drop 之前保持活跃。
#[must_use]
pub struct ReadGuard<'r> {
    reader: &'r Reader,
}

impl ReadGuard<'_> {
    pub(crate) fn shared(&self) -> &SharedState {
        self.reader.shared()
    }
}

impl Clone for ReadGuard<'_> {
    /// Clone this guard, nesting the critical section.
    /// 克隆此守卫，嵌套临界区。
    #[inline]
    fn clone(&self) -> Self {
        let depth = self.reader.depth.get();

        assert!(
            depth > 0,
            "BUG: cloning a ReadGuard outside a critical section (depth = 0)"
        );

        self.reader.depth.set(depth + 1);

        ReadGuard {
            reader: self.reader,
        }
    }
}

impl Drop for ReadGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        let depth = self.reader.depth.get();

        assert!(
            depth > 0,
            "BUG: dropping a ReadGuard outside a critical section (depth = 0)"
        );

        if depth == 1 {
            self.reader
                .slot
                .active_epoch
                .store(INACTIVE_EPOCH, Ordering::Release);
        }

        self.reader.depth.set(depth - 1);
    }
}
