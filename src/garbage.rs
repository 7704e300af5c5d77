use std::boxed::Box;
use std::collections::VecDeque;
use std::vec::Vec;

/// An object unlinked from shared view but not yet destroyed.
///
/// Holds a type-erased pointer plus the function that finishes it: either dropping a
/// `Box<T>` or running a boxed reclamation callback.
///
/// 已从共享视图中摘除但尚未销毁的对象。
/// 持有一个类型擦除的指针以及完成它的函数：drop 一个 `Box<T>`，或运行一个装箱的回收回调。
pub(crate) struct RetiredObject {
    ptr: *mut (),
    finish: unsafe fn(*mut ()),
}

// SAFETY: constructors only accept `Send` payloads, and the pointer is uniquely owned.
unsafe impl Send for RetiredObject {}

#[inline(always)]
unsafe fn drop_value<T>(ptr: *mut ()) {
    unsafe {
        drop(Box::from_raw(ptr as *mut T));
    }
}

#[inline(always)]
unsafe fn run_callback<F: FnOnce()>(ptr: *mut ()) {
    let callback = unsafe { Box::from_raw(ptr as *mut F) };
    callback();
}

impl RetiredObject {
    #[inline(always)]
    pub(crate) fn new<T: Send + 'static>(value: Box<T>) -> Self {
        RetiredObject {
            ptr: Box::into_raw(value) as *mut (),
            finish: drop_value::<T>,
        }
    }

    #[inline(always)]
    pub(crate) fn callback<F: FnOnce() + Send + 'static>(callback: F) -> Self {
        RetiredObject {
            ptr: Box::into_raw(Box::new(callback)) as *mut (),
            finish: run_callback::<F>,
        }
    }
}

impl RetiredObject {
    /// Address of the retired value or callback.
    #[inline]
    pub(crate) fn addr(&self) -> *const () {
        self.ptr
    }
}

impl Drop for RetiredObject {
    #[inline(always)]
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: `ptr` came from `Box::into_raw` with the matching type and is
            // finished exactly once.
            unsafe {
                (self.finish)(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Retired objects grouped into bags by the epoch they were retired in.
/// 按退役纪元分组成袋的退役对象。
pub(crate) struct GarbageSet {
    /// Oldest epoch first.
    queue: VecDeque<(usize, Vec<RetiredObject>)>,
    /// Emptied bags kept for reuse.
    pool: Vec<Vec<RetiredObject>>,
    count: usize,
}

impl GarbageSet {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            pool: Vec::new(),
            count: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    /// Add a retired object to the bag for `epoch`, opening a new bag if the newest
    /// one belongs to an older epoch.
    ///
    /// 将退役对象加入 `epoch` 对应的袋中；若最新的袋属于更早的纪元则新开一个袋。
    pub(crate) fn add(&mut self, object: RetiredObject, epoch: usize) {
        match self.queue.back_mut() {
            Some((last_epoch, bag)) if *last_epoch == epoch => bag.push(object),
            _ => {
                let mut bag = self.pool.pop().unwrap_or_else(|| Vec::with_capacity(16));
                bag.push(object);
                self.queue.push_back((epoch, bag));
            }
        }

        self.count += 1;
    }

    /// Destroy every bag retired before `min_active_epoch`.
    ///
    /// When no reader is active (`min_active_epoch == current_epoch`) everything goes.
    /// Returns the number of objects destroyed.
    ///
    /// 销毁所有在 `min_active_epoch` 之前退役的袋。
    /// 当没有活跃读者时（`min_active_epoch == current_epoch`）全部回收。
    /// 返回被销毁的对象数量。
    pub(crate) fn collect(&mut self, min_active_epoch: usize, current_epoch: usize) -> usize {
        fn recycle_bag(mut bag: Vec<RetiredObject>, pool: &mut Vec<Vec<RetiredObject>>) -> usize {
            let n = bag.len();
            for object in &bag {
                log::trace!("deferred free : {:p}", object.addr());
            }
            bag.clear();
            pool.push(bag);
            n
        }

        let mut reclaimed = 0;

        if min_active_epoch == current_epoch {
            while let Some((_, bag)) = self.queue.pop_front() {
                reclaimed += recycle_bag(bag, &mut self.pool);
            }
        } else if min_active_epoch > 0 {
            let safe_epoch = min_active_epoch - 1;
            while self
                .queue
                .front()
                .is_some_and(|(epoch, _)| *epoch <= safe_epoch)
            {
                if let Some((_, bag)) = self.queue.pop_front() {
                    reclaimed += recycle_bag(bag, &mut self.pool);
                }
            }
        }

        self.count -= reclaimed;
        reclaimed
    }
}
