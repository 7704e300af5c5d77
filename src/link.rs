use crate::reader::ReadGuard;
use crate::sync::{AtomicPtr, Ordering};
use crate::writer::WriteToken;
use std::ptr;

/// A nullable atomic pointer to a heap node shared with readers.
///
/// Readers load it inside a read-side critical section; writers change it only
/// while holding the collection's [`WriteToken`]. The link never owns its target:
/// the list that contains it decides when a node is freed.
pub(crate) struct Link<T> {
    ptr: AtomicPtr<T>,
}

impl<T> Link<T> {
    #[inline]
    pub(crate) fn null() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Reader load.
    ///
    /// The result borrows both the link and the guard, so it cannot be used after
    /// the critical section ends or after the owning collection is dropped.
    #[inline]
    pub(crate) fn load<'a>(&'a self, _guard: &'a ReadGuard<'_>) -> Option<&'a T> {
        let target = self.ptr.load(Ordering::Acquire);
        // SAFETY: targets are published with a Release store of a fully built node, and
        // the reclaimer does not free an unlinked node while `_guard` is open.
        unsafe { target.as_ref() }
    }

    /// Writer load. All stores happen under the same lock, so the lock orders them.
    #[inline]
    pub(crate) fn load_raw(&self, _token: &WriteToken<'_>) -> *mut T {
        self.ptr.load(Ordering::Relaxed)
    }

    /// Publish `target`. Everything written to `*target` before this call is visible to
    /// readers that load it.
    #[inline]
    pub(crate) fn store(&self, target: *mut T, _token: &WriteToken<'_>) {
        self.ptr.store(target, Ordering::Release);
    }

    /// Swap `current` for `new` in one step, returning the value actually found.
    #[inline]
    pub(crate) fn compare_exchange(
        &self,
        current: *mut T,
        new: *mut T,
        _token: &WriteToken<'_>,
    ) -> Result<*mut T, *mut T> {
        self.ptr
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Relaxed)
    }

    /// Load with exclusive access, used while tearing down.
    #[inline]
    pub(crate) fn take(&mut self) -> *mut T {
        let target = self.ptr.load(Ordering::Relaxed);
        self.ptr.store(ptr::null_mut(), Ordering::Relaxed);
        target
    }
}

impl<T> std::fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = self.ptr.load(Ordering::Relaxed);
        f.debug_tuple("Link").field(&target).finish()
    }
}
