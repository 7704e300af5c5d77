use crate::link::Link;
use crate::reader::{ReadGuard, Reader};
use crate::reclaim::{ReclaimConfig, Reclaimer, RetireMode};
use crate::state::SharedState;
use crate::sync::{Arc, AtomicUsize, Ordering};
use crate::writer::{WriteToken, WriterLock};
use std::boxed::Box;
use std::convert::Infallible;
use std::marker::PhantomData;

struct Node<T> {
    value: T,
    next: Link<Node<T>>,
}

impl<T> Node<T> {
    fn boxed(value: T) -> *mut Node<T> {
        Box::into_raw(Box::new(Node {
            value,
            next: Link::null(),
        }))
    }
}

/// A singly linked list with lock-free readers and copy-on-write updates.
///
/// Readers traverse inside a read-side critical section ([`Reader::read`]) and never
/// block. Writers are serialized by an internal [`WriterLock`]; every change becomes
/// visible through a single atomic link store, so a concurrent reader sees each slot
/// either before or after the change. Unlinked nodes are handed to the list's
/// [`Reclaimer`] and freed once no reader can still hold them.
///
/// New elements go to the front. Elements are never mutated after publication; use
/// [`RcuList::update`] to replace one with a modified copy.
///
/// ```
/// use rcu_shelf::{RcuList, RetireMode};
///
/// let list = RcuList::new();
/// let reader = list.register_reader();
///
/// list.push_front(1u32);
/// list.push_front(2u32);
///
/// let updated = list.update(&reader, RetireMode::Synchronous, |v| *v == 1, |v| {
///     Ok::<_, ()>(v + 10)
/// });
/// assert_eq!(updated, Ok(true));
///
/// let guard = reader.read();
/// let values: Vec<u32> = list.iter(&guard).copied().collect();
/// assert_eq!(values, [2, 11]);
/// ```
pub struct RcuList<T> {
    head: Link<Node<T>>,
    writer: WriterLock,
    reclaimer: Arc<Reclaimer>,
    len: AtomicUsize,
    _owns: PhantomData<*const T>,
}

// SAFETY: the list owns its `T`s; they may be dropped on any thread.
unsafe impl<T: Send> Send for RcuList<T> {}
// SAFETY: readers on many threads share `&T`, and writers on any thread move `T` in
// and out through `&RcuList`.
unsafe impl<T: Send + Sync> Sync for RcuList<T> {}

impl<T: Send + 'static> RcuList<T> {
    pub fn new() -> Self {
        Self::with_config(ReclaimConfig::default())
    }

    pub fn with_config(config: ReclaimConfig) -> Self {
        Self::with_reclaimer(Arc::new(Reclaimer::new(config)))
    }

    /// Build a list on an existing reclaimer, which may be shared with other lists.
    pub fn with_reclaimer(reclaimer: Arc<Reclaimer>) -> Self {
        Self {
            head: Link::null(),
            writer: WriterLock::new(),
            reclaimer,
            len: AtomicUsize::new(0),
            _owns: PhantomData,
        }
    }

    /// Register a reader for the calling thread.
    pub fn register_reader(&self) -> Reader {
        self.reclaimer.register_reader()
    }

    pub fn reclaimer(&self) -> &Reclaimer {
        &self.reclaimer
    }

    pub(crate) fn shared_reclaimer(&self) -> &Arc<Reclaimer> {
        &self.reclaimer
    }

    /// Number of linked elements. Retired elements awaiting reclamation are not counted.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the elements visible to this critical section, front to back.
    ///
    /// # Panics
    ///
    /// Panics if `guard` was opened on a reader of a different reclaimer.
    pub fn iter<'a>(&'a self, guard: &'a ReadGuard<'_>) -> Iter<'a, T> {
        self.check_guard(guard.shared());
        Iter {
            next: self.head.load(guard),
            guard,
        }
    }

    /// First element matching `pred`.
    pub fn find<'a>(
        &'a self,
        guard: &'a ReadGuard<'_>,
        mut pred: impl FnMut(&T) -> bool,
    ) -> Option<&'a T> {
        self.find_node(guard, &mut pred).map(|node| &node.value)
    }

    fn find_node<'a>(
        &'a self,
        guard: &'a ReadGuard<'_>,
        pred: &mut impl FnMut(&T) -> bool,
    ) -> Option<&'a Node<T>> {
        self.check_guard(guard.shared());
        let mut cursor = self.head.load(guard);
        while let Some(node) = cursor {
            if pred(&node.value) {
                return Some(node);
            }
            cursor = node.next.load(guard);
        }
        None
    }

    /// Publish `value` at the front.
    pub fn push_front(&self, value: T) {
        match self.push_front_checked(value, |_| Ok::<(), Infallible>(())) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Publish `value` at the front if `admit` accepts the current length.
    ///
    /// `admit` runs under the writer lock, so the length it sees cannot change
    /// before the element is linked. On rejection the value is dropped unpublished.
    pub fn push_front_checked<E>(
        &self,
        value: T,
        admit: impl FnOnce(usize) -> Result<(), E>,
    ) -> Result<(), E> {
        let node = Node::boxed(value);

        let admitted = self.writer.with(|token| -> Result<(), E> {
            admit(self.len.load(Ordering::Relaxed))?;
            let head = self.head.load_raw(token);
            // SAFETY: `node` is not reachable by anyone else yet.
            unsafe { (*node).next.store(head, token) };
            self.head.store(node, token);
            self.len.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

        if admitted.is_err() {
            // SAFETY: the node was never linked.
            drop(unsafe { Box::from_raw(node) });
        }
        admitted
    }

    /// Replace the first element matching `pred` with `copy(element)`.
    ///
    /// The match is found inside a critical section of `reader`; the copy is then
    /// swapped into the old element's slot under the writer lock with one
    /// compare-and-swap, so readers see either the old or the new element. If
    /// another writer replaced or removed the element in between, the copy is
    /// discarded and the lookup starts over. The old element is retired with `mode`
    /// after the critical section ends.
    ///
    /// Returns `Ok(false)` if nothing matches, or the first error from `copy`.
    ///
    /// With [`RetireMode::Synchronous`], `reader` must not already be inside a
    /// critical section.
    ///
    /// # Panics
    ///
    /// Panics if `reader` was registered with a different reclaimer.
    pub fn update<E>(
        &self,
        reader: &Reader,
        mode: RetireMode,
        mut pred: impl FnMut(&T) -> bool,
        mut copy: impl FnMut(&T) -> Result<T, E>,
    ) -> Result<bool, E> {
        self.check_guard(reader.shared());
        debug_assert!(
            !(mode == RetireMode::Synchronous && reader.is_reading()),
            "synchronous update from inside a read-side critical section would wait on itself"
        );

        loop {
            let guard = reader.read();
            let Some(old) = self.find_node(&guard, &mut pred) else {
                return Ok(false);
            };
            let new = Node::boxed(copy(&old.value)?);
            let old = old as *const Node<T> as *mut Node<T>;

            let swapped = self
                .writer
                .with(|token| self.replace_locked(token, old, new));
            drop(guard);

            if swapped {
                // SAFETY: `old` is unlinked and only reachable by pre-existing readers,
                // which the reclaimer waits for.
                self.retire(unsafe { Box::from_raw(old) }, mode);
                return Ok(true);
            }

            // SAFETY: `new` was never linked.
            drop(unsafe { Box::from_raw(new) });
            log::trace!("copy-on-write lost a race with another writer, retrying");
        }
    }

    fn replace_locked(&self, token: &WriteToken<'_>, old: *mut Node<T>, new: *mut Node<T>) -> bool {
        let mut link = &self.head;
        loop {
            let current = link.load_raw(token);
            if current.is_null() {
                return false;
            }
            // SAFETY: linked nodes are only unlinked under the writer lock, which we hold.
            let node = unsafe { &*current };
            if current == old {
                // SAFETY: `new` is not published until the exchange below.
                unsafe { (*new).next.store(node.next.load_raw(token), token) };
                return link.compare_exchange(old, new, token).is_ok();
            }
            link = &node.next;
        }
    }

    /// Unlink the first element matching `pred` and retire it with `mode`.
    ///
    /// Returns whether an element was removed. `pred` runs under the writer lock.
    pub fn remove(&self, mode: RetireMode, mut pred: impl FnMut(&T) -> bool) -> bool {
        let unlinked = self.writer.with(|token| self.unlink_locked(token, &mut pred));

        match unlinked {
            Some(node) => {
                self.retire(node, mode);
                true
            }
            None => false,
        }
    }

    fn unlink_locked(
        &self,
        token: &WriteToken<'_>,
        pred: &mut impl FnMut(&T) -> bool,
    ) -> Option<Box<Node<T>>> {
        let mut link = &self.head;
        loop {
            let current = link.load_raw(token);
            if current.is_null() {
                return None;
            }
            // SAFETY: see `replace_locked`.
            let node = unsafe { &*current };
            if pred(&node.value) {
                link.store(node.next.load_raw(token), token);
                self.len.fetch_sub(1, Ordering::Relaxed);
                // SAFETY: unlinked; ownership moves to the reclaimer.
                return Some(unsafe { Box::from_raw(current) });
            }
            link = &node.next;
        }
    }

    fn retire(&self, node: Box<Node<T>>, mode: RetireMode) {
        log::trace!("retiring node {:p} ({mode})", &*node);
        self.reclaimer.retire(node, mode);
    }

    /// A guard of another domain does not hold back this list's reclaimer.
    #[inline]
    fn check_guard(&self, shared: &SharedState) {
        assert!(
            self.reclaimer.owns(shared),
            "reader belongs to a different reclamation domain"
        );
    }
}

impl<T: Send + 'static> Default for RcuList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RcuList<T> {
    fn drop(&mut self) {
        // `&mut self` rules out readers borrowing from the list.
        let mut current = self.head.take();
        while !current.is_null() {
            // SAFETY: every linked node came from `Node::boxed` and is owned by the list.
            let mut node = unsafe { Box::from_raw(current) };
            current = node.next.take();
        }
    }
}

impl<T> std::fmt::Debug for RcuList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RcuList")
            .field("len", &self.len.load(Ordering::Relaxed))
            .field("head", &self.head)
            .field("reclaimer", &self.reclaimer)
            .finish()
    }
}

/// Iterator over an [`RcuList`] within one read-side critical section.
pub struct Iter<'a, T> {
    next: Option<&'a Node<T>>,
    guard: &'a ReadGuard<'a>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next.load(self.guard);
        Some(&node.value)
    }
}
