#[cfg(not(feature = "loom"))]
use crate::background::BackgroundReclaimer;
use crate::book::Book;
use crate::error::{Result, ShelfError};
use crate::list::RcuList;
use crate::reader::{ReadGuard, Reader};
use crate::reclaim::{ReclaimConfig, ReclaimStats, Reclaimer, RetireMode};
#[cfg(not(feature = "loom"))]
use std::time::Duration;

/// Builder for configuring a [`Library`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use rcu_shelf::{Library, ReclaimConfig};
///
/// let library = Library::builder()
///     .capacity(1024)
///     .reclaim(ReclaimConfig::new().auto_reclaim_threshold(None))
///     .background_reclaim(Duration::from_millis(5))
///     .build()
///     .unwrap();
/// assert!(library.is_empty());
/// ```
///
/// 用于配置 [`Library`] 的构建器。
#[derive(Debug, Clone, Default)]
pub struct LibraryBuilder {
    reclaim: ReclaimConfig,
    capacity: Option<usize>,
    #[cfg(not(feature = "loom"))]
    background: Option<Duration>,
}

impl LibraryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reclaimer tuning. Default: [`ReclaimConfig::default`].
    pub fn reclaim(mut self, config: ReclaimConfig) -> Self {
        self.reclaim = config;
        self
    }

    /// Cap the number of books allocated at once, counting retired books that are
    /// still waiting for their grace period. Adds and transitions fail with
    /// [`ShelfError::ResourceExhausted`] at the cap. Default: unbounded.
    pub fn capacity(mut self, capacity: impl Into<Option<usize>>) -> Self {
        self.capacity = capacity.into();
        self
    }

    /// Run deferred reclamation on a background thread that wakes every `interval`.
    /// Default: off.
    #[cfg(not(feature = "loom"))]
    pub fn background_reclaim(mut self, interval: impl Into<Option<Duration>>) -> Self {
        self.background = interval.into();
        self
    }

    /// Create the library, starting the background reclaimer if one was requested.
    ///
    /// # Errors
    ///
    /// [`ShelfError::Spawn`] if the background thread could not be started. Without
    /// [`background_reclaim`](Self::background_reclaim) this never fails.
    ///
    /// 创建图书馆；若请求了后台回收则启动后台线程。线程无法启动时返回 [`ShelfError::Spawn`]。
    pub fn build(self) -> Result<Library> {
        let books = RcuList::with_config(self.reclaim);

        #[cfg(not(feature = "loom"))]
        let background = match self.background {
            Some(interval) => Some(BackgroundReclaimer::spawn(
                books.shared_reclaimer().clone(),
                interval,
            )?),
            None => None,
        };

        Ok(Library {
            #[cfg(not(feature = "loom"))]
            background,
            books,
            capacity: self.capacity,
        })
    }
}

/// A shelf of [`Book`]s readable without locks and updated by copy-on-write.
///
/// Lookups run inside a read-side critical section of the caller's [`Reader`] and
/// never block. Every change (add, borrow, return, delete) is published by one
/// atomic link update under the writer lock; a replaced or deleted book is retired
/// with the chosen [`RetireMode`] and freed after its grace period.
///
/// ```
/// use rcu_shelf::{Library, RetireMode, ShelfError};
///
/// let library = Library::new();
/// let reader = library.register_reader();
///
/// library.add(0, "book1", "jb").unwrap();
/// assert_eq!(library.lookup_state(&reader, 0), Some(false));
///
/// library.borrow(&reader, 0, RetireMode::Synchronous).unwrap();
/// assert!(matches!(
///     library.borrow(&reader, 0, RetireMode::Synchronous),
///     Err(ShelfError::AlreadyInState { id: 0, borrowed: true })
/// ));
///
/// library.delete(0, RetireMode::Deferred).unwrap();
/// assert_eq!(library.lookup_state(&reader, 0), None);
/// ```
pub struct Library {
    // Declared first so the worker is joined before the chain is drained.
    #[cfg(not(feature = "loom"))]
    background: Option<BackgroundReclaimer>,
    books: RcuList<Book>,
    capacity: Option<usize>,
}

impl Library {
    /// A library with default reclamation settings, no capacity and no background
    /// worker.
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "loom"))]
            background: None,
            books: RcuList::new(),
            capacity: None,
        }
    }

    pub fn builder() -> LibraryBuilder {
        LibraryBuilder::new()
    }

    /// Register a reader for the calling thread.
    ///
    /// Readers of another library, or of a standalone [`Reclaimer`], are rejected
    /// with a panic by every method that takes a reader or guard.
    pub fn register_reader(&self) -> Reader {
        self.books.register_reader()
    }

    /// Publish a new, not borrowed book at the front of the shelf.
    ///
    /// Ids are not checked for uniqueness; lookups find the most recently added book
    /// with a given id.
    pub fn add(&self, id: i32, name: &str, author: &str) -> Result<()> {
        let book = Book::new(id, name, author);
        self.books.push_front_checked(book, |live| self.admit(live))?;
        log::info!("added book {id}: {}", book);
        Ok(())
    }

    /// The book with `id` as seen by an open critical section.
    pub fn get<'a>(&'a self, guard: &'a ReadGuard<'_>, id: i32) -> Option<&'a Book> {
        self.books.find(guard, |book| book.id() == id)
    }

    /// Whether the book with `id` is borrowed, or `None` if there is no such book.
    pub fn lookup_state(&self, reader: &Reader, id: i32) -> Option<bool> {
        let guard = reader.read();
        let state = self.get(&guard, id).map(Book::is_borrowed);
        if state.is_none() {
            log::warn!("book {id} does not exist");
        }
        state
    }

    /// Replace the book with `id` by a copy whose borrowed flag is `to_borrowed`.
    ///
    /// Readers that already hold the old book keep seeing it unchanged; readers that
    /// start after the swap see the copy. The old book is retired with `mode`.
    ///
    /// With [`RetireMode::Synchronous`] the calling thread must not hold a read guard
    /// of this library.
    pub fn transition(
        &self,
        reader: &Reader,
        id: i32,
        to_borrowed: bool,
        mode: RetireMode,
    ) -> Result<()> {
        let replaced = self.books.update(
            reader,
            mode,
            |book| book.id() == id,
            |book: &Book| -> Result<Book> {
                if book.is_borrowed() == to_borrowed {
                    return Err(ShelfError::AlreadyInState {
                        id,
                        borrowed: to_borrowed,
                    });
                }
                self.admit(self.books.len())?;
                Ok(book.with_borrowed(to_borrowed))
            },
        );

        match replaced {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("book {id} does not exist");
                return Err(ShelfError::NotFound { id });
            }
            Err(err) => {
                log::warn!("{err}");
                return Err(err);
            }
        }

        self.retired(mode);
        let action = if to_borrowed { "borrow" } else { "return" };
        log::info!("{action} success {id} ({mode})");
        Ok(())
    }

    /// Mark the book with `id` as borrowed.
    pub fn borrow(&self, reader: &Reader, id: i32, mode: RetireMode) -> Result<()> {
        self.transition(reader, id, true, mode)
    }

    /// Mark the book with `id` as returned.
    pub fn give_back(&self, reader: &Reader, id: i32, mode: RetireMode) -> Result<()> {
        self.transition(reader, id, false, mode)
    }

    /// Unlink the book with `id` and retire it with `mode`.
    pub fn delete(&self, id: i32, mode: RetireMode) -> Result<()> {
        if !self.books.remove(mode, |book| book.id() == id) {
            log::warn!("book {id} does not exist");
            return Err(ShelfError::NotFound { id });
        }

        self.retired(mode);
        log::info!("delete success {id} ({mode})");
        Ok(())
    }

    /// Log the book with `id` and return a copy of it.
    pub fn print_snapshot(&self, reader: &Reader, id: i32) -> Option<Book> {
        let guard = reader.read();
        match self.get(&guard, id) {
            Some(book) => {
                log::info!("{book}, addr : {book:p}");
                Some(*book)
            }
            None => {
                log::warn!("book {id} does not exist");
                None
            }
        }
    }

    /// Ids of all live books, front to back.
    pub fn ids(&self, reader: &Reader) -> Vec<i32> {
        let guard = reader.read();
        self.books.iter(&guard).map(Book::id).collect()
    }

    /// Number of books currently on the shelf.
    ///
    /// Replaced or deleted books that are still waiting for reclamation are not
    /// counted; see [`reclaim_stats`](Self::reclaim_stats) for those.
    ///
    /// 当前书架上的图书数量，不包括等待回收的已替换或已删除图书。
    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn reclaimer(&self) -> &Reclaimer {
        self.books.reclaimer()
    }

    pub fn reclaim_stats(&self) -> ReclaimStats {
        self.reclaimer().stats()
    }

    /// Free deferred books whose grace period has elapsed. Never blocks on readers.
    pub fn collect(&self) -> usize {
        self.reclaimer().collect()
    }

    /// Wait until every book retired in deferred mode so far has been freed.
    pub fn barrier(&self) -> usize {
        self.reclaimer().barrier()
    }

    fn admit(&self, live: usize) -> Result<()> {
        let Some(capacity) = self.capacity else {
            return Ok(());
        };

        let reclaimer = self.reclaimer();
        let mut pending = reclaimer.pending();
        if live + pending >= capacity && pending > 0 {
            reclaimer.collect();
            pending = reclaimer.pending();
        }

        if live + pending >= capacity {
            return Err(ShelfError::ResourceExhausted {
                capacity,
                live,
                pending,
            });
        }
        Ok(())
    }

    #[cfg(not(feature = "loom"))]
    fn retired(&self, mode: RetireMode) {
        if mode == RetireMode::Deferred {
            if let Some(background) = &self.background {
                background.nudge();
            }
        }
    }

    #[cfg(feature = "loom")]
    fn retired(&self, _mode: RetireMode) {}
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        log::debug!(
            "tearing down library: {} books, {} awaiting reclamation",
            self.books.len(),
            self.books.reclaimer().pending()
        );
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("books", &self.books)
            .field("capacity", &self.capacity)
            .finish()
    }
}
