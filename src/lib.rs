//! Read-copy-update collections with epoch-based grace periods.
//!
//! Readers traverse shared data without locks or blocking; writers publish every
//! change with one atomic pointer store and hand what they unlinked to a
//! [`Reclaimer`], which frees it once every reader that could still see it has left
//! its read-side critical section.
//!
//! - [`RcuList`]: a generic RCU singly linked list.
//! - [`Library`]: a shelf of [`Book`]s on top of it, with copy-on-write borrow and
//!   return.
//! - [`Reclaimer`]: the grace-period tracker, usable on its own.
//! - [`LockedHashTable`]: a plain single-lock hash table for comparison.
//!
//! 基于纪元宽限期的读-复制-更新（RCU）集合。读者无锁、无阻塞地遍历共享数据；
//! 写者以一次原子指针存储发布每个修改，并把摘除的对象交给 [`Reclaimer`]，
//! 在所有可能仍看到它的读者离开读侧临界区后才释放。
//!
//! ```
//! use rcu_shelf::{Library, RetireMode};
//!
//! let library = Library::new();
//! let reader = library.register_reader();
//!
//! library.add(7, "The Art of Multiprocessor Programming", "Herlihy").unwrap();
//!
//! {
//!     let guard = reader.read();
//!     let before = library.get(&guard, 7).unwrap();
//!
//!     // Deferred retirement does not wait for this open reader.
//!     library.borrow(&reader, 7, RetireMode::Deferred).unwrap();
//!
//!     // The copy this reader already holds is unchanged and still valid.
//!     assert!(!before.is_borrowed());
//! }
//!
//! assert_eq!(library.lookup_state(&reader, 7), Some(true));
//! library.barrier();
//! assert_eq!(library.reclaim_stats().pending, 0);
//! ```

#[cfg(not(feature = "loom"))]
mod background;
mod book;
mod bucket;
pub mod demo;
mod error;
mod garbage;
mod library;
mod link;
mod list;
mod reader;
mod reclaim;
mod state;
mod sync;
mod writer;

pub use book::{Book, FixedStr, TEXT_CAPACITY};
pub use bucket::LockedHashTable;
pub use error::{Result, ShelfError};
pub use library::{Library, LibraryBuilder};
pub use list::{Iter, RcuList};
pub use reader::{ReadGuard, Reader};
pub use reclaim::{ReclaimConfig, ReclaimStats, Reclaimer, RetireMode};
pub use writer::{WriteToken, WriterLock};

#[cfg(all(test, not(feature = "loom")))]
mod tests;
