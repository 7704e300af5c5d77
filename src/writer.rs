use crate::sync::{Mutex, MutexGuard};

/// Serializes writers of one collection.
///
/// Readers never touch it. Acquisition is not re-entrant: calling [`WriterLock::with`]
/// again from inside `body` deadlocks.
#[derive(Debug, Default)]
pub struct WriterLock {
    inner: Mutex<()>,
}

impl WriterLock {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// Run `body` as the only active writer.
    ///
    /// The token handed to `body` is what link-mutating operations require, so a
    /// shared link cannot be written without holding this lock.
    pub fn with<R>(&self, body: impl FnOnce(&WriteToken<'_>) -> R) -> R {
        let token = WriteToken {
            _guard: self.inner.lock(),
        };
        body(&token)
    }
}

/// Proof that the holder is the only active writer.
pub struct WriteToken<'a> {
    _guard: MutexGuard<'a, ()>,
}
