use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

mod bucket_tests;
mod library_tests;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Payload that counts its own destruction.
#[derive(Debug)]
pub(crate) struct DropCounter {
    pub(crate) value: u64,
    drops: Arc<AtomicUsize>,
}

impl DropCounter {
    pub(crate) fn new(value: u64, drops: &Arc<AtomicUsize>) -> Self {
        Self {
            value,
            drops: Arc::clone(drops),
        }
    }
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}
