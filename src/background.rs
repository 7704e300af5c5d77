use crate::reclaim::Reclaimer;
use crate::sync::{Arc, AtomicBool, Ordering};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A worker thread that runs deferred reclamation off the writers' path.
///
/// Wakes every `interval`, or earlier when [`nudge`](Self::nudge)d, and collects if
/// anything is pending. Dropping it stops and joins the thread.
pub(crate) struct BackgroundReclaimer {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl BackgroundReclaimer {
    pub(crate) fn spawn(reclaimer: Arc<Reclaimer>, interval: Duration) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("shelf-reclaim".to_string())
            .spawn(move || {
                log::debug!("background reclaimer started, interval {interval:?}");
                while !stop_flag.load(Ordering::Acquire) {
                    thread::park_timeout(interval);
                    if reclaimer.pending() > 0 {
                        reclaimer.collect();
                    }
                }
                log::debug!("background reclaimer stopped");
            })?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Ask the worker to collect now instead of at its next tick.
    pub(crate) fn nudge(&self) {
        if let Some(thread) = &self.thread {
            thread.thread().unpark();
        }
    }
}

impl Drop for BackgroundReclaimer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                log::error!("background reclaimer panicked");
            }
        }
    }
}
