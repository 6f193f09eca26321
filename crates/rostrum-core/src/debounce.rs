//! Generation-counter debouncer
//!
//! Every [`Debouncer::schedule`] call bumps a generation counter and spawns a
//! task that sleeps for the delay. When it wakes it only runs its work if no
//! newer call was scheduled in the meantime; stale tasks resolve to `None`.
//!
//! ```ignore
//! let debouncer = Debouncer::new(Duration::from_millis(300));
//! let handle = debouncer.schedule(move || validate_topic(&text));
//! if let Ok(Some(verdict)) = handle.await { render(verdict) }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Default delay for validate-as-you-type checks
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Drops all but the most recent scheduled job
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    /// Create a debouncer with the given delay
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Configured delay
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `job` after the delay, superseding any pending job.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, T>(&self, job: F) -> JoinHandle<Option<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != ticket {
                trace!(ticket, "Debounced job superseded");
                return None;
            }
            let output = job();
            // A newer call may have arrived while the job ran
            (generation.load(Ordering::SeqCst) == ticket).then_some(output)
        })
    }

    /// Invalidate every pending job
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
