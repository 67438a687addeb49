//! The execution context shared by in-process worker threads.
//!
//! Threads in one process share a single interpreter-like context: in
//! [`ContextMode::Shared`] only one task body runs at a time, no matter
//! how many threads the pool has. This is the ceiling the thread pool
//! strategy is benchmarked against. [`ContextMode::Isolated`] lets the
//! threads run freely.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Whether worker threads serialize through one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// One task body at a time across all threads.
    #[default]
    Shared,
    /// Threads run task bodies concurrently.
    Isolated,
}

/// Gate that task bodies pass through on the thread backend.
#[derive(Debug)]
pub struct ExecutionContext {
    gate: Option<Mutex<()>>,
}

impl ExecutionContext {
    /// Create a context in the given mode.
    #[must_use]
    pub fn new(mode: ContextMode) -> Self {
        let gate = match mode {
            ContextMode::Shared => Some(Mutex::new(())),
            ContextMode::Isolated => None,
        };
        Self { gate }
    }

    /// The mode this context was created with.
    #[must_use]
    pub const fn mode(&self) -> ContextMode {
        if self.gate.is_some() {
            ContextMode::Shared
        } else {
            ContextMode::Isolated
        }
    }

    /// Run `f` inside the context.
    ///
    /// A panic inside `f` while holding the gate poisons the mutex; the
    /// gate carries no data, so later callers proceed regardless.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.gate {
            Some(gate) => {
                let _held = gate.lock().unwrap_or_else(PoisonError::into_inner);
                f()
            }
            None => f(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Highest number of closures observed running at once.
    fn peak_concurrency(mode: ContextMode) -> usize {
        let context = ExecutionContext::new(mode);
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    context.enter(|| {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(30));
                        running.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });
        peak.load(Ordering::SeqCst)
    }

    #[test]
    fn shared_context_admits_one_at_a_time() {
        assert_eq!(peak_concurrency(ContextMode::Shared), 1);
    }

    #[test]
    fn isolated_context_lets_threads_overlap() {
        assert!(peak_concurrency(ContextMode::Isolated) > 1);
    }

    #[test]
    fn mode_is_reported() {
        assert_eq!(ExecutionContext::new(ContextMode::Shared).mode(), ContextMode::Shared);
        assert_eq!(
            ExecutionContext::new(ContextMode::Isolated).mode(),
            ContextMode::Isolated
        );
    }

    #[test]
    fn enter_returns_closure_value() {
        let context = ExecutionContext::new(ContextMode::default());
        assert_eq!(context.enter(|| 41 + 1), 42);
    }
}
