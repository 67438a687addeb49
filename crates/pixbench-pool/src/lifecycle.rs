//! Pool lifecycle: `Idle → Dispatching → Draining → Done`.
//!
//! Every strategy drives one [`Lifecycle`] per `execute` call. Transitions
//! only move forward by one step; dispatch threads race to announce
//! `Draining`, so the state lives in an atomic and only the winner logs.

use std::sync::atomic::{AtomicU8, Ordering};

/// Where a pool is in one `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    /// Workers exist, nothing dispatched yet.
    Idle = 0,
    /// Tasks are being handed out.
    Dispatching = 1,
    /// The final task has been handed out; waiting on outstanding work.
    Draining = 2,
    /// Workers are torn down and results are ready.
    Done = 3,
}

impl PoolState {
    /// The only state this one may advance to.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Dispatching),
            Self::Dispatching => Some(Self::Draining),
            Self::Draining => Some(Self::Done),
            Self::Done => None,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Dispatching,
            2 => Self::Draining,
            _ => Self::Done,
        }
    }
}

/// Thread-safe lifecycle tracker for one pool run.
#[derive(Debug)]
pub struct Lifecycle {
    pool: &'static str,
    state: AtomicU8,
}

impl Lifecycle {
    /// Start in [`PoolState::Idle`].
    #[must_use]
    pub const fn new(pool: &'static str) -> Self {
        Self {
            pool,
            state: AtomicU8::new(PoolState::Idle as u8),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move from `from` to its successor.
    ///
    /// Returns `false`, leaving the state untouched, if the pool is not in
    /// `from` (another thread already advanced it, or the transition is
    /// out of order).
    pub fn advance(&self, from: PoolState) -> bool {
        let Some(to) = from.successor() else {
            return false;
        };
        let moved = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            tracing::debug!(pool = self.pool, ?from, ?to, "pool state");
        }
        moved
    }

    /// Walk forward through every remaining state to [`PoolState::Done`].
    pub fn finish(&self) {
        while self.state().successor().is_some() {
            self.advance(self.state());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        assert_eq!(Lifecycle::new("test").state(), PoolState::Idle);
    }

    #[test]
    fn advances_one_step_at_a_time() {
        let lifecycle = Lifecycle::new("test");
        assert!(lifecycle.advance(PoolState::Idle));
        assert_eq!(lifecycle.state(), PoolState::Dispatching);
        assert!(lifecycle.advance(PoolState::Dispatching));
        assert!(lifecycle.advance(PoolState::Draining));
        assert_eq!(lifecycle.state(), PoolState::Done);
    }

    #[test]
    fn rejects_out_of_order_transition() {
        let lifecycle = Lifecycle::new("test");
        assert!(!lifecycle.advance(PoolState::Dispatching));
        assert_eq!(lifecycle.state(), PoolState::Idle);
    }

    #[test]
    fn only_one_racer_wins_a_transition() {
        let lifecycle = Lifecycle::new("test");
        lifecycle.advance(PoolState::Idle);
        assert!(lifecycle.advance(PoolState::Dispatching));
        assert!(!lifecycle.advance(PoolState::Dispatching));
        assert_eq!(lifecycle.state(), PoolState::Draining);
    }

    #[test]
    fn done_has_no_successor() {
        let lifecycle = Lifecycle::new("test");
        lifecycle.finish();
        assert_eq!(lifecycle.state(), PoolState::Done);
        assert!(!lifecycle.advance(PoolState::Done));
    }

    #[test]
    fn finish_from_middle_reaches_done() {
        let lifecycle = Lifecycle::new("test");
        lifecycle.advance(PoolState::Idle);
        lifecycle.finish();
        assert_eq!(lifecycle.state(), PoolState::Done);
    }
}
