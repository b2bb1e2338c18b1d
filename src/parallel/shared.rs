//! The shared state of §4.8/§5: a winning-region CNF, an unminimized-
//! clause queue, a counterexample deque, an atomic result flag and a
//! registry lock, each behind exactly the discipline §5 describes.

use crate::cnf::{Clause, Cnf, Cube};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex};

/// Tags a clause with the kind of worker that produced it (§4.8:
/// "each clause carries a source tag"). Explorers use this to decide
/// whether a broadcast clause is safe to fold into their own
/// not-yet-restarted view (see `crate::parallel`'s worker loop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    ClauseExplorer,
    IfmExplorer,
    ClauseMinimizer,
    CounterexampleGeneralizer,
}

/// §5's atomic result flag: relaxed loads for the termination poll every
/// worker performs between rounds, release stores from whichever worker
/// sets it.
pub struct ResultFlag(AtomicU8);

const UNKNOWN: u8 = 0;
const REALIZABLE: u8 = 1;
const UNREALIZABLE: u8 = 2;

impl Default for ResultFlag {
    fn default() -> Self {
        Self(AtomicU8::new(UNKNOWN))
    }
}

impl ResultFlag {
    pub fn is_unknown(&self) -> bool {
        self.0.load(Ordering::Relaxed) == UNKNOWN
    }

    pub fn get(&self) -> Option<bool> {
        match self.0.load(Ordering::Relaxed) {
            REALIZABLE => Some(true),
            UNREALIZABLE => Some(false),
            _ => None,
        }
    }

    /// Sets the flag if it is still `unknown`; a no-op otherwise, since
    /// the first worker to finish wins and every later call would just
    /// restate the same answer or, in a buggy run, contradict it.
    pub fn set(&self, realizable: bool) {
        let value = if realizable { REALIZABLE } else { UNREALIZABLE };
        let _ = self
            .0
            .compare_exchange(UNKNOWN, value, Ordering::Release, Ordering::Relaxed);
    }
}

/// Bundles every structure §5 lists as shared mutable state. `registry`
/// is a plain `Mutex<()>` token: per [`crate::learn::two_solver`]'s
/// doc comment, this coordinator gives each worker thread its own
/// `VarStore`/`Model` pair seeded from the same source AIG rather than a
/// single shared registry behind a lock (every engine in this crate holds
/// `&mut VarStore` for its entire run, which a cross-thread shared `&mut`
/// can't satisfy without `unsafe`). The lock and condvar here still
/// serialize the logical restart *point* so concurrent explorers agree on
/// when a "new restart level" has been reached, matching §5's ordering
/// guarantee even though the underlying variable numbering is no longer
/// literally shared.
pub struct SharedState {
    pub w: Mutex<Cnf>,
    pub unminimized: Mutex<VecDeque<(Clause, Source)>>,
    pub counterexamples: Mutex<VecDeque<Cube>>,
    pub result: ResultFlag,
    pub registry: Mutex<u64>,
    pub restart_signal: Condvar,
}

impl SharedState {
    pub fn new(initial_w: Cnf) -> Self {
        Self {
            w: Mutex::new(initial_w),
            unminimized: Mutex::new(VecDeque::new()),
            counterexamples: Mutex::new(VecDeque::new()),
            result: ResultFlag::default(),
            registry: Mutex::new(0),
            restart_signal: Condvar::new(),
        }
    }

    /// Appends `clause` to the shared `W` under lock, per §5's "writers
    /// append clauses with add_simplified under the lock held".
    pub fn post_w_clause(&self, clause: Clause) {
        self.w.lock().expect("shared W lock poisoned").add_simplified(clause);
    }

    pub fn current_w(&self) -> Cnf {
        self.w.lock().expect("shared W lock poisoned").clone()
    }

    pub fn post_unminimized(&self, clause: Clause, source: Source) {
        self.unminimized
            .lock()
            .expect("unminimized queue lock poisoned")
            .push_back((clause, source));
    }

    pub fn pop_unminimized(&self) -> Option<(Clause, Source)> {
        self.unminimized
            .lock()
            .expect("unminimized queue lock poisoned")
            .pop_front()
    }

    pub fn post_counterexample(&self, cube: Cube) {
        self.counterexamples
            .lock()
            .expect("counterexample deque lock poisoned")
            .push_back(cube);
    }

    pub fn pop_counterexample(&self) -> Option<Cube> {
        self.counterexamples
            .lock()
            .expect("counterexample deque lock poisoned")
            .pop_front()
    }

    /// Bumps the restart level under the registry lock and wakes every
    /// explorer waiting on it (§5's restart protocol).
    pub fn broadcast_restart(&self) -> u64 {
        let mut level = self.registry.lock().expect("registry lock poisoned");
        *level += 1;
        self.restart_signal.notify_all();
        *level
    }

    pub fn restart_level(&self) -> u64 {
        *self.registry.lock().expect("registry lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_flag_set_is_first_writer_wins() {
        let flag = ResultFlag::default();
        assert!(flag.is_unknown());
        flag.set(true);
        flag.set(false);
        assert_eq!(flag.get(), Some(true));
    }
}
