//! Fan-in barrier for sibling pages.
//!
//! Every node arrives at its parent's barrier when its pipeline ends, with
//! success or failure. A node that needs its earlier siblings' results waits
//! until all of them have arrived. Pages are dispatched in pre-order, so the
//! siblings it waits for were dispatched before it and never wait on it in
//! turn.
//!
//! The barrier also owns the siblings' fragment accumulator. One barrier
//! exists per parent per build, so concurrent builds of the same tree never
//! see each other's fragments.

use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arrival {
    Pending,
    Done,
    Failed,
}

/// A preceding sibling failed before arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a preceding sibling failed")]
pub struct SiblingFailed;

/// Arrival state and collected fragments for the children of one node.
#[derive(Debug)]
pub struct FanIn {
    arrivals: Mutex<Vec<Arrival>>,
    changed: Condvar,
    fragments: Mutex<BTreeMap<usize, String>>,
}

impl FanIn {
    /// Barrier for `count` siblings.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            arrivals: Mutex::new(vec![Arrival::Pending; count]),
            changed: Condvar::new(),
            fragments: Mutex::new(BTreeMap::new()),
        }
    }

    /// Store the fragment of the sibling at `position`.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn insert_fragment(&self, position: usize, text: String) {
        self.fragments.lock().unwrap().insert(position, text);
    }

    /// Stored fragments in sibling order joined by `separator`, and how many
    /// there were.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn join_fragments(&self, separator: &str) -> (String, usize) {
        let fragments = self.fragments.lock().unwrap();
        let parts: Vec<&str> = fragments.values().map(String::as_str).collect();
        (parts.join(separator), parts.len())
    }

    /// Record that the sibling at `position` finished.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned or `position` is out of range.
    pub fn arrive(&self, position: usize, ok: bool) {
        let mut arrivals = self.arrivals.lock().unwrap();
        arrivals[position] = if ok { Arrival::Done } else { Arrival::Failed };
        self.changed.notify_all();
    }

    /// Block until every sibling before `position` has arrived.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn wait_preceding(&self, position: usize) -> Result<(), SiblingFailed> {
        let arrivals = self.arrivals.lock().unwrap();
        let arrivals = self
            .changed
            .wait_while(arrivals, |a| {
                a[..position].iter().any(|s| *s == Arrival::Pending)
            })
            .unwrap();
        if arrivals[..position].contains(&Arrival::Failed) {
            return Err(SiblingFailed);
        }
        Ok(())
    }

    /// Guard that arrives for `position` when dropped.
    ///
    /// Arrives as failed unless [`ArrivalGuard::succeed`] is called, so a
    /// page that errors or panics still releases its waiting siblings.
    #[must_use]
    pub fn guard(&self, position: usize) -> ArrivalGuard<'_> {
        ArrivalGuard {
            fan_in: self,
            position,
            ok: false,
        }
    }
}

/// Arrives at a [`FanIn`] on drop.
pub struct ArrivalGuard<'a> {
    fan_in: &'a FanIn,
    position: usize,
    ok: bool,
}

impl ArrivalGuard<'_> {
    /// Arrive as successful.
    pub fn succeed(mut self) {
        self.ok = true;
    }
}

impl Drop for ArrivalGuard<'_> {
    fn drop(&mut self) {
        self.fan_in.arrive(self.position, self.ok);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    static_assertions::assert_impl_all!(FanIn: Send, Sync);

    #[test]
    fn test_first_sibling_never_waits() {
        let fan_in = FanIn::new(3);
        assert_eq!(fan_in.wait_preceding(0), Ok(()));
    }

    #[test]
    fn test_waits_for_all_preceding() {
        let fan_in = Arc::new(FanIn::new(3));
        let released = Arc::new(AtomicBool::new(false));

        let waiter = {
            let fan_in = Arc::clone(&fan_in);
            let released = Arc::clone(&released);
            thread::spawn(move || {
                let result = fan_in.wait_preceding(2);
                released.store(true, Ordering::SeqCst);
                result
            })
        };

        fan_in.arrive(1, true);
        thread::sleep(Duration::from_millis(20));
        assert!(!released.load(Ordering::SeqCst));

        fan_in.arrive(0, true);
        assert_eq!(waiter.join().unwrap(), Ok(()));
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_failed_sibling_reported() {
        let fan_in = FanIn::new(2);
        fan_in.arrive(0, false);
        assert_eq!(fan_in.wait_preceding(1), Err(SiblingFailed));
    }

    #[test]
    fn test_dropped_guard_arrives_as_failed() {
        let fan_in = FanIn::new(2);
        drop(fan_in.guard(0));
        assert_eq!(fan_in.wait_preceding(1), Err(SiblingFailed));
    }

    #[test]
    fn test_fragments_join_in_position_order() {
        let fan_in = FanIn::new(3);
        fan_in.insert_fragment(2, "c".to_owned());
        fan_in.insert_fragment(0, "a".to_owned());
        fan_in.insert_fragment(1, "b".to_owned());
        assert_eq!(fan_in.join_fragments("|"), ("a|b|c".to_owned(), 3));
    }

    #[test]
    fn test_fragments_are_per_barrier() {
        let first = FanIn::new(2);
        let second = FanIn::new(2);
        first.insert_fragment(0, "a".to_owned());
        assert_eq!(second.join_fragments("|"), (String::new(), 0));
    }

    #[test]
    fn test_succeeded_guard_arrives_as_done() {
        let fan_in = FanIn::new(2);
        fan_in.guard(0).succeed();
        assert_eq!(fan_in.wait_preceding(1), Ok(()));
    }
}
