use std::collections::BTreeMap;

use crate::time::{Deadline, Duration};

/// Probability that a job completes within each registered deadline.
///
/// Newly inserted deadlines map to `0.0` until a solver overwrites
/// them. The table as a whole is either solved or not; there is no
/// per-deadline validity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeadlineTable {
    step: Option<Duration>,
    entries: BTreeMap<Deadline, f64>,
    solved: bool,
}

impl DeadlineTable {
    /// The granularity all deadlines must be multiples of, if set.
    pub fn step(&self) -> Option<Duration> {
        self.step
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, deadline: Deadline) -> bool {
        self.entries.contains_key(&deadline)
    }

    /// True while the stored probabilities are up to date.
    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// The registered deadlines in increasing order.
    pub fn deadlines(&self) -> impl Iterator<Item = Deadline> + '_ {
        self.entries.keys().copied()
    }

    /// The largest registered deadline.
    pub fn max_deadline(&self) -> Option<Deadline> {
        self.entries.keys().next_back().copied()
    }

    /// The stored value for `deadline`, whether solved or not.
    pub fn probability(&self, deadline: Deadline) -> Option<f64> {
        self.entries.get(&deadline).copied()
    }

    /// Iterate over `(deadline, probability)` pairs in increasing
    /// deadline order.
    pub fn iter(&self) -> impl Iterator<Item = (Deadline, f64)> + '_ {
        self.entries.iter().map(|(d, p)| (*d, *p))
    }

    /// Mutable access to the probabilities, for solvers to fill in.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Deadline, &mut f64)> + '_ {
        self.entries.iter_mut().map(|(d, p)| (*d, p))
    }

    pub(crate) fn set_step(&mut self, step: Duration) -> Option<Duration> {
        self.step.replace(step)
    }

    /// Insert an unsolved entry; returns false if already present.
    pub(crate) fn insert(&mut self, deadline: Deadline) -> bool {
        if self.entries.contains_key(&deadline) {
            return false;
        }
        self.entries.insert(deadline, 0.0);
        self.solved = false;
        true
    }

    pub(crate) fn invalidate(&mut self) {
        self.solved = false;
    }

    pub(crate) fn mark_solved(&mut self) {
        self.solved = true;
    }
}
