/*! Discrete probability distributions over time

This module provides [Pmf], a probability mass function over
non-negative integer time units. Task descriptors use it to describe
computation and interarrival times, and solvers combine them by
convolution and shifting to obtain response-time distributions.

A [Pmf] may carry a total mass below one. Such sub-stochastic values
arise naturally as intermediate results (e.g., when splitting a
distribution at a point in time) and are never produced by the public
constructors.
*/

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::time::{Duration, Time};

/// Tolerance on the total mass accepted by [Pmf::from_masses].
pub const MASS_TOLERANCE: f64 = 1e-6;

/// Number of consecutive time values a [Pmf] may cover. Operations
/// whose result would be wider fail.
pub const MAX_SPAN: Duration = 1 << 22;

/// A discrete probability mass function over [Time].
///
/// Internally, the mass is stored densely: `mass[i]` is the
/// probability of the value `start + i`. The representation is kept
/// trimmed, i.e., the first and last stored entries are non-zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pmf {
    start: Time,
    mass: Vec<f64>,
}

impl Pmf {
    /// A distribution that takes the value `at` with probability one.
    pub fn point_mass(at: Time) -> Self {
        Pmf {
            start: at,
            mass: vec![1.0],
        }
    }

    /// Construct a distribution from `(value, probability)` pairs.
    ///
    /// Repeated values accumulate. Fails if any probability is
    /// negative or not finite, if the probabilities do not sum to
    /// one (up to [MASS_TOLERANCE]), or if the values are spread over
    /// more than [MAX_SPAN].
    pub fn from_masses(points: impl IntoIterator<Item = (Time, f64)>) -> Result<Self> {
        let points: Vec<(Time, f64)> = points.into_iter().collect();
        if let Some((t, p)) = points.iter().find(|(_, p)| !p.is_finite() || *p < 0.0) {
            return Err(Error::InvalidArgument(format!(
                "probability {} at time {} is not a valid mass",
                p, t
            )));
        }
        let total: f64 = points.iter().map(|(_, p)| p).sum();
        if (total - 1.0).abs() > MASS_TOLERANCE {
            return Err(Error::InvalidArgument(format!(
                "probabilities sum to {} instead of 1",
                total
            )));
        }
        let (lo, hi) = match points.iter().map(|(t, _)| *t).minmax().into_option() {
            Some(range) => range,
            None => return Ok(Pmf::default()),
        };
        check_span(lo, hi)?;
        let mut mass = vec![0.0; (hi - lo) as usize + 1];
        for (t, p) in points {
            mass[(t - lo) as usize] += p;
        }
        Ok(Pmf::from_dense(lo, mass))
    }

    fn from_dense(start: Time, mut mass: Vec<f64>) -> Self {
        while mass.last().map_or(false, |p| *p == 0.0) {
            mass.pop();
        }
        let leading = mass.iter().take_while(|p| **p == 0.0).count();
        if leading == mass.len() {
            return Pmf::default();
        }
        mass.drain(..leading);
        Pmf {
            start: start + leading as Time,
            mass,
        }
    }

    /// True if the distribution carries no mass at all.
    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    /// The smallest value with non-zero probability.
    pub fn min(&self) -> Option<Time> {
        (!self.is_empty()).then(|| self.start)
    }

    /// The largest value with non-zero probability.
    pub fn max(&self) -> Option<Time> {
        (!self.is_empty()).then(|| self.start + self.mass.len() as Time - 1)
    }

    /// Total probability mass (one for a proper distribution).
    pub fn total_mass(&self) -> f64 {
        self.mass.iter().sum()
    }

    /// Expected value, normalized by the total mass.
    pub fn mean(&self) -> Option<f64> {
        let total = self.total_mass();
        if self.is_empty() || total <= 0.0 {
            return None;
        }
        let weighted: f64 = self.iter().map(|(t, p)| t as f64 * p).sum();
        Some(weighted / total)
    }

    /// Probability of exactly the value `t`.
    pub fn probability_at(&self, t: Time) -> f64 {
        if t < self.start {
            return 0.0;
        }
        self.mass
            .get((t - self.start) as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Probability of a value of at most `t`.
    pub fn cdf(&self, t: Time) -> f64 {
        if t < self.start {
            return 0.0;
        }
        let n = ((t - self.start) as usize).saturating_add(1);
        self.mass.iter().take(n).sum()
    }

    /// Iterate over all values with non-zero probability, in
    /// increasing order.
    pub fn iter(&self) -> impl Iterator<Item = (Time, f64)> + '_ {
        self.mass
            .iter()
            .enumerate()
            .filter(|(_, p)| **p != 0.0)
            .map(move |(i, p)| (self.start + i as Time, *p))
    }

    /// Distribution of the sum of two independent random variables.
    ///
    /// Fails if the sum can exceed [Time] or the result would be
    /// wider than [MAX_SPAN].
    pub fn convolve(&self, other: &Pmf) -> Result<Pmf> {
        let (a, b) = match (self.max(), other.max()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(Pmf::default()),
        };
        let start = self.start.checked_add(other.start).ok_or_else(overflow)?;
        let end = a.checked_add(b).ok_or_else(overflow)?;
        check_span(start, end)?;
        let mut mass = vec![0.0; self.mass.len() + other.mass.len() - 1];
        for (i, a) in self.mass.iter().enumerate() {
            if *a == 0.0 {
                continue;
            }
            for (j, b) in other.mass.iter().enumerate() {
                mass[i + j] += a * b;
            }
        }
        Ok(Pmf::from_dense(start, mass))
    }

    /// Delay every value by `k` time units. Fails if a value would
    /// exceed [Time].
    pub fn shift(&self, k: Duration) -> Result<Pmf> {
        if let Some(max) = self.max() {
            max.checked_add(k).ok_or_else(overflow)?;
        }
        Ok(Pmf {
            start: if self.is_empty() { 0 } else { self.start + k },
            mass: self.mass.clone(),
        })
    }

    /// Distribution of `max(X - k, 0)`.
    pub fn sub_saturating(&self, k: Duration) -> Pmf {
        if self.start >= k {
            return Pmf {
                start: self.start - k,
                mass: self.mass.clone(),
            };
        }
        // everything at or below k collapses onto zero
        let cut = ((k - self.start) as usize)
            .saturating_add(1)
            .min(self.mass.len());
        let mut mass = Vec::with_capacity(self.mass.len() - cut + 1);
        mass.push(self.mass[..cut].iter().sum());
        mass.extend_from_slice(&self.mass[cut..]);
        Pmf::from_dense(0, mass)
    }

    /// Split into the mass at or below `t` and the mass above `t`.
    pub fn split_at(&self, t: Time) -> (Pmf, Pmf) {
        if t < self.start {
            return (Pmf::default(), self.clone());
        }
        let n = ((t - self.start) as usize)
            .saturating_add(1)
            .min(self.mass.len());
        if n == self.mass.len() {
            return (self.clone(), Pmf::default());
        }
        let head = Pmf::from_dense(self.start, self.mass[..n].to_vec());
        let tail = Pmf::from_dense(self.start + n as Time, self.mass[n..].to_vec());
        (head, tail)
    }

    /// Discard all mass above `t`.
    pub fn truncate_after(&self, t: Time) -> Pmf {
        self.split_at(t).0
    }

    /// Drop trailing values as long as the dropped mass stays at or
    /// below `epsilon`.
    pub fn truncate_tail(&self, epsilon: f64) -> Pmf {
        let mut mass = self.mass.clone();
        let mut dropped = 0.0;
        while let Some(p) = mass.last() {
            if dropped + p > epsilon {
                break;
            }
            dropped += p;
            mass.pop();
        }
        Pmf::from_dense(self.start, mass)
    }

    /// Multiply every probability by `factor`.
    pub fn scale(&self, factor: f64) -> Pmf {
        Pmf::from_dense(self.start, self.mass.iter().map(|p| p * factor).collect())
    }

    /// Pointwise sum of two (sub-stochastic) distributions. Fails if
    /// the result would be wider than [MAX_SPAN].
    pub fn mix(&self, other: &Pmf) -> Result<Pmf> {
        let (lo, hi) = match (self.max(), other.max()) {
            (None, _) => return Ok(other.clone()),
            (_, None) => return Ok(self.clone()),
            (Some(a), Some(b)) => (self.start.min(other.start), a.max(b)),
        };
        check_span(lo, hi)?;
        let mass = (lo..=hi)
            .map(|t| self.probability_at(t) + other.probability_at(t))
            .collect();
        Ok(Pmf::from_dense(lo, mass))
    }

    /// L1 distance between two distributions.
    pub fn distance(&self, other: &Pmf) -> f64 {
        let shared: f64 = self
            .iter()
            .map(|(t, p)| (p - other.probability_at(t)).abs())
            .sum();
        let other_only: f64 = other
            .iter()
            .filter(|(t, _)| self.probability_at(*t) == 0.0)
            .map(|(_, q)| q)
            .sum();
        shared + other_only
    }
}

fn overflow() -> Error {
    Error::InvalidArgument("distribution exceeds the representable time range".to_string())
}

fn check_span(lo: Time, hi: Time) -> Result<()> {
    if hi - lo >= MAX_SPAN {
        return Err(Error::InvalidArgument(format!(
            "distribution over [{}, {}] is wider than {} time units",
            lo, hi, MAX_SPAN
        )));
    }
    Ok(())
}
