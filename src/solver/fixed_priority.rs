use itertools::Itertools;
use tracing::{debug, trace};

use super::{check_task_set, Solver};
use crate::distribution::Pmf;
use crate::error::{Error, Result};
use crate::fixed_point;
use crate::supply;
use crate::task::{DeadlineTable, FixedPriority, TaskDescriptor};
use crate::time::{divide_with_ceil, Duration, Instant, Service};

/// Stochastic time-demand analysis for fully-preemptive
/// fixed-priority scheduling on a dedicated uniprocessor.
///
/// The analysis follows the job of the task under analysis that is
/// released together with one job of every task of higher or equal
/// priority (the synchronous critical instant). Starting from the
/// sum of all these computation times, every later release of an
/// interfering job at time `t` delays the job under analysis if, and
/// only if, the job has not completed by `t`. Interfering tasks with
/// random interarrival times are assumed to arrive as fast as their
/// shortest interarrival time allows.
///
/// The job of the task under analysis is assumed to find no backlog
/// of its own predecessors.
#[derive(Debug, Clone, Copy, Default)]
pub struct StochasticFixedPriority;

impl StochasticFixedPriority {
    pub fn new() -> Self {
        StochasticFixedPriority
    }
}

/// Everything the analysis needs to know about an interfering task.
struct Interferer<'a> {
    period: Duration,
    cost: &'a Pmf,
    wcet: Service,
}

impl<'a> Interferer<'a> {
    fn of(task: &'a TaskDescriptor<FixedPriority>) -> Option<Self> {
        Some(Interferer {
            period: task.interarrival_model().min()?,
            cost: task.computation_time(),
            wcet: task.computation_time().max()?,
        })
    }
}

/// Bound the response time of the job under analysis by considering
/// worst-case computation times only. Returns `limit` if no bound up
/// to `limit` exists.
#[allow(non_snake_case)]
fn worst_case_horizon(wcet: Service, interferers: &[Interferer], limit: Duration) -> Duration {
    let proc = supply::Dedicated::new();
    let R = fixed_point::search(&proc, limit, |delta| {
        interferers
            .iter()
            .map(|i| i.wcet.saturating_mul(divide_with_ceil(delta, i.period)))
            .fold(wcet, Service::saturating_add)
    });
    match R {
        Ok(bound) => bound.min(limit),
        Err(_) => limit,
    }
}

/// The distribution of the response time, with all mass above
/// `limit` discarded.
fn response_time(
    cost: &Pmf,
    interferers: &[Interferer],
    horizon: Instant,
    limit: Duration,
) -> Result<Pmf> {
    let initial = interferers
        .iter()
        .try_fold(cost.truncate_after(limit), |acc, i| {
            acc.convolve(i.cost).map(|c| c.truncate_after(limit))
        })?;

    // all interfering releases after the critical instant, in time order
    let releases = interferers
        .iter()
        .enumerate()
        .flat_map(|(idx, i)| {
            (1u64..)
                .map_while(move |k| i.period.checked_mul(k))
                .take_while(move |t| *t < horizon)
                .map(move |t| (t, idx))
        })
        .sorted();

    let mut response = initial;
    for (t, idx) in releases {
        let (done, pending) = response.split_at(t);
        if pending.is_empty() {
            break;
        }
        trace!(release = t, pending = pending.total_mass(), "interfering release");
        response = done.mix(&pending.convolve(interferers[idx].cost)?.truncate_after(limit))?;
    }
    Ok(response)
}

impl Solver<FixedPriority> for StochasticFixedPriority {
    fn name(&self) -> &str {
        "stochastic fixed priority"
    }

    fn solve(
        &self,
        task: &TaskDescriptor<FixedPriority>,
        peers: &[&TaskDescriptor<FixedPriority>],
        table: &mut DeadlineTable,
    ) -> Result<()> {
        check_task_set(task, peers)?;
        let limit = table
            .max_deadline()
            .ok_or_else(|| Error::unsolvable(task.name(), "no deadlines to solve for"))?;

        // peers of equal or higher priority, in deterministic order
        let interferers: Vec<Interferer> = peers
            .iter()
            .filter(|p| p.params().interferes_with(task.params()))
            .filter_map(|p| Interferer::of(*p))
            .collect();
        let wcet = task
            .computation_time()
            .max()
            .ok_or_else(|| Error::unsolvable(task.name(), "empty computation time"))?;

        let horizon = worst_case_horizon(wcet, &interferers, limit);
        debug!(
            task = %task.name(),
            interferers = interferers.len(),
            horizon,
            "fixed-priority analysis"
        );
        let response = response_time(task.computation_time(), &interferers, horizon, limit)?;
        for (deadline, p) in table.iter_mut() {
            *p = response.cdf(deadline).min(1.0);
        }
        Ok(())
    }
}
