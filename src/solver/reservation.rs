use tracing::{debug, trace, warn};

use super::{check_task_set, Solver};
use crate::distribution::Pmf;
use crate::error::{Error, Result};
use crate::supply::{self, SupplyBound};
use crate::task::{DeadlineTable, ResourceReservation, TaskDescriptor};

/// Mass below this threshold is dropped from the tail of the backlog
/// distribution after every step of the recursion.
const TAIL_EPSILON: f64 = 1e-12;

/// Which service a reservation is assumed to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupplyModel {
    /// Budget granted at the start of every server period, with
    /// server periods aligned to the task's activations. See
    /// [supply::Synchronized].
    #[default]
    Synchronized,
    /// The pessimistic periodic resource model. See [supply::Periodic].
    WorstCase,
}

impl SupplyModel {
    fn supply(&self, reservation: &ResourceReservation) -> Box<dyn SupplyBound> {
        match self {
            SupplyModel::Synchronized => Box::new(supply::Synchronized::from(reservation)),
            SupplyModel::WorstCase => Box::new(supply::Periodic::from(reservation)),
        }
    }
}

/// Queueing analysis of a task served by its own reservation.
///
/// Between two activations separated by `z` time units the
/// reservation provides `sbf(z)` units of service, so the backlog `v`
/// found by an activation evolves as `v' = max(v + C - sbf(Z), 0)`.
/// The solver iterates this recursion from an empty queue until the
/// backlog distribution converges, and then reports, for each
/// deadline `d`, the probability that `v + C <= sbf(d)`.
///
/// Other tasks registered with the same solver only matter through
/// their reserved bandwidth, which must not exceed the processor.
#[derive(Debug, Clone, Copy)]
pub struct ReservationQueue {
    model: SupplyModel,
    tolerance: f64,
    max_iterations: usize,
}

impl Default for ReservationQueue {
    fn default() -> Self {
        ReservationQueue {
            model: SupplyModel::default(),
            tolerance: 1e-9,
            max_iterations: 10_000,
        }
    }
}

impl ReservationQueue {
    pub fn new(model: SupplyModel) -> Self {
        ReservationQueue {
            model,
            ..Default::default()
        }
    }

    /// Stop iterating once consecutive backlog distributions differ
    /// by less than `tolerance` (L1 distance).
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Give up after `max_iterations` steps of the recursion.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn model(&self) -> SupplyModel {
        self.model
    }

    /// Steady-state distribution of the backlog found by an activation.
    fn backlog(&self, task: &str, cost: &Pmf, service: &Pmf) -> Result<Pmf> {
        let mut backlog = Pmf::point_mass(0);
        for iteration in 0..self.max_iterations {
            let work = backlog.convolve(cost)?;
            let next = service
                .iter()
                .map(|(s, p)| work.sub_saturating(s).scale(p))
                .try_fold(Pmf::default(), |acc, part| acc.mix(&part))?
                .truncate_tail(TAIL_EPSILON);
            let change = next.distance(&backlog);
            backlog = next;
            if change < self.tolerance {
                trace!(task, iteration, "backlog converged");
                return Ok(backlog);
            }
        }
        warn!(task, iterations = self.max_iterations, "backlog did not converge");
        Err(Error::unsolvable(
            task,
            format!(
                "backlog did not converge within {} iterations",
                self.max_iterations
            ),
        ))
    }
}

impl Solver<ResourceReservation> for ReservationQueue {
    fn name(&self) -> &str {
        "reservation queue"
    }

    fn solve(
        &self,
        task: &TaskDescriptor<ResourceReservation>,
        peers: &[&TaskDescriptor<ResourceReservation>],
        table: &mut DeadlineTable,
    ) -> Result<()> {
        check_task_set(task, peers)?;
        let supply = self.model.supply(task.params());
        let cost = task.computation_time();

        // service granted between two consecutive activations
        let service = task
            .interarrival_model()
            .iter()
            .map(|(z, p)| Pmf::point_mass(supply.provided_service(z)).scale(p))
            .try_fold(Pmf::default(), |acc, part| acc.mix(&part))?;

        let (demand, capacity) = match (cost.mean(), service.mean()) {
            (Some(demand), Some(capacity)) => (demand, capacity),
            _ => return Err(Error::unsolvable(task.name(), "degenerate distributions")),
        };
        debug!(
            task = %task.name(),
            model = ?self.model,
            demand,
            capacity,
            "reservation analysis"
        );
        if demand >= capacity {
            return Err(Error::unsolvable(
                task.name(),
                format!(
                    "mean demand {} not below mean service {} per activation",
                    demand, capacity
                ),
            ));
        }

        let backlog = self.backlog(task.name(), cost, &service)?;
        let work = backlog.convolve(cost)?;
        for (deadline, p) in table.iter_mut() {
            *p = work.cdf(supply.provided_service(deadline)).min(1.0);
        }
        Ok(())
    }
}
