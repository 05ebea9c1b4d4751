/*! Task descriptors

This module provides [TaskDescriptor], which bundles the timing model
of a task (computation and interarrival times), the deadlines of
interest together with the probabilities of meeting them, and the
parameters of the scheduling policy the task runs under.

The scheduling policy is a type parameter: [FixedPriority] for tasks
scheduled by static priority and [ResourceReservation] for tasks served
by a periodically replenished budget. The shared timing and deadline
model does not depend on the policy, so solvers and policies can evolve
independently as long as both honor the [DeadlineTable] contract.
*/

use std::fmt::Debug;

use tracing::trace;

use crate::distribution::Pmf;
use crate::error::{Error, Result};
use crate::solver::SolverId;
use crate::time::{Deadline, Duration};

mod deadline;
mod fixed_priority;
mod reservation;

pub use deadline::DeadlineTable;
pub use fixed_priority::{FixedPriority, MAX_PRIORITY};
pub use reservation::ResourceReservation;

/// A task scheduled by fixed priority.
pub type FixedPriorityTaskDescriptor = TaskDescriptor<FixedPriority>;

/// A task scheduled by a resource reservation.
pub type ResourceReservationTaskDescriptor = TaskDescriptor<ResourceReservation>;

/// Policy-specific scheduling parameters of a task.
pub trait SchedulingParameters: Debug + Clone {
    /// Check the parameters' own invariants on behalf of task `task`.
    fn validate(&self, task: &str) -> Result<()>;

    /// Fraction of the processor claimed by the parameters
    /// themselves, if the policy reserves any.
    fn reserved_utilization(&self) -> Option<f64> {
        None
    }
}

/// How jobs of a task are activated.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// Strictly periodic activations. The interarrival time is the
    /// period with probability one.
    Periodic { period: Duration, interarrival: Pmf },
    /// Activations separated by random interarrival times.
    Aperiodic { interarrival: Pmf },
}

impl Activation {
    fn interarrival(&self) -> &Pmf {
        match self {
            Activation::Periodic { interarrival, .. } => interarrival,
            Activation::Aperiodic { interarrival } => interarrival,
        }
    }
}

/// The descriptor of a single task.
#[derive(Debug, Clone)]
pub struct TaskDescriptor<P> {
    name: String,
    computation: Pmf,
    activation: Activation,
    verbose: bool,
    deadlines: DeadlineTable,
    solver: Option<SolverId>,
    params: P,
}

impl<P: SchedulingParameters> TaskDescriptor<P> {
    /// Describe a task whose jobs arrive separated by random
    /// interarrival times distributed according to `interarrival`.
    pub fn aperiodic(
        name: impl Into<String>,
        computation: Pmf,
        interarrival: Pmf,
        params: P,
    ) -> Result<Self> {
        let name = name.into();
        params.validate(&name)?;
        Ok(Self::build(
            name,
            computation,
            Activation::Aperiodic { interarrival },
            params,
        ))
    }

    /// Describe a task whose jobs arrive exactly every `period` time units.
    pub fn periodic(
        name: impl Into<String>,
        computation: Pmf,
        period: Duration,
        params: P,
    ) -> Result<Self> {
        let name = name.into();
        if period == 0 {
            return Err(Error::InvalidArgument(format!(
                "period of task {} must be positive",
                name
            )));
        }
        params.validate(&name)?;
        let activation = Activation::Periodic {
            period,
            interarrival: Pmf::point_mass(period),
        };
        Ok(Self::build(name, computation, activation, params))
    }

    fn build(name: String, computation: Pmf, activation: Activation, params: P) -> Self {
        trace!(task = %name, ?params, "new task descriptor");
        TaskDescriptor {
            name,
            computation,
            activation,
            verbose: false,
            deadlines: DeadlineTable::default(),
            solver: None,
            params,
        }
    }
}

impl<P> TaskDescriptor<P> {
    /// The task's identifier, used for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the verbose flag and return its previous value.
    ///
    /// A verbose task reports its solved probabilities at `info`
    /// level instead of `debug`.
    pub fn set_verbose(&mut self, verbose: bool) -> bool {
        std::mem::replace(&mut self.verbose, verbose)
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self.activation, Activation::Periodic { .. })
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    /// The task period; fails for aperiodic tasks.
    pub fn period(&self) -> Result<Duration> {
        match &self.activation {
            Activation::Periodic { period, .. } => Ok(*period),
            Activation::Aperiodic { .. } => Err(Error::invalid_operation(
                &self.name,
                "period requested for an aperiodic task",
            )),
        }
    }

    /// The distribution of the computation time.
    pub fn computation_time(&self) -> &Pmf {
        &self.computation
    }

    /// The distribution of the interarrival time; fails for periodic
    /// tasks, whose interarrival time is just the period.
    pub fn interarrival_time(&self) -> Result<&Pmf> {
        match &self.activation {
            Activation::Aperiodic { interarrival } => Ok(interarrival),
            Activation::Periodic { .. } => Err(Error::invalid_operation(
                &self.name,
                "interarrival time requested for a periodic task",
            )),
        }
    }

    /// The interarrival model used by solvers: the distribution of
    /// the time between two activations for any kind of task.
    pub fn interarrival_model(&self) -> &Pmf {
        self.activation.interarrival()
    }

    /// Long-run fraction of the processor demanded by the task.
    pub fn utilization(&self) -> Option<f64> {
        let c = self.computation.mean()?;
        let z = self.interarrival_model().mean()?;
        (z > 0.0).then(|| c / z)
    }

    /// The policy-specific scheduling parameters.
    pub fn params(&self) -> &P {
        &self.params
    }

    /// Set the granularity of deadlines and return the previous one.
    ///
    /// The step can no longer change once a deadline is registered.
    pub fn set_deadline_step(&mut self, step: Duration) -> Result<Option<Duration>> {
        if step == 0 {
            return Err(Error::InvalidArgument(format!(
                "deadline step of task {} must be positive",
                self.name
            )));
        }
        if !self.deadlines.is_empty() {
            return Err(Error::invalid_operation(
                &self.name,
                "deadline step changed after deadlines were registered",
            ));
        }
        Ok(self.deadlines.set_step(step))
    }

    pub fn deadline_step(&self) -> Option<Duration> {
        self.deadlines.step()
    }

    /// Register a deadline whose probability is of interest.
    ///
    /// The deadline must be a positive multiple of the deadline step
    /// and must not be registered yet. Invalidates all previously
    /// computed probabilities.
    pub fn insert_deadline(&mut self, deadline: Deadline) -> Result<()> {
        let step = match self.deadlines.step() {
            Some(step) => step,
            None => {
                return Err(Error::InvalidArgument(format!(
                    "deadline step unset for task {}",
                    self.name
                )))
            }
        };
        if deadline == 0 || deadline % step != 0 {
            return Err(Error::MisalignedDeadline {
                task: self.name.clone(),
                deadline,
                step,
            });
        }
        if !self.deadlines.insert(deadline) {
            return Err(Error::DuplicateDeadline {
                task: self.name.clone(),
                deadline,
            });
        }
        Ok(())
    }

    /// The registered deadlines in increasing order.
    pub fn deadlines(&self) -> impl Iterator<Item = Deadline> + '_ {
        self.deadlines.deadlines()
    }

    pub fn deadline_table(&self) -> &DeadlineTable {
        &self.deadlines
    }

    /// True while the deadline probabilities reflect the current
    /// parameters and solver.
    pub fn is_solved(&self) -> bool {
        self.deadlines.is_solved()
    }

    /// The probability of meeting `deadline` as of the last solve,
    /// without triggering a new computation.
    pub fn cached_probability(&self, deadline: Deadline) -> Result<f64> {
        let p = self
            .deadlines
            .probability(deadline)
            .ok_or_else(|| Error::DeadlineNotFound {
                task: self.name.clone(),
                deadline,
            })?;
        if !self.deadlines.is_solved() {
            return Err(Error::invalid_operation(
                &self.name,
                "probabilities not computed yet",
            ));
        }
        Ok(p)
    }

    /// The solver this task is currently bound to, if any.
    pub fn solver(&self) -> Option<SolverId> {
        self.solver
    }

    pub(crate) fn bind_solver(&mut self, solver: SolverId) -> Option<SolverId> {
        self.deadlines.invalidate();
        self.solver.replace(solver)
    }

    pub(crate) fn unbind(&mut self) {
        self.deadlines.invalidate();
        self.solver = None;
    }

    pub(crate) fn invalidate(&mut self) {
        self.deadlines.invalidate();
    }

    pub(crate) fn commit(&mut self, mut table: DeadlineTable) {
        table.mark_solved();
        self.deadlines = table;
    }
}
