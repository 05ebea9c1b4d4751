/*! Solvers and the task sets they govern

A [Solver] computes, for one task, the probability of meeting each of
its registered deadlines. It may take into account every other task
registered with the same solver: under fixed-priority scheduling, the
response time of a task depends on all tasks of higher or equal
priority, whereas a reservation isolates a task from everybody else.

Tasks and solvers do not refer to each other directly. Both live in a
[TaskSet], which hands out [TaskId] and [SolverId] handles, remembers
which tasks are registered with which solver, and keeps the
per-task probability caches consistent: binding a task to a different
solver, registering a new task with a solver, or obtaining mutable
access to a task invalidates every cache whose result may have changed.

The task set is not internally synchronized. All mutation goes
through `&mut self`, so the borrow checker already prevents a task
from being modified while the probabilities of its peers are being
computed.
*/

use std::collections::BTreeSet;
use std::iter;

use auto_impl::auto_impl;
use derive_more::Display;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::qos::QosFunction;
use crate::task::{DeadlineTable, SchedulingParameters, TaskDescriptor};
use crate::time::Deadline;

/// Slack granted to the utilization bound for floating-point rounding.
const UTILIZATION_TOLERANCE: f64 = 1e-12;

mod fixed_priority;
mod reservation;

pub use fixed_priority::StochasticFixedPriority;
pub use reservation::{ReservationQueue, SupplyModel};

/// The interface implemented by all solution algorithms.
#[auto_impl(&, Box, Rc)]
pub trait Solver<P> {
    /// A short, human-readable name of the algorithm.
    fn name(&self) -> &str;

    /// Fill `table` with the probabilities that jobs of `task` meet
    /// each of the table's deadlines, given the other tasks `peers`
    /// registered with the same solver.
    ///
    /// Every probability must lie in `[0, 1]`, and the result must
    /// only depend on the parameters of `task` and `peers`.
    fn solve(
        &self,
        task: &TaskDescriptor<P>,
        peers: &[&TaskDescriptor<P>],
        table: &mut DeadlineTable,
    ) -> Result<()>;
}

/// Handle of a task within a [TaskSet].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display(fmt = "task #{}", _0)]
pub struct TaskId(usize);

/// Handle of a solver within a [TaskSet].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display(fmt = "solver #{}", _0)]
pub struct SolverId(usize);

struct SolverEntry<P> {
    solver: Box<dyn Solver<P>>,
    members: BTreeSet<TaskId>,
}

/// Owner of a collection of tasks and of the solvers that analyze them.
pub struct TaskSet<P> {
    tasks: Vec<TaskDescriptor<P>>,
    solvers: Vec<SolverEntry<P>>,
}

impl<P> Default for TaskSet<P> {
    fn default() -> Self {
        TaskSet {
            tasks: Vec::new(),
            solvers: Vec::new(),
        }
    }
}

impl<P: SchedulingParameters> TaskSet<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a task and return its handle. The task
    /// starts out unbound.
    pub fn add_task(&mut self, mut task: TaskDescriptor<P>) -> TaskId {
        task.unbind();
        let id = TaskId(self.tasks.len());
        debug!(task = %task.name(), %id, "task added");
        self.tasks.push(task);
        id
    }

    /// Take ownership of a solver and return its handle.
    pub fn add_solver(&mut self, solver: impl Solver<P> + 'static) -> SolverId {
        let id = SolverId(self.solvers.len());
        debug!(solver = solver.name(), %id, "solver added");
        self.solvers.push(SolverEntry {
            solver: Box::new(solver),
            members: BTreeSet::new(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, id: TaskId) -> Result<&TaskDescriptor<P>> {
        self.tasks
            .get(id.0)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown {}", id)))
    }

    /// Mutable access to a task.
    ///
    /// Since the caller may change parameters that other tasks'
    /// probabilities depend on, the caches of all tasks registered
    /// with the same solver are invalidated. The task's own cache is
    /// invalidated by its mutators as needed.
    pub fn task_mut(&mut self, id: TaskId) -> Result<&mut TaskDescriptor<P>> {
        let solver = self.task(id)?.solver();
        if let Some(solver) = solver {
            self.invalidate_group(solver, Some(id));
        }
        Ok(&mut self.tasks[id.0])
    }

    /// Iterate over all tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = (TaskId, &TaskDescriptor<P>)> + '_ {
        self.tasks.iter().enumerate().map(|(i, t)| (TaskId(i), t))
    }

    pub fn solver(&self, id: SolverId) -> Result<&dyn Solver<P>> {
        Ok(&*self.entry(id)?.solver)
    }

    /// The tasks currently registered with `solver`, in handle order.
    pub fn members(&self, solver: SolverId) -> Result<impl Iterator<Item = TaskId> + '_> {
        Ok(self.entry(solver)?.members.iter().copied())
    }

    fn entry(&self, id: SolverId) -> Result<&SolverEntry<P>> {
        self.solvers
            .get(id.0)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown {}", id)))
    }

    fn invalidate_group(&mut self, solver: SolverId, except: Option<TaskId>) {
        for id in self.solvers[solver.0].members.iter() {
            if Some(*id) != except {
                self.tasks[id.0].invalidate();
            }
        }
    }

    /// Bind `task` to `solver` and return the previous binding.
    ///
    /// The task's cached probabilities are always invalidated. If the
    /// task was bound to a different solver before, it leaves that
    /// solver's task set.
    pub fn set_solver(&mut self, task: TaskId, solver: SolverId) -> Result<Option<SolverId>> {
        self.entry(solver)?;
        self.task(task)?;
        let previous = self.tasks[task.0].bind_solver(solver);
        if let Some(old) = previous.filter(|old| *old != solver) {
            self.solvers[old.0].members.remove(&task);
            self.invalidate_group(old, None);
        }
        if self.solvers[solver.0].members.insert(task) {
            debug!(task = %self.tasks[task.0].name(), %solver, "task registered");
            self.invalidate_group(solver, None);
        }
        Ok(previous)
    }

    /// Register `task` with `solver`, binding it to the solver.
    ///
    /// Registering a task that is already registered with the same
    /// solver is a no-op and returns `false`.
    pub fn register_task(&mut self, solver: SolverId, task: TaskId) -> Result<bool> {
        if self.entry(solver)?.members.contains(&task) {
            return Ok(false);
        }
        self.set_solver(task, solver)?;
        Ok(true)
    }

    /// Compute the deadline probabilities of `task` with its bound
    /// solver, unless the cached ones are still valid.
    pub fn compute_probability(&mut self, task: TaskId) -> Result<()> {
        let descriptor = self.task(task)?;
        let solver = descriptor.solver().ok_or_else(|| {
            Error::invalid_operation(descriptor.name(), "probability solver unset")
        })?;
        if descriptor.deadline_table().is_empty() {
            return Err(Error::invalid_operation(
                descriptor.name(),
                "no deadline specified",
            ));
        }
        if descriptor.is_solved() {
            return Ok(());
        }

        let entry = &self.solvers[solver.0];
        let peers: Vec<&TaskDescriptor<P>> = entry
            .members
            .iter()
            .filter(|id| **id != task)
            .map(|id| &self.tasks[id.0])
            .collect();
        debug!(
            task = %descriptor.name(),
            solver = entry.solver.name(),
            peers = peers.len(),
            "computing deadline probabilities"
        );

        // solve into a scratch copy so that failures leave the cache untouched
        let mut table = descriptor.deadline_table().clone();
        entry.solver.solve(descriptor, &peers, &mut table)?;
        if let Some((deadline, p)) = table.iter().find(|(_, p)| !(0.0..=1.0).contains(p)) {
            return Err(Error::unsolvable(
                descriptor.name(),
                format!("probability {} for deadline {} outside [0, 1]", p, deadline),
            ));
        }
        for (deadline, probability) in table.iter() {
            if descriptor.is_verbose() {
                info!(task = %descriptor.name(), deadline, probability, "deadline probability");
            } else {
                debug!(task = %descriptor.name(), deadline, probability, "deadline probability");
            }
        }
        self.tasks[task.0].commit(table);
        Ok(())
    }

    /// The probability that jobs of `task` meet `deadline`, computing
    /// it first if the cache is not valid.
    pub fn probability(&mut self, task: TaskId, deadline: Deadline) -> Result<f64> {
        if !self.task(task)?.is_solved() {
            self.compute_probability(task)?;
        }
        self.tasks[task.0].cached_probability(deadline)
    }

    /// Score the probability of meeting `deadline` with a QoS function.
    pub fn quality<Q>(&mut self, task: TaskId, deadline: Deadline, qos: &Q) -> Result<f64>
    where
        Q: QosFunction + ?Sized,
    {
        Ok(qos.eval(self.probability(task, deadline)?))
    }
}

/// Reject task sets that no solver can analyze: empty or degenerate
/// distributions and aggregate utilization above one.
///
/// Tasks that reserve a share of the processor count with their
/// reserved bandwidth, all others with their expected demand.
pub(crate) fn check_task_set<P: SchedulingParameters>(
    task: &TaskDescriptor<P>,
    peers: &[&TaskDescriptor<P>],
) -> Result<()> {
    let mut total = 0.0;
    for t in iter::once(task).chain(peers.iter().copied()) {
        if t.computation_time().is_empty() {
            return Err(Error::unsolvable(
                task.name(),
                format!("empty computation time distribution for task {}", t.name()),
            ));
        }
        let interarrival = t.interarrival_model();
        if interarrival.min().map_or(true, |z| z == 0) {
            return Err(Error::unsolvable(
                task.name(),
                format!("degenerate interarrival distribution for task {}", t.name()),
            ));
        }
        total += match t.params().reserved_utilization() {
            Some(u) => u,
            None => t.utilization().unwrap_or(f64::INFINITY),
        };
    }
    if total > 1.0 + UTILIZATION_TOLERANCE {
        debug!(task = %task.name(), utilization = total, "task set overloaded");
        return Err(Error::unsolvable(
            task.name(),
            format!("aggregate utilization {} exceeds 1", total),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
