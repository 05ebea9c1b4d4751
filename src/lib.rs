/*! Probabilistic deadline analysis for real-time tasks

This crate estimates, for a task running under a given scheduling
policy, the probability that its response time stays within each of a
set of deadlines, given discrete distributions of its computation and
interarrival times. The result can then be scored with a *quality of
service* function to compare scheduling parameters (a fixed priority,
or the budget and period of a reservation) against each other.

The main pieces are:
- [distribution::Pmf], discrete probability distributions over time;
- [task::TaskDescriptor], the timing model, scheduling parameters, and
  deadline/probability cache of a task;
- [solver::Solver] and [solver::TaskSet], which compute the deadline
  probabilities of tasks registered with a solver;
- [qos], QoS functions and the registry that builds them from
  configuration.

```
use prob_rta::distribution::Pmf;
use prob_rta::solver::{StochasticFixedPriority, TaskSet};
use prob_rta::task::{FixedPriority, FixedPriorityTaskDescriptor};

let cost = Pmf::from_masses(vec![(2, 0.5), (4, 0.5)])?;
let mut task = FixedPriorityTaskDescriptor::periodic("control", cost, 20, FixedPriority::new(10))?;
task.set_deadline_step(2)?;
task.insert_deadline(4)?;

let mut set = TaskSet::new();
let id = set.add_task(task);
let solver = set.add_solver(StochasticFixedPriority::new());
set.set_solver(id, solver)?;
assert_eq!(set.probability(id, 4)?, 1.0);
# Ok::<(), prob_rta::Error>(())
```
*/

pub mod distribution;
pub mod error;
pub mod fixed_point;
pub mod qos;
pub mod solver;
pub mod supply;
pub mod task;
pub mod time;

pub use error::{Error, ErrorKind, Result};
