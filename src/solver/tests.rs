use std::cell::Cell;
use std::rc::Rc;

use assert_approx_eq::assert_approx_eq;

use crate::distribution::Pmf;
use crate::error::{ErrorKind, Result};
use crate::qos::LinearQosFunction;
use crate::solver::{
    ReservationQueue, Solver, SolverId, StochasticFixedPriority, SupplyModel, TaskId, TaskSet,
};
use crate::task::{
    DeadlineTable, FixedPriority, FixedPriorityTaskDescriptor, ResourceReservation,
    ResourceReservationTaskDescriptor, TaskDescriptor,
};
use crate::tests::{fp_task, pmf, rr_task};

/// Reports the same probability for every deadline and counts how
/// often it was asked to.
struct Constant {
    value: f64,
    calls: Rc<Cell<usize>>,
}

impl Constant {
    fn new(value: f64) -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Constant {
                value,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl<P> Solver<P> for Constant {
    fn name(&self) -> &str {
        "constant"
    }

    fn solve(
        &self,
        _task: &TaskDescriptor<P>,
        _peers: &[&TaskDescriptor<P>],
        table: &mut DeadlineTable,
    ) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        for (_, p) in table.iter_mut() {
            *p = self.value;
        }
        Ok(())
    }
}

/// Reports a tenth of the number of peers for every deadline.
struct CountPeers;

impl<P> Solver<P> for CountPeers {
    fn name(&self) -> &str {
        "count peers"
    }

    fn solve(
        &self,
        _task: &TaskDescriptor<P>,
        peers: &[&TaskDescriptor<P>],
        table: &mut DeadlineTable,
    ) -> Result<()> {
        for (_, p) in table.iter_mut() {
            *p = peers.len() as f64 / 10.0;
        }
        Ok(())
    }
}

fn simple_task(name: &str) -> FixedPriorityTaskDescriptor {
    fp_task(name, &[(1, 1.0)], 10, 1, 5, 10)
}

#[test]
fn solving_requires_solver_and_deadlines() {
    let mut set = TaskSet::new();
    let unbound = set.add_task(simple_task("unbound"));
    let e = set.probability(unbound, 5).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidOperation);

    let no_deadlines = set.add_task(
        FixedPriorityTaskDescriptor::periodic("empty", pmf(&[(1, 1.0)]), 10, FixedPriority::new(1))
            .unwrap(),
    );
    let (solver, calls) = Constant::new(0.5);
    let s = set.add_solver(solver);
    set.set_solver(no_deadlines, s).unwrap();
    let e = set.compute_probability(no_deadlines).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidOperation);
    assert_eq!(calls.get(), 0);
}

#[test]
fn unknown_handles() {
    let mut set: TaskSet<FixedPriority> = TaskSet::new();
    let t = set.add_task(simple_task("t"));
    let e = set.set_solver(t, SolverId(3)).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    assert!(set.task(t).unwrap().solver().is_none());
    let e = set.probability(TaskId(7), 5).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn lazy_and_cached() {
    let mut set = TaskSet::new();
    let t = set.add_task(simple_task("t"));
    let (solver, calls) = Constant::new(0.25);
    let s = set.add_solver(solver);
    assert_eq!(set.set_solver(t, s).unwrap(), None);
    assert!(!set.task(t).unwrap().is_solved());
    assert_eq!(calls.get(), 0);

    assert_eq!(set.probability(t, 5).unwrap(), 0.25);
    assert_eq!(set.probability(t, 5).unwrap(), 0.25);
    assert_eq!(set.probability(t, 10).unwrap(), 0.25);
    assert_eq!(calls.get(), 1);
    assert!(set.task(t).unwrap().is_solved());
    assert_eq!(set.task(t).unwrap().cached_probability(10).unwrap(), 0.25);

    // unknown deadlines are reported after solving
    let e = set.probability(t, 15).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);
    assert_eq!(calls.get(), 1);
}

#[test]
fn unknown_deadline_still_triggers_solve() {
    let mut set = TaskSet::new();
    let t = set.add_task(simple_task("t"));
    let (solver, calls) = Constant::new(0.25);
    let s = set.add_solver(solver);
    set.set_solver(t, s).unwrap();
    let e = set.probability(t, 7).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);
    assert_eq!(calls.get(), 1);
    assert!(set.task(t).unwrap().is_solved());
}

#[test]
fn rebinding_invalidates() {
    let mut set = TaskSet::new();
    let t = set.add_task(simple_task("t"));
    let (first, first_calls) = Constant::new(0.25);
    let (second, second_calls) = Constant::new(0.75);
    let s1 = set.add_solver(first);
    let s2 = set.add_solver(second);

    set.set_solver(t, s1).unwrap();
    assert_eq!(set.probability(t, 5).unwrap(), 0.25);

    // rebinding to the same solver still clears the cache
    assert_eq!(set.set_solver(t, s1).unwrap(), Some(s1));
    assert!(!set.task(t).unwrap().is_solved());
    assert_eq!(set.probability(t, 5).unwrap(), 0.25);
    assert_eq!(first_calls.get(), 2);

    assert_eq!(set.set_solver(t, s2).unwrap(), Some(s1));
    assert!(!set.task(t).unwrap().is_solved());
    assert_eq!(set.probability(t, 5).unwrap(), 0.75);
    assert_eq!(second_calls.get(), 1);
    assert_eq!(set.task(t).unwrap().solver(), Some(s2));
    assert_eq!(set.members(s1).unwrap().count(), 0);
    assert_eq!(set.members(s2).unwrap().collect::<Vec<_>>(), vec![t]);
}

#[test]
fn duplicate_registration_is_a_no_op() {
    let mut set = TaskSet::new();
    let t = set.add_task(simple_task("t"));
    let (solver, _) = Constant::new(0.5);
    let s = set.add_solver(solver);
    assert!(set.register_task(s, t).unwrap());
    assert!(!set.register_task(s, t).unwrap());
    assert_eq!(set.members(s).unwrap().collect::<Vec<_>>(), vec![t]);
    assert_eq!(set.task(t).unwrap().solver(), Some(s));
}

#[test]
fn peers_share_a_solver() {
    let mut set = TaskSet::new();
    let a = set.add_task(simple_task("a"));
    let b = set.add_task(simple_task("b"));
    let c = set.add_task(simple_task("c"));
    let s = set.add_solver(CountPeers);
    let (other, _) = Constant::new(1.0);
    let o = set.add_solver(other);

    set.set_solver(a, s).unwrap();
    assert_approx_eq!(set.probability(a, 5).unwrap(), 0.0);

    // a new member changes the peers of everybody else
    set.set_solver(b, s).unwrap();
    assert!(!set.task(a).unwrap().is_solved());
    assert_approx_eq!(set.probability(a, 5).unwrap(), 0.1);
    assert_approx_eq!(set.probability(b, 5).unwrap(), 0.1);

    // tasks bound elsewhere are not peers
    set.set_solver(c, o).unwrap();
    assert!(set.task(a).unwrap().is_solved());
    assert_approx_eq!(set.probability(a, 5).unwrap(), 0.1);

    // leaving a solver invalidates the remaining members
    set.set_solver(b, o).unwrap();
    assert!(!set.task(a).unwrap().is_solved());
    assert_approx_eq!(set.probability(a, 5).unwrap(), 0.0);
}

#[test]
fn mutable_access_invalidates_peers() {
    let mut set = TaskSet::new();
    let a = set.add_task(simple_task("a"));
    let b = set.add_task(simple_task("b"));
    let (solver, calls) = Constant::new(0.5);
    let s = set.add_solver(solver);
    set.set_solver(a, s).unwrap();
    set.set_solver(b, s).unwrap();
    set.probability(a, 5).unwrap();
    set.probability(b, 5).unwrap();
    assert_eq!(calls.get(), 2);

    set.task_mut(b).unwrap().set_priority(5).unwrap();
    assert!(!set.task(a).unwrap().is_solved());
    assert!(!set.task(b).unwrap().is_solved());
    set.probability(a, 5).unwrap();
    set.probability(b, 5).unwrap();
    assert_eq!(calls.get(), 4);
}

#[test]
fn invalid_results_leave_cache_untouched() {
    let mut set = TaskSet::new();
    let t = set.add_task(simple_task("t"));
    let (solver, _) = Constant::new(1.5);
    let s = set.add_solver(solver);
    set.set_solver(t, s).unwrap();
    let e = set.compute_probability(t).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnsolvableConfiguration);
    let task = set.task(t).unwrap();
    assert!(!task.is_solved());
    assert_eq!(task.deadline_table().probability(5), Some(0.0));
}

#[test]
fn quality_scores_probability() {
    let mut set = TaskSet::new();
    let t = set.add_task(simple_task("t"));
    let (solver, _) = Constant::new(0.7);
    let s = set.add_solver(solver);
    set.set_solver(t, s).unwrap();
    let qos = LinearQosFunction::new(2.0, 0.5, 0.9, 1.0).unwrap();
    assert_approx_eq!(set.quality(t, 10, &qos).unwrap(), 1.4);
}

fn fp_set(tasks: Vec<FixedPriorityTaskDescriptor>) -> (TaskSet<FixedPriority>, Vec<TaskId>) {
    let mut set = TaskSet::new();
    let solver = set.add_solver(StochasticFixedPriority::new());
    let ids: Vec<TaskId> = tasks.into_iter().map(|t| set.add_task(t)).collect();
    for id in ids.iter() {
        set.set_solver(*id, solver).unwrap();
    }
    (set, ids)
}

#[test]
fn fp_interference() {
    let (mut set, ids) = fp_set(vec![
        fp_task("high", &[(2, 1.0)], 5, 1, 2, 10),
        fp_task("low", &[(2, 0.5), (4, 0.5)], 20, 2, 2, 10),
    ]);
    let (high, low) = (ids[0], ids[1]);

    // the high-priority task never waits
    for d in [2, 4, 6, 8, 10] {
        assert_approx_eq!(set.probability(high, d).unwrap(), 1.0);
    }

    // the low-priority job completes at 4 or, if it misses the
    // release at 5, at 8
    let expected = [(2, 0.0), (4, 0.5), (6, 0.5), (8, 1.0), (10, 1.0)];
    for (d, p) in expected {
        assert_approx_eq!(set.probability(low, d).unwrap(), p);
    }
}

#[test]
fn fp_priority_change_invalidates() {
    let (mut set, ids) = fp_set(vec![
        fp_task("a", &[(2, 1.0)], 5, 1, 2, 10),
        fp_task("b", &[(2, 0.5), (4, 0.5)], 20, 2, 2, 10),
    ]);
    let (a, b) = (ids[0], ids[1]);
    assert_approx_eq!(set.probability(b, 4).unwrap(), 0.5);

    // b now outranks a
    assert_eq!(set.task_mut(b).unwrap().set_priority(0).unwrap(), 2);
    assert!(!set.task(b).unwrap().is_solved());
    assert_approx_eq!(set.probability(b, 2).unwrap(), 0.5);
    assert_approx_eq!(set.probability(b, 4).unwrap(), 1.0);
    assert_approx_eq!(set.probability(a, 2).unwrap(), 0.0);
    assert_approx_eq!(set.probability(a, 4).unwrap(), 0.5);
    assert_approx_eq!(set.probability(a, 6).unwrap(), 1.0);
}

#[test]
fn fp_equal_priorities_interfere() {
    let (mut set, ids) = fp_set(vec![
        fp_task("a", &[(2, 1.0)], 5, 3, 2, 10),
        fp_task("b", &[(2, 0.5), (4, 0.5)], 20, 3, 2, 10),
    ]);
    let (a, b) = (ids[0], ids[1]);
    assert_approx_eq!(set.probability(a, 4).unwrap(), 0.5);
    assert_approx_eq!(set.probability(a, 6).unwrap(), 1.0);
    assert_approx_eq!(set.probability(b, 4).unwrap(), 0.5);
    assert_approx_eq!(set.probability(b, 8).unwrap(), 1.0);
}

#[test]
fn fp_aperiodic_interferer_at_min_interarrival() {
    let mut high = FixedPriorityTaskDescriptor::aperiodic(
        "sporadic",
        pmf(&[(2, 1.0)]),
        pmf(&[(5, 0.5), (10, 0.5)]),
        FixedPriority::new(1),
    )
    .unwrap();
    high.set_deadline_step(2).unwrap();
    high.insert_deadline(2).unwrap();
    let (mut set, ids) = fp_set(vec![high, fp_task("low", &[(2, 0.5), (4, 0.5)], 20, 2, 2, 10)]);
    let low = ids[1];
    assert_approx_eq!(set.probability(low, 6).unwrap(), 0.5);
    assert_approx_eq!(set.probability(low, 8).unwrap(), 1.0);
}

#[test]
fn fp_overload_is_unsolvable() {
    let (mut set, ids) = fp_set(vec![
        fp_task("a", &[(3, 1.0)], 4, 1, 1, 10),
        fp_task("b", &[(2, 1.0)], 5, 2, 1, 10),
    ]);
    for id in ids {
        let e = set.probability(id, 5).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::UnsolvableConfiguration);
        assert!(!set.task(id).unwrap().is_solved());
    }
}

/// An aperiodic task with deadlines at 5 and 10.
fn aperiodic_fp_task(name: &str, cost: Pmf, interarrival: Pmf) -> FixedPriorityTaskDescriptor {
    let mut t =
        FixedPriorityTaskDescriptor::aperiodic(name, cost, interarrival, FixedPriority::new(1))
            .unwrap();
    t.set_deadline_step(5).unwrap();
    t.insert_deadline(5).unwrap();
    t.insert_deadline(10).unwrap();
    t
}

#[test]
fn fp_degenerate_interarrival_is_unsolvable() {
    for interarrival in [Pmf::default(), Pmf::point_mass(0), pmf(&[(0, 0.5), (10, 0.5)])] {
        let (mut set, ids) = fp_set(vec![aperiodic_fp_task(
            "bursty",
            pmf(&[(1, 1.0)]),
            interarrival,
        )]);
        let e = set.probability(ids[0], 5).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::UnsolvableConfiguration);
        assert!(!set.task(ids[0]).unwrap().is_solved());
    }
}

#[test]
fn fp_empty_computation_time_is_unsolvable() {
    let idle = FixedPriorityTaskDescriptor::periodic("idle", Pmf::default(), 10, FixedPriority::new(1))
        .unwrap();
    let (mut set, ids) = fp_set(vec![fp_task("t", &[(1, 1.0)], 10, 2, 5, 10), idle]);
    let e = set.probability(ids[0], 5).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnsolvableConfiguration);
    assert!(!set.task(ids[0]).unwrap().is_solved());

    // the same holds for the task under analysis itself
    let (mut set, ids) = fp_set(vec![aperiodic_fp_task(
        "empty",
        Pmf::default(),
        pmf(&[(10, 1.0)]),
    )]);
    let e = set.probability(ids[0], 5).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnsolvableConfiguration);
    assert!(!set.task(ids[0]).unwrap().is_solved());
}

#[test]
fn fp_results_are_consistent() {
    let (mut set, ids) = fp_set(vec![
        fp_task("a", &[(1, 0.5), (2, 0.3), (3, 0.2)], 7, 1, 1, 60),
        fp_task("b", &[(2, 0.6), (5, 0.4)], 11, 2, 1, 60),
        fp_task("c", &[(3, 0.2), (4, 0.5), (9, 0.3)], 30, 3, 1, 60),
    ]);
    for id in ids {
        let solved: Vec<f64> = (1..=60).map(|d| set.probability(id, d).unwrap()).collect();
        for w in solved.windows(2) {
            assert!(w[0] <= w[1] + 1e-12);
        }
        assert!(solved.iter().all(|p| (0.0..=1.0).contains(p)));

        // solving again from scratch yields identical values
        let solver = set.task(id).unwrap().solver().unwrap();
        set.set_solver(id, solver).unwrap();
        let again: Vec<f64> = (1..=60).map(|d| set.probability(id, d).unwrap()).collect();
        assert_eq!(solved, again);
    }
}

fn rr_set(tasks: Vec<ResourceReservationTaskDescriptor>, model: SupplyModel) -> (TaskSet<ResourceReservation>, Vec<TaskId>) {
    let mut set = TaskSet::new();
    let solver = set.add_solver(ReservationQueue::new(model));
    let ids: Vec<TaskId> = tasks.into_iter().map(|t| set.add_task(t)).collect();
    for id in ids.iter() {
        set.set_solver(*id, solver).unwrap();
    }
    (set, ids)
}

#[test]
fn rr_without_backlog() {
    let (mut set, ids) = rr_set(
        vec![rr_task("t", &[(2, 0.5), (4, 0.5)], 10, 2, 5, 10)],
        SupplyModel::Synchronized,
    );
    assert_approx_eq!(set.probability(ids[0], 5).unwrap(), 0.5);
    assert_approx_eq!(set.probability(ids[0], 10).unwrap(), 1.0);
}

#[test]
fn rr_with_backlog() {
    // the backlog is a reflected random walk with P(v = 2k) = 2/3 * 3^-k
    let (mut set, ids) = rr_set(
        vec![rr_task("t", &[(2, 0.75), (6, 0.25)], 10, 2, 5, 15)],
        SupplyModel::Synchronized,
    );
    assert_approx_eq!(set.probability(ids[0], 5).unwrap(), 0.5);
    assert_approx_eq!(set.probability(ids[0], 10).unwrap(), 2.0 / 3.0);
    assert_approx_eq!(set.probability(ids[0], 15).unwrap(), 8.0 / 9.0);
}

#[test]
fn rr_aperiodic() {
    let mut task = ResourceReservationTaskDescriptor::aperiodic(
        "t",
        pmf(&[(2, 0.5), (3, 0.5)]),
        pmf(&[(5, 0.5), (10, 0.5)]),
        ResourceReservation::new(2, 5),
    )
    .unwrap();
    task.set_deadline_step(5).unwrap();
    for d in [5, 10, 15] {
        task.insert_deadline(d).unwrap();
    }
    let (mut set, ids) = rr_set(vec![task], SupplyModel::Synchronized);
    assert_approx_eq!(set.probability(ids[0], 5).unwrap(), 0.292893, 1e-5);
    assert_approx_eq!(set.probability(ids[0], 10).unwrap(), 0.878680, 1e-5);
    assert_approx_eq!(set.probability(ids[0], 15).unwrap(), 0.979185, 1e-5);
}

#[test]
fn rr_budget_change_invalidates() {
    let (mut set, ids) = rr_set(
        vec![rr_task("t", &[(2, 0.75), (6, 0.25)], 10, 2, 5, 15)],
        SupplyModel::Synchronized,
    );
    let t = ids[0];
    assert_approx_eq!(set.probability(t, 5).unwrap(), 0.5);

    assert_eq!(set.task_mut(t).unwrap().set_budget(3).unwrap(), 2);
    assert!(!set.task(t).unwrap().is_solved());
    // 6 units per activation always drain the queue
    assert_approx_eq!(set.probability(t, 5).unwrap(), 0.75);
    assert_approx_eq!(set.probability(t, 10).unwrap(), 1.0);

    assert_eq!(set.task_mut(t).unwrap().set_server_period(10).unwrap(), 5);
    assert!(!set.task(t).unwrap().is_solved());
}

#[test]
fn rr_unstable_queue() {
    let (mut set, ids) = rr_set(
        vec![rr_task("t", &[(2, 0.5), (6, 0.5)], 10, 2, 5, 10)],
        SupplyModel::Synchronized,
    );
    let e = set.probability(ids[0], 5).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnsolvableConfiguration);
}

#[test]
fn rr_degenerate_distributions_are_unsolvable() {
    let cases = [
        (pmf(&[(1, 1.0)]), Pmf::default()),
        (pmf(&[(1, 1.0)]), Pmf::point_mass(0)),
        (Pmf::default(), pmf(&[(10, 1.0)])),
    ];
    for (cost, interarrival) in cases {
        let mut task = ResourceReservationTaskDescriptor::aperiodic(
            "t",
            cost,
            interarrival,
            ResourceReservation::new(2, 5),
        )
        .unwrap();
        task.set_deadline_step(5).unwrap();
        task.insert_deadline(5).unwrap();
        let (mut set, ids) = rr_set(vec![task], SupplyModel::Synchronized);
        let e = set.probability(ids[0], 5).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::UnsolvableConfiguration);
        assert!(!set.task(ids[0]).unwrap().is_solved());
    }
}

#[test]
fn rr_overbooked_processor() {
    let (mut set, ids) = rr_set(
        vec![
            rr_task("a", &[(1, 1.0)], 10, 3, 5, 10),
            rr_task("b", &[(1, 1.0)], 10, 3, 5, 10),
        ],
        SupplyModel::Synchronized,
    );
    let e = set.probability(ids[0], 5).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnsolvableConfiguration);

    // shrinking one reservation makes room for both
    set.task_mut(ids[1]).unwrap().set_budget(2).unwrap();
    assert_approx_eq!(set.probability(ids[0], 5).unwrap(), 1.0);
    assert_approx_eq!(set.probability(ids[1], 5).unwrap(), 1.0);
}

#[test]
fn rr_worst_case_is_pessimistic() {
    let cost = [(1, 0.2), (2, 0.3), (3, 0.3), (5, 0.2)];
    let (mut sync, s) = rr_set(vec![rr_task("t", &cost, 12, 2, 4, 40)], SupplyModel::Synchronized);
    let (mut worst, w) = rr_set(vec![rr_task("t", &cost, 12, 2, 4, 40)], SupplyModel::WorstCase);
    for d in (4..=40).step_by(4) {
        let optimistic = sync.probability(s[0], d).unwrap();
        let pessimistic = worst.probability(w[0], d).unwrap();
        assert!(pessimistic <= optimistic + 1e-9);
    }
}
