use super::{SchedulingParameters, TaskDescriptor};
use crate::error::{Error, Result};
use crate::time::{Duration, Service};

/// Parameters of a task served by a resource reservation: the task
/// receives `budget` time units of service every `server_period`
/// time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceReservation {
    budget: Service,
    server_period: Duration,
}

impl ResourceReservation {
    pub fn new(budget: Service, server_period: Duration) -> Self {
        ResourceReservation {
            budget,
            server_period,
        }
    }

    pub fn budget(&self) -> Service {
        self.budget
    }

    pub fn server_period(&self) -> Duration {
        self.server_period
    }

    /// The reserved bandwidth `budget / server_period`.
    pub fn bandwidth(&self) -> f64 {
        self.budget as f64 / self.server_period as f64
    }
}

fn check_reservation(task: &str, budget: Service, server_period: Duration) -> Result<()> {
    if budget == 0 || server_period == 0 {
        return Err(Error::InvalidArgument(format!(
            "budget and server period of task {} must be positive",
            task
        )));
    }
    // Q / Ts <= 1, without rounding
    if budget > server_period {
        return Err(Error::range_violation(
            task,
            format!(
                "budget {} exceeds server period {}",
                budget, server_period
            ),
        ));
    }
    Ok(())
}

impl SchedulingParameters for ResourceReservation {
    fn validate(&self, task: &str) -> Result<()> {
        check_reservation(task, self.budget, self.server_period)
    }

    fn reserved_utilization(&self) -> Option<f64> {
        Some(self.bandwidth())
    }
}

impl TaskDescriptor<ResourceReservation> {
    pub fn budget(&self) -> Service {
        self.params.budget
    }

    pub fn server_period(&self) -> Duration {
        self.params.server_period
    }

    /// Change the budget and return the previous one. The new budget
    /// must not exceed the current server period.
    pub fn set_budget(&mut self, budget: Service) -> Result<Service> {
        check_reservation(&self.name, budget, self.params.server_period)?;
        let old = std::mem::replace(&mut self.params.budget, budget);
        if old != budget {
            self.invalidate();
        }
        Ok(old)
    }

    /// Change the server period and return the previous one. The new
    /// period must not be shorter than the current budget.
    pub fn set_server_period(&mut self, server_period: Duration) -> Result<Duration> {
        check_reservation(&self.name, self.params.budget, server_period)?;
        let old = std::mem::replace(&mut self.params.server_period, server_period);
        if old != server_period {
            self.invalidate();
        }
        Ok(old)
    }
}
