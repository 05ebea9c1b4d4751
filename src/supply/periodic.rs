use super::SupplyBound;
use crate::task::ResourceReservation;
use crate::time::{Duration, Service};

/// The classic periodic resource model.
///
/// The client of this supply is guaranteed (at least) `budget` time
/// units of processor service every `period` time units, but nothing
/// is known about where in the period the budget is granted. This is
/// the most pessimistic view of a reservation.
#[derive(Debug, Clone, Copy)]
pub struct Periodic {
    period: Duration,
    budget: Service,
}

impl Periodic {
    /// Construct a new periodic supply, where `0 < budget <= period`.
    pub fn new(budget: Service, period: Duration) -> Self {
        assert!(budget > 0 && budget <= period);
        Periodic { period, budget }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn budget(&self) -> Service {
        self.budget
    }
}

impl From<&ResourceReservation> for Periodic {
    fn from(r: &ResourceReservation) -> Self {
        Periodic::new(r.budget(), r.server_period())
    }
}

impl SupplyBound for Periodic {
    fn provided_service(&self, delta: Duration) -> Service {
        // Supply bound function of the periodic resource model,
        // as given by Shin & Lee (RTSS 2003).
        let slack = self.period - self.budget;
        if slack > delta {
            return 0;
        }
        // implicit floor due to integer division
        let full_periods = (delta - slack) / self.period;
        let x = slack + slack + full_periods * self.period;
        let fractional_period = if x < delta { delta - x } else { 0 };

        full_periods * self.budget + fractional_period
    }

    fn service_time(&self, demand: Service) -> Duration {
        if demand == 0 {
            return 0;
        }
        let slack = self.period - self.budget;
        let full_periods = demand / self.budget;
        let full_budget = full_periods * self.budget;
        let fractional_budget = if full_budget < demand {
            slack + demand - full_budget
        } else {
            0
        };

        slack + self.period * full_periods + fractional_budget
    }
}
