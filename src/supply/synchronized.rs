use super::SupplyBound;
use crate::task::ResourceReservation;
use crate::time::{Duration, Service};

/// A reservation whose server periods are aligned with the
/// activations of the served task.
///
/// The full `budget` is granted at the beginning of every server
/// period and consumed without interruption, as a constant-bandwidth
/// server does for a task whose activations coincide with budget
/// replenishments.
#[derive(Debug, Clone, Copy)]
pub struct Synchronized {
    period: Duration,
    budget: Service,
}

impl Synchronized {
    /// Construct a new synchronized supply, where `0 < budget <= period`.
    pub fn new(budget: Service, period: Duration) -> Self {
        assert!(budget > 0 && budget <= period);
        Synchronized { period, budget }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn budget(&self) -> Service {
        self.budget
    }
}

impl From<&ResourceReservation> for Synchronized {
    fn from(r: &ResourceReservation) -> Self {
        Synchronized::new(r.budget(), r.server_period())
    }
}

impl SupplyBound for Synchronized {
    fn provided_service(&self, delta: Duration) -> Service {
        let full_periods = delta / self.period;
        full_periods * self.budget + (delta % self.period).min(self.budget)
    }

    fn service_time(&self, demand: Service) -> Duration {
        if demand == 0 {
            return 0;
        }
        // the last, possibly partial, chunk is served at the start of its period
        let full_periods = (demand - 1) / self.budget;
        full_periods * self.period + (demand - full_periods * self.budget)
    }
}
