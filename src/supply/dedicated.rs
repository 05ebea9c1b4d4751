use super::SupplyBound;
use crate::time::{Duration, Service};

/// A trivial model to represent a 100%-available, dedicated processor.
///
/// Fixed-priority tasks that are not served by a reservation see
/// this supply.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dedicated;

impl Dedicated {
    pub fn new() -> Dedicated {
        Dedicated
    }
}

impl SupplyBound for Dedicated {
    fn provided_service(&self, delta: Duration) -> Service {
        delta
    }

    fn service_time(&self, demand: Service) -> Duration {
        demand
    }
}
