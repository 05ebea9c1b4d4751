/*! Models of processor supply

This module provides the trait [SupplyBound], which models the notion of
a *supply-bound function* (SBF), together with the supply models used by
the analyses of this crate: a [Dedicated] processor, the worst-case
[Periodic] resource model, and a [Synchronized] reservation whose budget
becomes available at the beginning of every server period. */

use auto_impl::auto_impl;

use crate::time::{Duration, Service};

/// Generic interface for models of processor supply.
#[auto_impl(&, Box, Rc)]
pub trait SupplyBound {
    /// Bound the minimum amount of service provided during an
    /// interval of length `delta`.
    fn provided_service(&self, delta: Duration) -> Service;

    /// Bound the maximum interval length during which the supply
    /// provides at least `demand` amount of service.
    fn service_time(&self, demand: Service) -> Duration {
        let mut t = demand;
        loop {
            let supply = self.provided_service(t);
            if supply >= demand {
                return t;
            }
            // jump ahead by how much is still missing
            t += demand - supply;
        }
    }
}

mod dedicated;
mod periodic;
mod synchronized;

pub use dedicated::Dedicated;
pub use periodic::Periodic;
pub use synchronized::Synchronized;
