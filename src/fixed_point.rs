use crate::supply::SupplyBound;
use crate::time::{Duration, Service};

use thiserror::Error;

/// Error type returned when a fixed point search fails.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq, PartialOrd)]
pub enum SearchFailure {
    /// No fixed point found below the given divergence threshold.
    #[error("no fixed point less than {limit} found")]
    DivergenceLimitExceeded { limit: Duration },
}

pub type SearchResult = Result<Duration, SearchFailure>;

/// Iterative search for the least fixed point `R = service_time(workload(R))`
/// up to a given `divergence_limit`, assuming a given processor supply
/// and a generic workload bound.
pub fn search<SBF, RHS>(supply: &SBF, divergence_limit: Duration, workload: RHS) -> SearchResult
where
    SBF: SupplyBound + ?Sized,
    RHS: Fn(Duration) -> Service,
{
    let mut assumed_response_time = 1;
    let result = loop {
        if assumed_response_time > divergence_limit {
            // if we get here, we failed to converge => no solution
            break Err(SearchFailure::DivergenceLimitExceeded {
                limit: divergence_limit,
            });
        }
        let demand = workload(assumed_response_time);
        let response_time_bound = supply.service_time(demand);
        if response_time_bound <= assumed_response_time {
            // we have converged
            break Ok(response_time_bound);
        }
        // continue iterating
        assumed_response_time = response_time_bound;
    };
    // In debug mode, compare against the brute-force solution.
    #[cfg(debug_assertions)]
    debug_assert_eq!(
        brute_force_search(supply, divergence_limit, &workload),
        result
    );
    result
}

/// Very slow, naive search for a fixed point up to the given
/// `divergence_limit`. Do not use --- use [search] instead.
#[cfg(debug_assertions)]
fn brute_force_search<SBF, RHS>(
    supply: &SBF,
    divergence_limit: Duration,
    workload: &RHS,
) -> SearchResult
where
    SBF: SupplyBound + ?Sized,
    RHS: Fn(Duration) -> Service,
{
    for r in 1..=divergence_limit {
        let lhs = supply.provided_service(r);
        let rhs = workload(r);
        // corner case: zero demand is trivially satisfied immediately
        if rhs == 0 {
            return Ok(0);
        } else if lhs == rhs {
            return Ok(r);
        }
    }
    Err(SearchFailure::DivergenceLimitExceeded {
        limit: divergence_limit,
    })
}
