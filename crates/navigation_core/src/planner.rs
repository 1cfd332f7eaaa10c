use std::sync::Arc;

use futures::future::join_all;
use shared::{
    domain::{CandidateId, RouteCandidate, RouteRequest, RouteVariant},
    error::NavigationError,
    protocol::OptimizeRouteRequest,
};
use tracing::{info, warn};

use crate::oracle::RouteOracle;

/// Issues one oracle request per [`RouteVariant`] concurrently and joins on
/// all of them. Candidate ids follow issue order, never completion order.
pub struct RoutePlanner {
    oracle: Arc<dyn RouteOracle>,
}

impl RoutePlanner {
    pub fn new(oracle: Arc<dyn RouteOracle>) -> Self {
        Self { oracle }
    }

    pub async fn plan_routes(
        &self,
        base: &RouteRequest,
    ) -> Result<Vec<RouteCandidate>, NavigationError> {
        let calls = RouteVariant::ALL.into_iter().map(|variant| {
            let request = OptimizeRouteRequest::from(&base.for_variant(variant));
            async move { (variant, self.oracle.optimize_route(request).await) }
        });

        let settled = join_all(calls).await;

        let mut candidates = Vec::with_capacity(settled.len());
        for (index, (variant, outcome)) in settled.into_iter().enumerate() {
            match outcome {
                Ok(response) => {
                    candidates.push(response.into_candidate(CandidateId(index as i64), variant));
                }
                Err(err) => {
                    warn!(
                        %variant,
                        start = %base.start_location,
                        end = %base.end_location,
                        "planner: oracle request failed: {err:#}"
                    );
                    return Err(NavigationError::Oracle {
                        variant,
                        reason: format!("{err:#}"),
                    });
                }
            }
        }

        info!(
            start = %base.start_location,
            end = %base.end_location,
            candidates = candidates.len(),
            "planner: route fan-out complete"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
#[path = "tests/planner_tests.rs"]
mod tests;
