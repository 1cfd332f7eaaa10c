use serde::{Deserialize, Serialize};

use crate::domain::{CandidateId, RouteCandidate, RouteRequest, RouteVariant};

/// Request body understood by the route oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRouteRequest {
    pub start_location: String,
    pub end_location: String,
    pub current_traffic_conditions: String,
    pub road_closures: String,
    pub user_preferences: String,
}

impl From<&RouteRequest> for OptimizeRouteRequest {
    fn from(request: &RouteRequest) -> Self {
        Self {
            start_location: request.start_location.clone(),
            end_location: request.end_location.clone(),
            current_traffic_conditions: request.traffic_conditions.clone(),
            road_closures: request.road_closures.clone(),
            user_preferences: request.preferences.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRouteResponse {
    pub optimized_route: String,
    pub estimated_travel_time: String,
    pub route_summary: String,
}

impl OptimizeRouteResponse {
    pub fn into_candidate(self, id: CandidateId, variant: RouteVariant) -> RouteCandidate {
        RouteCandidate {
            id,
            variant,
            narrative_text: self.optimized_route,
            estimated_travel_time: self.estimated_travel_time,
            summary: self.route_summary,
        }
    }
}
