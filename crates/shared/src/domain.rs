use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CandidateId);
id_newtype!(IncidentId);

/// Preference modifiers used to derive sibling requests from a base request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteVariant {
    Base,
    Scenic,
    HighwaysOnly,
}

impl RouteVariant {
    /// Fan-out issue order. Candidate ids are derived from the position here.
    pub const ALL: [RouteVariant; 3] = [
        RouteVariant::Base,
        RouteVariant::Scenic,
        RouteVariant::HighwaysOnly,
    ];

    pub fn modifier(self) -> Option<&'static str> {
        match self {
            RouteVariant::Base => None,
            RouteVariant::Scenic => Some("prefer scenic route"),
            RouteVariant::HighwaysOnly => Some("use highways only"),
        }
    }
}

impl fmt::Display for RouteVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RouteVariant::Base => "base",
            RouteVariant::Scenic => "scenic",
            RouteVariant::HighwaysOnly => "highways-only",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start_location: String,
    pub end_location: String,
    pub traffic_conditions: String,
    pub road_closures: String,
    pub preferences: String,
}

impl RouteRequest {
    pub fn new(start_location: impl Into<String>, end_location: impl Into<String>) -> Self {
        Self {
            start_location: start_location.into(),
            end_location: end_location.into(),
            ..Self::default()
        }
    }

    pub fn with_traffic_conditions(mut self, traffic_conditions: impl Into<String>) -> Self {
        self.traffic_conditions = traffic_conditions.into();
        self
    }

    pub fn with_road_closures(mut self, road_closures: impl Into<String>) -> Self {
        self.road_closures = road_closures.into();
        self
    }

    pub fn with_preferences(mut self, preferences: impl Into<String>) -> Self {
        self.preferences = preferences.into();
        self
    }

    /// Derives a sibling request. The modifier is appended even when the base
    /// preferences are empty, so the oracle always sees it.
    pub fn for_variant(&self, variant: RouteVariant) -> Self {
        let mut derived = self.clone();
        if let Some(modifier) = variant.modifier() {
            derived.preferences = format!("{}, {modifier}", self.preferences);
        }
        derived
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub id: CandidateId,
    pub variant: RouteVariant,
    pub narrative_text: String,
    pub estimated_travel_time: String,
    pub summary: String,
}

impl RouteCandidate {
    pub fn steps(&self) -> Vec<String> {
        split_steps(&self.narrative_text)
    }
}

/// Splits period-delimited directions into steps. Fragments that are empty
/// after trimming are dropped; kept fragments are returned untrimmed.
pub fn split_steps(narrative_text: &str) -> Vec<String> {
    narrative_text
        .split('.')
        .filter(|fragment| !fragment.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Planning,
    RoutesPresented,
    Navigating,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Planning => "planning",
            SessionPhase::RoutesPresented => "routes_presented",
            SessionPhase::Navigating => "navigating",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentKind {
    Accident,
    #[serde(rename = "Speed Trap")]
    SpeedTrap,
    #[serde(rename = "Road Closure")]
    RoadClosure,
}

impl IncidentKind {
    pub fn label(self) -> &'static str {
        match self {
            IncidentKind::Accident => "Accident",
            IncidentKind::SpeedTrap => "Speed Trap",
            IncidentKind::RoadClosure => "Road Closure",
        }
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown incident type '{0}'")]
pub struct ParseIncidentKindError(pub String);

impl FromStr for IncidentKind {
    type Err = ParseIncidentKindError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "accident" => Ok(IncidentKind::Accident),
            "speedtrap" => Ok(IncidentKind::SpeedTrap),
            "roadclosure" => Ok(IncidentKind::RoadClosure),
            _ => Err(ParseIncidentKindError(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub kind: IncidentKind,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub reported_at: DateTime<Utc>,
}
