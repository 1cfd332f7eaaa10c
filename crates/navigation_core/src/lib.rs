//! Route planning and turn-by-turn guidance for a single navigation session.
//!
//! [`NavigationSession`] owns the state machine; the remaining modules are the
//! pieces it drives: the route oracle, the three-way fan-out planner, the
//! step timer, voice narration and the incident log.

pub mod config;
pub mod incidents;
pub mod narration;
pub mod oracle;
pub mod planner;
pub mod session;
pub mod timer;

pub use config::{load_settings, load_settings_from, Settings};
pub use incidents::IncidentLog;
pub use narration::{NarrationGateway, NarrationSetting};
pub use oracle::{HttpRouteOracle, MissingRouteOracle, RouteOracle};
pub use planner::RoutePlanner;
pub use session::{
    EndReason, NavigationSession, SessionEvent, SessionOptions, SessionState, StepView,
};
pub use timer::{StepListener, StepTimer};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
