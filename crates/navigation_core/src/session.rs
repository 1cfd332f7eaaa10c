use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use shared::{
    domain::{CandidateId, Incident, IncidentKind, RouteCandidate, RouteRequest, SessionPhase},
    error::NavigationError,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use voice_integration::VoiceSynthesizer;

use crate::{
    config::Settings,
    incidents::IncidentLog,
    narration::{NarrationGateway, NarrationSetting},
    oracle::RouteOracle,
    planner::RoutePlanner,
    timer::{StepListener, StepTimer},
};

pub const START_ANNOUNCEMENT: &str = "Starting navigation.";
pub const ARRIVAL_ANNOUNCEMENT: &str = "You have arrived at your destination.";

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Planning,
    RoutesPresented {
        primary: Arc<RouteCandidate>,
        alternatives: Vec<Arc<RouteCandidate>>,
    },
    Navigating {
        primary: Arc<RouteCandidate>,
        step_cursor: usize,
    },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Planning => SessionPhase::Planning,
            SessionState::RoutesPresented { .. } => SessionPhase::RoutesPresented,
            SessionState::Navigating { .. } => SessionPhase::Navigating,
        }
    }

    pub fn primary(&self) -> Option<&Arc<RouteCandidate>> {
        match self {
            SessionState::Planning => None,
            SessionState::RoutesPresented { primary, .. }
            | SessionState::Navigating { primary, .. } => Some(primary),
        }
    }
}

/// What the navigation controls show while a route is being followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub cursor: usize,
    pub total: usize,
    pub instruction: String,
    pub estimated_travel_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Arrived,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RoutesPresented {
        primary: Arc<RouteCandidate>,
        alternatives: Vec<Arc<RouteCandidate>>,
    },
    PrimaryChanged {
        primary: Arc<RouteCandidate>,
        alternatives: Vec<Arc<RouteCandidate>>,
    },
    NavigationStarted {
        primary: Arc<RouteCandidate>,
        total_steps: usize,
    },
    StepAdvanced {
        cursor: usize,
        instruction: String,
    },
    Arrived,
    NavigationEnded {
        reason: EndReason,
    },
    IncidentReported(Incident),
    NarrationToggled(bool),
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub tick_interval: Duration,
    pub narration_enabled: bool,
    pub narration_language: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SessionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            tick_interval: settings.tick_interval(),
            narration_enabled: settings.narration_enabled,
            narration_language: settings.narration_language.clone(),
        }
    }
}

struct SessionInner {
    state: SessionState,
    /// Bumped on every entry to and exit from Navigating; stale timer
    /// callbacks compare against it and drop themselves.
    generation: u64,
    timer: Option<StepTimer>,
}

pub struct NavigationSession {
    planner: RoutePlanner,
    narrator: NarrationGateway,
    narration: NarrationSetting,
    incidents: IncidentLog,
    tick_interval: Duration,
    inner: Mutex<SessionInner>,
    events: broadcast::Sender<SessionEvent>,
}

impl NavigationSession {
    pub fn new(
        oracle: Arc<dyn RouteOracle>,
        synthesizer: Arc<dyn VoiceSynthesizer>,
        options: SessionOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            planner: RoutePlanner::new(oracle),
            narrator: NarrationGateway::new(synthesizer, options.narration_language),
            narration: NarrationSetting::new(options.narration_enabled),
            incidents: IncidentLog::new(),
            tick_interval: options.tick_interval,
            inner: Mutex::new(SessionInner {
                state: SessionState::Planning,
                generation: 0,
                timer: None,
            }),
            events,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().state.phase()
    }

    pub fn current_step(&self) -> Option<StepView> {
        let guard = self.lock();
        let SessionState::Navigating {
            primary,
            step_cursor,
        } = &guard.state
        else {
            return None;
        };
        let steps = primary.steps();
        let instruction = steps.get(*step_cursor)?.trim().to_string();
        Some(StepView {
            cursor: *step_cursor,
            total: steps.len(),
            instruction,
            estimated_travel_time: primary.estimated_travel_time.clone(),
        })
    }

    /// Fans the request out to the oracle and presents the result. On failure
    /// the session stays in Planning.
    pub async fn request_routes(&self, base: RouteRequest) -> Result<(), NavigationError> {
        self.ensure_phase("request_routes", SessionPhase::Planning)?;

        info!(
            start = %base.start_location,
            end = %base.end_location,
            "session: planning routes"
        );
        let routes = self.planner.plan_routes(&base).await?;
        self.submit_plan(routes)
    }

    pub fn submit_plan(&self, routes: Vec<RouteCandidate>) -> Result<(), NavigationError> {
        let mut guard = self.lock();
        if guard.state.phase() != SessionPhase::Planning {
            return Err(invalid("submit_plan", guard.state.phase()));
        }

        let mut routes = routes.into_iter().map(Arc::new);
        let Some(primary) = routes.next() else {
            warn!("session: plan contained no routes");
            return Err(NavigationError::EmptyPlan);
        };
        let alternatives: Vec<_> = routes.collect();

        info!(
            primary = primary.id.0,
            alternatives = alternatives.len(),
            "session: routes presented"
        );
        guard.state = SessionState::RoutesPresented {
            primary: Arc::clone(&primary),
            alternatives: alternatives.clone(),
        };
        self.emit(SessionEvent::RoutesPresented {
            primary,
            alternatives,
        });
        Ok(())
    }

    /// Swaps an alternative in as primary. The displaced primary moves to the
    /// end of the alternatives.
    pub fn select_alternative(&self, candidate_id: CandidateId) -> Result<(), NavigationError> {
        let mut guard = self.lock();
        let SessionState::RoutesPresented {
            primary,
            alternatives,
        } = &guard.state
        else {
            return Err(invalid("select_alternative", guard.state.phase()));
        };

        let Some(index) = alternatives.iter().position(|c| c.id == candidate_id) else {
            return Err(NavigationError::UnknownCandidate(candidate_id));
        };

        let mut next_alternatives = alternatives.clone();
        let chosen = next_alternatives.remove(index);
        next_alternatives.push(Arc::clone(primary));

        info!(
            primary = chosen.id.0,
            displaced = primary.id.0,
            "session: alternative selected"
        );
        guard.state = SessionState::RoutesPresented {
            primary: Arc::clone(&chosen),
            alternatives: next_alternatives.clone(),
        };
        self.emit(SessionEvent::PrimaryChanged {
            primary: chosen,
            alternatives: next_alternatives,
        });
        Ok(())
    }

    /// Must be called from within a tokio runtime; it spawns the step timer.
    pub fn start_navigation(self: &Arc<Self>) -> Result<(), NavigationError> {
        let mut guard = self.lock();
        let SessionState::RoutesPresented { primary, .. } = &guard.state else {
            return Err(invalid("start_navigation", guard.state.phase()));
        };
        let primary = Arc::clone(primary);
        let steps = primary.steps();

        guard.generation += 1;
        let generation = guard.generation;
        guard.state = SessionState::Navigating {
            primary: Arc::clone(&primary),
            step_cursor: 0,
        };

        let opening = match steps.first() {
            Some(first) => format!("{START_ANNOUNCEMENT} {}", first.trim()),
            None => START_ANNOUNCEMENT.to_string(),
        };
        self.narrator.announce(self.narration.is_enabled(), &opening);

        info!(
            route = primary.id.0,
            steps = steps.len(),
            tick_ms = self.tick_interval.as_millis() as u64,
            "session: navigation started"
        );
        self.emit(SessionEvent::NavigationStarted {
            primary,
            total_steps: steps.len(),
        });

        let listener = SessionStepListener {
            session: Arc::downgrade(self),
            generation,
        };
        guard.timer = Some(StepTimer::start(steps, self.tick_interval, listener));
        Ok(())
    }

    /// Stops guidance and returns to Planning. No timer output is observable
    /// after this returns.
    pub fn end_navigation(&self) -> Result<(), NavigationError> {
        let timer = {
            let mut guard = self.lock();
            if guard.state.phase() != SessionPhase::Navigating {
                return Err(invalid("end_navigation", guard.state.phase()));
            }
            reset_to_planning(&mut guard)
        };

        // The session lock is released first: timer callbacks take the gate
        // before the session lock.
        if let Some(timer) = timer {
            timer.cancel();
        }
        self.narrator.silence();

        info!("session: navigation ended by user");
        self.emit(SessionEvent::NavigationEnded {
            reason: EndReason::Cancelled,
        });
        Ok(())
    }

    pub fn report_incident(
        &self,
        kind: IncidentKind,
        location: impl Into<String>,
        description: Option<String>,
    ) -> Incident {
        let incident = self.incidents.report(kind, location, description);
        self.emit(SessionEvent::IncidentReported(incident.clone()));
        incident
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.incidents.list()
    }

    pub fn narration_enabled(&self) -> bool {
        self.narration.is_enabled()
    }

    pub fn set_narration_enabled(&self, enabled: bool) {
        self.narration.set(enabled);
        self.after_narration_change(enabled);
    }

    pub fn toggle_narration(&self) -> bool {
        let enabled = self.narration.toggle();
        self.after_narration_change(enabled);
        enabled
    }

    fn after_narration_change(&self, enabled: bool) {
        if !enabled {
            self.narrator.silence();
        }
        info!(enabled, "session: voice guidance toggled");
        self.emit(SessionEvent::NarrationToggled(enabled));
    }

    fn ensure_phase(
        &self,
        operation: &'static str,
        expected: SessionPhase,
    ) -> Result<(), NavigationError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(invalid(operation, phase))
        }
    }

    fn advance(&self, generation: u64, cursor: usize, instruction: &str) {
        let mut guard = self.lock();
        if guard.generation != generation {
            return;
        }
        let SessionState::Navigating { primary, .. } = &guard.state else {
            return;
        };
        let primary = Arc::clone(primary);
        guard.state = SessionState::Navigating {
            primary,
            step_cursor: cursor,
        };

        let instruction = instruction.trim();
        self.narrator
            .announce(self.narration.is_enabled(), instruction);
        info!(cursor, instruction, "session: step advanced");
        self.emit(SessionEvent::StepAdvanced {
            cursor,
            instruction: instruction.to_string(),
        });
    }

    fn arrive(&self, generation: u64, cursor: usize) {
        let mut guard = self.lock();
        if guard.generation != generation || guard.state.phase() != SessionPhase::Navigating {
            return;
        }

        self.narrator
            .announce(self.narration.is_enabled(), ARRIVAL_ANNOUNCEMENT);
        // The timer that called us has already stopped itself; dropping the
        // handle is enough.
        drop(reset_to_planning(&mut guard));

        info!(cursor, "session: arrived at destination");
        self.emit(SessionEvent::Arrived);
        self.emit(SessionEvent::NavigationEnded {
            reason: EndReason::Arrived,
        });
    }
}

fn reset_to_planning(inner: &mut SessionInner) -> Option<StepTimer> {
    inner.generation += 1;
    inner.state = SessionState::Planning;
    inner.timer.take()
}

fn invalid(operation: &'static str, phase: SessionPhase) -> NavigationError {
    NavigationError::InvalidTransition { operation, phase }
}

struct SessionStepListener {
    session: Weak<NavigationSession>,
    generation: u64,
}

impl StepListener for SessionStepListener {
    fn on_step(&self, cursor: usize, instruction: &str) {
        if let Some(session) = self.session.upgrade() {
            session.advance(self.generation, cursor, instruction);
        }
    }

    fn on_arrival(&self, cursor: usize) {
        if let Some(session) = self.session.upgrade() {
            session.arrive(self.generation, cursor);
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
