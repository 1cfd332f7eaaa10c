use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{CandidateId, RouteCandidate, RouteVariant},
    protocol::{OptimizeRouteRequest, OptimizeRouteResponse},
};
use voice_integration::{Utterance, VoiceSynthesizer};

use crate::oracle::RouteOracle;

pub(crate) const SAMPLE_NARRATIVE: &str = "Head north. Turn left. Arrive at destination.";

pub(crate) fn variant_of(request: &OptimizeRouteRequest) -> RouteVariant {
    if request.user_preferences.ends_with("prefer scenic route") {
        RouteVariant::Scenic
    } else if request.user_preferences.ends_with("use highways only") {
        RouteVariant::HighwaysOnly
    } else {
        RouteVariant::Base
    }
}

pub(crate) struct MockRouteOracle {
    pub(crate) requests: Arc<Mutex<Vec<OptimizeRouteRequest>>>,
    pub(crate) narrative: String,
    pub(crate) fail_on: Option<RouteVariant>,
    pub(crate) delays: HashMap<RouteVariant, Duration>,
}

impl MockRouteOracle {
    pub(crate) fn ok() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            narrative: SAMPLE_NARRATIVE.to_string(),
            fail_on: None,
            delays: HashMap::new(),
        }
    }

    pub(crate) fn failing_on(variant: RouteVariant) -> Self {
        let mut oracle = Self::ok();
        oracle.fail_on = Some(variant);
        oracle
    }

    pub(crate) fn with_narrative(mut self, narrative: &str) -> Self {
        self.narrative = narrative.to_string();
        self
    }

    pub(crate) fn with_delay(mut self, variant: RouteVariant, delay: Duration) -> Self {
        self.delays.insert(variant, delay);
        self
    }
}

#[async_trait]
impl RouteOracle for MockRouteOracle {
    async fn optimize_route(&self, request: OptimizeRouteRequest) -> Result<OptimizeRouteResponse> {
        let variant = variant_of(&request);
        self.requests.lock().expect("requests").push(request);

        if let Some(delay) = self.delays.get(&variant) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_on == Some(variant) {
            return Err(anyhow!("oracle refused {variant} request"));
        }

        Ok(OptimizeRouteResponse {
            optimized_route: self.narrative.clone(),
            estimated_travel_time: format!("{variant} eta"),
            route_summary: format!("{variant} summary"),
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingSynthesizer {
    pub(crate) spoken: Mutex<Vec<Utterance>>,
    pub(crate) cancels: AtomicUsize,
    pub(crate) fail: bool,
}

impl RecordingSynthesizer {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .expect("spoken")
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub(crate) fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl VoiceSynthesizer for RecordingSynthesizer {
    fn speak(&self, utterance: Utterance) -> Result<()> {
        self.spoken.lock().expect("spoken").push(utterance);
        if self.fail {
            return Err(anyhow!("synthesis engine crashed"));
        }
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn candidate(id: i64, narrative: &str) -> RouteCandidate {
    RouteCandidate {
        id: CandidateId(id),
        variant: RouteVariant::ALL[(id as usize) % RouteVariant::ALL.len()],
        narrative_text: narrative.to_string(),
        estimated_travel_time: format!("{} min", 10 + id),
        summary: format!("route {id}"),
    }
}

/// Lets spawned tasks run to their next suspension point.
pub(crate) async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
