use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use axum::{routing::post, Json, Router};
use navigation_core::{
    EndReason, HttpRouteOracle, NavigationSession, SessionEvent, SessionOptions, SessionState,
};
use shared::{
    domain::{CandidateId, RouteRequest, SessionPhase},
    protocol::{OptimizeRouteRequest, OptimizeRouteResponse},
};
use tokio::{net::TcpListener, sync::broadcast, time::timeout};
use url::Url;
use voice_integration::{Utterance, VoiceSynthesizer};

#[derive(Default)]
struct CapturingSynthesizer {
    lines: Mutex<Vec<String>>,
}

impl CapturingSynthesizer {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("lines").clone()
    }
}

impl VoiceSynthesizer for CapturingSynthesizer {
    fn speak(&self, utterance: Utterance) -> Result<()> {
        self.lines.lock().expect("lines").push(utterance.text);
        Ok(())
    }

    fn cancel(&self) {}
}

async fn plan_route(Json(request): Json<OptimizeRouteRequest>) -> Json<OptimizeRouteResponse> {
    let narrative = if request.user_preferences.ends_with("prefer scenic route") {
        "Follow the river path. Cross the old bridge. Arrive at the park."
    } else if request.user_preferences.ends_with("use highways only") {
        "Merge onto the interstate. Take exit 12."
    } else {
        "Head north on Main St. Turn left onto Oak Ave."
    };
    Json(OptimizeRouteResponse {
        optimized_route: narrative.to_string(),
        estimated_travel_time: "15 minutes".to_string(),
        route_summary: request.user_preferences,
    })
}

async fn spawn_oracle() -> Result<Url> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route("/optimize-route", post(plan_route));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Url::parse(&format!("http://{addr}/optimize-route"))?)
}

async fn wait_for_end(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("navigation should finish")
            .expect("event stream open");
        let done = matches!(event, SessionEvent::NavigationEnded { .. });
        seen.push(event);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn plans_over_http_and_guides_to_arrival() {
    let endpoint = spawn_oracle().await.expect("spawn oracle");
    let oracle = HttpRouteOracle::new(endpoint, Duration::from_secs(5)).expect("oracle");
    let synth = Arc::new(CapturingSynthesizer::default());
    let session = NavigationSession::new(
        Arc::new(oracle),
        synth.clone(),
        SessionOptions {
            tick_interval: Duration::from_millis(20),
            ..SessionOptions::default()
        },
    );
    let mut rx = session.subscribe_events();

    session
        .request_routes(
            RouteRequest::new("123 Main St", "789 Oak Ave").with_preferences("Avoid tolls."),
        )
        .await
        .expect("routes");

    let SessionState::RoutesPresented { alternatives, .. } = session.state() else {
        panic!("expected routes to be presented");
    };
    assert_eq!(alternatives.len(), 2);
    assert_eq!(alternatives[0].summary, "Avoid tolls., prefer scenic route");

    session.select_alternative(CandidateId(1)).expect("pick scenic");
    session.start_navigation().expect("start");

    let events = wait_for_end(&mut rx).await;
    assert_eq!(
        events.last(),
        Some(&SessionEvent::NavigationEnded {
            reason: EndReason::Arrived
        })
    );
    assert_eq!(session.phase(), SessionPhase::Planning);
    assert_eq!(
        synth.lines(),
        vec![
            "Starting navigation. Follow the river path",
            "Cross the old bridge",
            "Arrive at the park",
            "You have arrived at your destination.",
        ]
    );
}

#[tokio::test]
async fn user_can_stop_guidance_midway() {
    let endpoint = spawn_oracle().await.expect("spawn oracle");
    let oracle = HttpRouteOracle::new(endpoint, Duration::from_secs(5)).expect("oracle");
    let synth = Arc::new(CapturingSynthesizer::default());
    let session = NavigationSession::new(
        Arc::new(oracle),
        synth.clone(),
        SessionOptions {
            tick_interval: Duration::from_secs(60),
            ..SessionOptions::default()
        },
    );
    let mut rx = session.subscribe_events();

    session
        .request_routes(RouteRequest::new("123 Main St", "789 Oak Ave"))
        .await
        .expect("routes");
    session.start_navigation().expect("start");
    session.end_navigation().expect("end");

    let events = wait_for_end(&mut rx).await;
    assert_eq!(
        events.last(),
        Some(&SessionEvent::NavigationEnded {
            reason: EndReason::Cancelled
        })
    );
    assert_eq!(synth.lines(), vec!["Starting navigation. Head north on Main St"]);
    assert_eq!(session.phase(), SessionPhase::Planning);
}
