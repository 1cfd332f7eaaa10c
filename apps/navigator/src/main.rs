use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use navigation_core::{
    load_settings, load_settings_from, HttpRouteOracle, NavigationSession, SessionEvent,
    SessionOptions, SessionState,
};
use shared::domain::{CandidateId, RouteCandidate, RouteRequest};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_integration::{CommandSynthesizer, SilentSynthesizer, VoiceSynthesizer};

const SPEECH_DRAIN_LIMIT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(about = "Plan a trip and follow it turn by turn")]
struct Args {
    #[arg(long)]
    start: String,
    #[arg(long)]
    end: String,
    #[arg(long, default_value = "")]
    traffic: String,
    #[arg(long, default_value = "")]
    closures: String,
    #[arg(long, default_value = "")]
    preferences: String,
    /// Candidate id to navigate instead of the primary route.
    #[arg(long)]
    select: Option<i64>,
    #[arg(long)]
    mute: bool,
    #[arg(long)]
    tick_ms: Option<u64>,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };
    if let Some(tick_ms) = args.tick_ms.filter(|ms| *ms > 0) {
        settings.tick_interval_ms = tick_ms;
    }

    let oracle = HttpRouteOracle::from_settings(&settings)?;
    info!(endpoint = %oracle.endpoint(), "navigator: route oracle configured");

    let speech = (!args.mute)
        .then(|| Arc::new(CommandSynthesizer::new(settings.speech_command.clone())));
    let synthesizer: Arc<dyn VoiceSynthesizer> = match &speech {
        Some(speech) => speech.clone(),
        None => Arc::new(SilentSynthesizer),
    };
    let session = NavigationSession::new(
        Arc::new(oracle),
        synthesizer,
        SessionOptions::from(&settings),
    );
    if args.mute {
        session.set_narration_enabled(false);
    }
    let mut events = session.subscribe_events();

    let request = RouteRequest::new(args.start, args.end)
        .with_traffic_conditions(args.traffic)
        .with_road_closures(args.closures)
        .with_preferences(args.preferences);
    session
        .request_routes(request)
        .await
        .context("no route generated")?;

    if let Some(id) = args.select {
        session.select_alternative(CandidateId(id))?;
    }
    if let SessionState::RoutesPresented {
        primary,
        alternatives,
    } = session.state()
    {
        print_route("Primary", &primary);
        for alternative in &alternatives {
            print_route("Alternative", alternative);
        }
    }

    session.start_navigation()?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let done = matches!(event, SessionEvent::NavigationEnded { .. });
                    print_event(&event);
                    if done {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "navigator: missed session events"),
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                info!("navigator: interrupted, ending navigation");
                if let Err(err) = session.end_navigation() {
                    warn!("navigator: {err}");
                    break;
                }
            }
        }
    }

    // Let the arrival line play out before the runtime kills the speech process.
    if let Some(speech) = &speech {
        speech.finish(SPEECH_DRAIN_LIMIT).await;
    }

    Ok(())
}

fn print_route(label: &str, route: &RouteCandidate) {
    println!(
        "{label} route {} ({}): {} [{}]",
        route.id, route.variant, route.summary, route.estimated_travel_time
    );
    for (index, step) in route.steps().iter().enumerate() {
        println!("  {}. {}", index + 1, step.trim());
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::NavigationStarted {
            primary,
            total_steps,
        } => println!("Navigating route {} with {total_steps} steps", primary.id),
        SessionEvent::StepAdvanced {
            cursor,
            instruction,
        } => println!("Step {}: {instruction}", cursor + 1),
        SessionEvent::Arrived => println!("You have arrived at your destination."),
        SessionEvent::NavigationEnded { reason } => println!("Navigation ended: {reason:?}"),
        SessionEvent::IncidentReported(incident) => {
            println!("Incident #{}: {} at {}", incident.id, incident.kind, incident.location)
        }
        SessionEvent::NarrationToggled(enabled) => println!("Voice guidance enabled: {enabled}"),
        SessionEvent::RoutesPresented { .. } | SessionEvent::PrimaryChanged { .. } => {}
    }
}
