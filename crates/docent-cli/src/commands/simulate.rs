//! Simulate command
//!
//! Plays the docent's side of a short tour against an in-process broker,
//! then boots a fresh instance of the exhibit to show it resuming from the
//! retained state.

use docent_audio::{GainGraph, VolumeBridge};
use docent_core::{ExhibitKind, ExhibitNavigationState, ReportedState};
use docent_sync::{
    ErrorCallback, ExhibitRuntime, RuntimeConfig, StaticContent, SyncError, SyncHandle,
};
use docent_transport::{CommandPublisher, MemoryBroker, PubSubClient};
use parking_lot::RwLock;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(
    exhibit: Option<ExhibitKind>,
    tour: &str,
    config: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(exhibit) = exhibit {
        config.exhibit = exhibit;
    }
    let exhibit = config.exhibit;
    let profile = exhibit.profile();

    info!("Simulating a tour of {} with tour '{}'", exhibit, tour);

    let broker = Arc::new(MemoryBroker::default());
    let client: Arc<dyn PubSubClient> = broker.clone();
    let content = Arc::new(
        StaticContent::new()
            .with_tour(tour, json!({"tour": tour, "exhibit": exhibit}))
            .with_untoured(json!({"exhibit": exhibit}))
            .with_delay(Duration::from_millis(150)),
    );
    let on_error: ErrorCallback = Arc::new(|e: &SyncError| warn!("State report failed: {}", e));

    let graph = {
        let mut graph = GainGraph::new();
        graph.add_channel("narration");
        graph.add_channel("music");
        Arc::new(RwLock::new(graph))
    };
    let bridge = VolumeBridge::spawn(client.clone(), exhibit, graph.clone()).await?;

    println!("Docent Simulation");
    println!("=================");
    println!();

    // First boot
    let mut runtime = ExhibitRuntime::mount(
        config.clone(),
        client.clone(),
        content.clone(),
        Some(on_error.clone()),
    )
    .await?;
    println!("Boot:       recovery {:?}", runtime.wait_recovered().await);
    let handle = runtime.handle().clone();
    let publisher = CommandPublisher::new(client.clone());

    publisher.load_tour(tour).await?;
    let ready = wait_until(&handle, |s| s.slide != "loading" && s.tour_id.is_some()).await?;
    print_state("load-tour", &ready);

    let beat_id = profile.encode_beat(&ExhibitNavigationState::new(profile.tour_start, 2))?;
    publisher.goto_beat(exhibit, beat_id.clone()).await?;
    let moved = wait_until(&handle, |s| s.slide == beat_id).await?;
    print_state("goto-beat", &moved);

    // Local navigation moves the cursor without reporting it
    let mut controller = runtime.controller();
    controller.register(profile.tour_start, 4)?;
    let local = controller.next().await?;
    println!(
        "Local next: {}-{} (reported slide stays {})",
        local.moment_id,
        local.beat_idx + 1,
        handle.reported().slide
    );
    println!(
        "Audio:      narration gain {:.2}",
        graph.read().effective_gain("narration").unwrap_or(0.0)
    );

    runtime.unmount().await;
    println!();
    println!("Exhibit restarted");
    println!();

    // Second boot resumes from the retained state
    let mut runtime =
        ExhibitRuntime::mount(config, client.clone(), content, Some(on_error)).await?;
    println!("Boot:       recovery {:?}", runtime.wait_recovered().await);
    let handle = runtime.handle().clone();
    let navigation = handle.navigation();
    println!(
        "Resumed:    moment '{}', beat index {}",
        navigation.moment_id, navigation.beat_idx
    );

    let mut content = handle.watch_content();
    tokio::time::timeout(STEP_TIMEOUT, content.wait_for(Option::is_some)).await??;
    println!("Content:    reloaded");

    publisher.go_idle(Some("simulation complete".to_string())).await?;
    let idle = wait_until(&handle, ReportedState::is_idle).await?;
    print_state("go-idle", &idle);
    println!(
        "Audio:      narration gain {:.2}",
        graph.read().effective_gain("narration").unwrap_or(0.0)
    );

    runtime.unmount().await;
    bridge.stop().await;

    println!();
    println!("Messages published: {}", broker.published_count());

    Ok(())
}

async fn wait_until(
    handle: &SyncHandle,
    condition: impl FnMut(&ReportedState) -> bool,
) -> Result<ReportedState, Box<dyn std::error::Error>> {
    let mut reported = handle.watch_reported();
    let state = tokio::time::timeout(STEP_TIMEOUT, reported.wait_for(condition))
        .await??
        .clone();
    Ok(state)
}

fn print_state(step: &str, state: &ReportedState) {
    println!(
        "{:<11} slide={} tour={} volume={:.2}{}",
        format!("{}:", step),
        state.slide,
        state.tour_id.as_deref().unwrap_or("-"),
        state.volume_level,
        if state.volume_muted { " (muted)" } else { "" }
    );
}
