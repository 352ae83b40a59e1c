//! Per-exhibit state synchronizer
//!
//! One task per exhibit owns both the local navigation cursor and the last
//! reported state. Everything else talks to it through a [`SyncHandle`], so
//! `state/{exhibit}` has exactly one writer.
//!
//! ```text
//! router ──┐                        ┌──► watch: navigation
//! recovery ├──► mpsc ──► Synchronizer├──► watch: reported ──► state/{exhibit}
//! controller┘        ▲               └──► watch: content
//!                    │
//!        fetch task ─┘ (ContentReady, tagged with tour generation)
//! ```
//!
//! Every `load-tour`, `go-idle` and `end-tour` starts a new tour generation
//! and aborts the previous fetch. A fetch result from an older generation is
//! discarded, so an idle command can never be overwritten by a late "ready".

use crate::config::SyncConfig;
use crate::content::{ContentFetcher, ExhibitContent, FetchError};
use crate::error::{ErrorCallback, Result, SyncError};
use crate::recovery::RecoveredState;
use docent_core::state::{SLIDE_ERROR, SLIDE_IDLE, SLIDE_LOADING};
use docent_core::{
    Command, ExhibitKind, ExhibitNavigationState, ExhibitProfile, ReportedState, StatePatch,
    Topic, merge,
};
use docent_transport::{Codec, PubSubClient, PublishOptions};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

/// Why content is being fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPurpose {
    /// A `load-tour` command; success moves to the tour start
    Load,
    /// Boot-time recovery of a beat; success keeps the recovered position
    Recover,
    /// Boot-time recovery of a loading/error state; success finishes the load
    Resume,
}

enum SyncRequest {
    Command(Command),
    Report {
        patch: StatePatch,
        reply: oneshot::Sender<ReportedState>,
    },
    Restore {
        state: RecoveredState,
        reply: oneshot::Sender<bool>,
    },
    Navigate(ExhibitNavigationState),
    ContentReady {
        generation: u64,
        purpose: FetchPurpose,
        result: std::result::Result<ExhibitContent, FetchError>,
    },
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Builder for a synchronizer task
pub struct SynchronizerBuilder {
    exhibit: ExhibitKind,
    config: SyncConfig,
    client: Option<Arc<dyn PubSubClient>>,
    fetcher: Option<Arc<dyn ContentFetcher>>,
    on_error: Option<ErrorCallback>,
}

impl SynchronizerBuilder {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn client(mut self, client: Arc<dyn PubSubClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Receive publish failures
    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    /// Start the synchronizer task
    pub fn spawn(self) -> Result<(SyncHandle, JoinHandle<()>)> {
        let client = self.client.ok_or(SyncError::MissingDependency("pub/sub client"))?;
        let fetcher = self
            .fetcher
            .ok_or(SyncError::MissingDependency("content fetcher"))?;

        let profile = self.exhibit.profile();
        let (requests_tx, requests_rx) = mpsc::channel(self.config.command_buffer_size.max(1));
        let (navigation_tx, navigation_rx) = watch::channel(profile.idle_navigation());
        let (reported_tx, reported_rx) = watch::channel(ReportedState::idle());
        let (content_tx, content_rx) = watch::channel(None);

        let synchronizer = Synchronizer {
            profile,
            state_topic: Topic::State(self.exhibit).to_string(),
            config: self.config,
            codec: Codec::Json,
            client,
            fetcher,
            on_error: self.on_error,
            navigation: navigation_tx,
            reported: reported_tx,
            content: content_tx,
            generation: 0,
            settled: false,
            in_flight: None,
            requests: requests_rx,
            loopback: requests_tx.downgrade(),
        };

        let span = info_span!("synchronizer", exhibit = %self.exhibit);
        let task = tokio::spawn(synchronizer.run().instrument(span));

        let handle = SyncHandle {
            exhibit: self.exhibit,
            requests: requests_tx,
            navigation: navigation_rx,
            reported: reported_rx,
            content: content_rx,
        };

        Ok((handle, task))
    }
}

/// Single owner of one exhibit's navigation and reported state
pub struct Synchronizer {
    profile: &'static ExhibitProfile,
    state_topic: String,
    config: SyncConfig,
    codec: Codec,
    client: Arc<dyn PubSubClient>,
    fetcher: Arc<dyn ContentFetcher>,
    on_error: Option<ErrorCallback>,
    navigation: watch::Sender<ExhibitNavigationState>,
    reported: watch::Sender<ReportedState>,
    content: watch::Sender<Option<Arc<ExhibitContent>>>,
    /// Current tour generation; fetch results from older ones are stale
    generation: u64,
    /// Set once a command or recovery has been applied
    settled: bool,
    in_flight: Option<JoinHandle<()>>,
    requests: mpsc::Receiver<SyncRequest>,
    loopback: mpsc::WeakSender<SyncRequest>,
}

impl Synchronizer {
    /// Create a builder for `exhibit`
    pub fn builder(exhibit: ExhibitKind) -> SynchronizerBuilder {
        SynchronizerBuilder {
            exhibit,
            config: SyncConfig::default(),
            client: None,
            fetcher: None,
            on_error: None,
        }
    }

    async fn run(mut self) {
        debug!("Synchronizer started");

        while let Some(request) = self.requests.recv().await {
            match request {
                SyncRequest::Command(command) => self.handle_command(command).await,
                SyncRequest::Report { patch, reply } => {
                    let merged = self.report_state(&patch).await;
                    let _ = reply.send(merged);
                }
                SyncRequest::Restore { state, reply } => {
                    let applied = self.restore(state);
                    let _ = reply.send(applied);
                }
                SyncRequest::Navigate(state) => {
                    self.navigation.send_replace(state);
                }
                SyncRequest::ContentReady {
                    generation,
                    purpose,
                    result,
                } => self.content_ready(generation, purpose, result).await,
                SyncRequest::Flush(reply) => {
                    let _ = reply.send(());
                }
                SyncRequest::Shutdown => break,
            }
        }

        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        debug!("Synchronizer stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::LoadTour { tour_id } => self.handle_load_tour(tour_id).await,
            Command::GoIdle { reason } => self.handle_go_idle(reason).await,
            Command::EndTour => self.handle_go_idle(Some("end-tour".to_string())).await,
            Command::GotoBeat { beat_id } => self.handle_goto_beat(&beat_id).await,
        }
    }

    async fn handle_load_tour(&mut self, tour_id: String) {
        info!(tour_id = %tour_id, "Loading tour");
        self.settled = true;
        self.next_generation();

        let patch = StatePatch::new()
            .slide(SLIDE_LOADING)
            .tour_id(Some(tour_id.clone()))
            .volume(self.config.default_volume_level, false);
        self.report_state(&patch).await;

        self.spawn_fetch(Some(tour_id), FetchPurpose::Load);
    }

    async fn handle_go_idle(&mut self, reason: Option<String>) {
        info!(reason = reason.as_deref().unwrap_or("none"), "Going idle");
        self.settled = true;
        self.next_generation();

        self.navigation.send_replace(self.profile.idle_navigation());
        self.content.send_replace(None);

        let patch = StatePatch::new().slide(SLIDE_IDLE).tour_id(None);
        self.report_state(&patch).await;
    }

    async fn handle_goto_beat(&mut self, raw: &str) {
        match self.profile.decode_beat(raw) {
            Ok(state) => {
                debug!(beat_id = raw, "Going to beat");
                self.settled = true;
                self.navigation.send_replace(state);
                // Echo the commanded string rather than re-encoding it
                self.report_state(&StatePatch::new().slide(raw)).await;
            }
            Err(e) => {
                warn!(beat_id = raw, error = %e, "Discarding goto-beat");
            }
        }
    }

    fn restore(&mut self, state: RecoveredState) -> bool {
        if self.settled {
            info!("Discarding recovered state, a command was already applied");
            return false;
        }
        self.settled = true;

        info!(
            slide = %state.reported.slide,
            tour_id = state.reported.tour_id.as_deref().unwrap_or("none"),
            "Restoring retained state"
        );

        // Rebuild the in-memory copy without republishing it
        self.reported.send_replace(state.reported.clone());
        if let Some(navigation) = &state.navigation {
            self.navigation.send_replace(navigation.clone());
        }

        if let Some(tour_id) = state.reported.tour_id {
            let purpose = if state.navigation.is_some() {
                FetchPurpose::Recover
            } else {
                FetchPurpose::Resume
            };
            self.next_generation();
            self.spawn_fetch(Some(tour_id), purpose);
        }

        true
    }

    async fn content_ready(
        &mut self,
        generation: u64,
        purpose: FetchPurpose,
        result: std::result::Result<ExhibitContent, FetchError>,
    ) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Discarding stale content");
            return;
        }
        self.in_flight = None;

        match result {
            Ok(content) => {
                self.content.send_replace(Some(Arc::new(content)));
                if purpose != FetchPurpose::Recover {
                    let start = self.profile.tour_start_navigation();
                    let mut patch = StatePatch::new().slide(self.profile.tour_start_beat());
                    if purpose == FetchPurpose::Resume {
                        // A recovered error state was muted; unmute like a fresh load
                        patch = patch.volume(self.config.default_volume_level, false);
                    }
                    self.navigation.send_replace(start);
                    self.report_state(&patch).await;
                }
                info!(?purpose, "Content ready");
            }
            Err(e) => {
                warn!(?purpose, error = %e, "Content fetch failed");
                self.content.send_replace(None);
                let patch = StatePatch::new().slide(SLIDE_ERROR).volume(0.0, true);
                self.report_state(&patch).await;
            }
        }
    }

    fn next_generation(&mut self) {
        self.generation += 1;
        if let Some(task) = self.in_flight.take() {
            debug!("Aborting in-flight content fetch");
            task.abort();
        }
    }

    fn spawn_fetch(&mut self, tour_id: Option<String>, purpose: FetchPurpose) {
        let tour_id = tour_id.filter(|_| self.profile.tour_scoped_content);
        let exhibit = self.profile.kind;
        let generation = self.generation;
        let fetcher = self.fetcher.clone();
        let loopback = self.loopback.clone();

        let task = tokio::spawn(async move {
            let result = fetcher.fetch(exhibit, tour_id.as_deref()).await;
            if let Some(requests) = loopback.upgrade() {
                let _ = requests
                    .send(SyncRequest::ContentReady {
                        generation,
                        purpose,
                        result,
                    })
                    .await;
            }
        });
        self.in_flight = Some(task);
    }

    /// Merge `patch` over the last reported state and publish the result
    async fn report_state(&mut self, patch: &StatePatch) -> ReportedState {
        let merged = merge(&self.reported.borrow(), patch);
        self.reported.send_replace(merged.clone());
        self.publish(&merged).await;
        merged
    }

    async fn publish(&self, state: &ReportedState) {
        if !self.client.is_connected() {
            debug!(topic = %self.state_topic, "No broker connection, state not published");
            return;
        }

        let payload = match self.codec.encode(&state.to_wire(self.profile)) {
            Ok(payload) => payload,
            Err(e) => {
                self.fail(SyncError::Codec(e));
                return;
            }
        };

        if let Err(source) = self
            .client
            .publish(&self.state_topic, payload, PublishOptions::retained())
            .await
        {
            self.fail(SyncError::Publish {
                topic: self.state_topic.clone(),
                source,
            });
        }
    }

    fn fail(&self, error: SyncError) {
        warn!(error = %error, "State report failed");
        if let Some(callback) = &self.on_error {
            callback(&error);
        }
    }
}

/// Cloneable handle to a running synchronizer
#[derive(Clone)]
pub struct SyncHandle {
    exhibit: ExhibitKind,
    requests: mpsc::Sender<SyncRequest>,
    navigation: watch::Receiver<ExhibitNavigationState>,
    reported: watch::Receiver<ReportedState>,
    content: watch::Receiver<Option<Arc<ExhibitContent>>>,
}

impl SyncHandle {
    pub fn exhibit(&self) -> ExhibitKind {
        self.exhibit
    }

    async fn request(&self, request: SyncRequest) -> Result<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| SyncError::Stopped)
    }

    /// Route a parsed command to its handler
    pub async fn dispatch(&self, command: Command) -> Result<()> {
        self.request(SyncRequest::Command(command)).await
    }

    pub async fn handle_load_tour(&self, tour_id: impl Into<String>) -> Result<()> {
        self.dispatch(Command::LoadTour {
            tour_id: tour_id.into(),
        })
        .await
    }

    pub async fn handle_go_idle(&self, reason: Option<String>) -> Result<()> {
        self.dispatch(Command::GoIdle { reason }).await
    }

    pub async fn handle_goto_beat(&self, beat_id: impl Into<String>) -> Result<()> {
        self.dispatch(Command::GotoBeat {
            beat_id: beat_id.into(),
        })
        .await
    }

    /// Merge and publish a partial state; returns the merged state
    pub async fn report_state(&self, patch: StatePatch) -> Result<ReportedState> {
        let (reply, response) = oneshot::channel();
        self.request(SyncRequest::Report { patch, reply }).await?;
        response.await.map_err(|_| SyncError::Stopped)
    }

    /// Apply recovered state unless a command got there first
    pub async fn restore(&self, state: RecoveredState) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.request(SyncRequest::Restore { state, reply }).await?;
        response.await.map_err(|_| SyncError::Stopped)
    }

    /// Move the local cursor without reporting it
    pub async fn set_navigation(&self, state: ExhibitNavigationState) -> Result<()> {
        self.request(SyncRequest::Navigate(state)).await
    }

    /// Wait until every request sent before this one has been handled
    pub async fn flush(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.request(SyncRequest::Flush(reply)).await?;
        response.await.map_err(|_| SyncError::Stopped)
    }

    /// Stop the synchronizer task
    pub async fn shutdown(&self) -> Result<()> {
        self.request(SyncRequest::Shutdown).await
    }

    /// Current local navigation state
    pub fn navigation(&self) -> ExhibitNavigationState {
        self.navigation.borrow().clone()
    }

    /// Last reported state
    pub fn reported(&self) -> ReportedState {
        self.reported.borrow().clone()
    }

    /// Currently loaded content
    pub fn content(&self) -> Option<Arc<ExhibitContent>> {
        self.content.borrow().clone()
    }

    pub fn watch_navigation(&self) -> watch::Receiver<ExhibitNavigationState> {
        self.navigation.clone()
    }

    pub fn watch_reported(&self) -> watch::Receiver<ReportedState> {
        self.reported.clone()
    }

    pub fn watch_content(&self) -> watch::Receiver<Option<Arc<ExhibitContent>>> {
        self.content.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::StaticContent;
    use crate::testing::{GatedFetcher, RejectingClient, retained_state};
    use docent_transport::MemoryBroker;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn tours() -> Arc<StaticContent> {
        Arc::new(
            StaticContent::new()
                .with_tour("t1", json!({"title": "t1"}))
                .with_tour("t2", json!({"title": "t2"}))
                .with_untoured(json!({"title": "welcome"})),
        )
    }

    fn spawn(
        exhibit: ExhibitKind,
        broker: &Arc<MemoryBroker>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> SyncHandle {
        let (handle, _task) = Synchronizer::builder(exhibit)
            .client(broker.clone())
            .fetcher(fetcher)
            .spawn()
            .unwrap();
        handle
    }

    async fn wait_for_slide(handle: &SyncHandle, slide: &str) -> ReportedState {
        let mut reported = handle.watch_reported();
        let state = tokio::time::timeout(
            Duration::from_secs(5),
            reported.wait_for(|state| state.slide == slide),
        )
        .await
        .expect("timed out waiting for slide")
        .unwrap()
        .clone();
        state
    }

    #[tokio::test]
    async fn test_builder_requires_dependencies() {
        let result = Synchronizer::builder(ExhibitKind::Basecamp).spawn();
        assert!(matches!(result, Err(SyncError::MissingDependency(_))));

        let broker: Arc<dyn PubSubClient> = Arc::new(MemoryBroker::default());
        let result = Synchronizer::builder(ExhibitKind::Basecamp)
            .client(broker)
            .spawn();
        assert!(matches!(
            result,
            Err(SyncError::MissingDependency("content fetcher"))
        ));
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let broker = Arc::new(MemoryBroker::default());
        let handle = spawn(ExhibitKind::Basecamp, &broker, tours());

        assert_eq!(handle.navigation(), ExhibitNavigationState::new("ambient", 0));
        assert_eq!(handle.reported(), ReportedState::idle());
        assert!(handle.content().is_none());
    }

    #[tokio::test]
    async fn test_report_state_merges_and_publishes_retained() {
        let broker = Arc::new(MemoryBroker::default());
        let handle = spawn(ExhibitKind::Basecamp, &broker, tours());

        handle
            .report_state(
                StatePatch::new()
                    .slide("welcome-1")
                    .tour_id(Some("t1".to_string()))
                    .volume(1.0, false),
            )
            .await
            .unwrap();
        let merged = handle
            .report_state(StatePatch::new().slide("welcome-2"))
            .await
            .unwrap();

        assert_eq!(merged.slide, "welcome-2");
        assert_eq!(merged.tour_id.as_deref(), Some("t1"));

        assert_eq!(
            retained_state(&broker, "state/basecamp"),
            json!({"slide": "welcome-2", "tour-id": "t1", "volume-level": 1.0, "volume-muted": false})
        );
    }

    #[tokio::test]
    async fn test_empty_report_is_identity() {
        let broker = Arc::new(MemoryBroker::default());
        let handle = spawn(ExhibitKind::Summit, &broker, tours());

        let before = handle
            .report_state(StatePatch::new().slide("journey-2"))
            .await
            .unwrap();
        let after = handle.report_state(StatePatch::new()).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(retained_state(&broker, "state/summit")["beat-id"], "journey-2");
    }

    #[tokio::test]
    async fn test_load_tour_reports_loading_then_ready() {
        let broker = Arc::new(MemoryBroker::default());
        let fetcher = Arc::new(GatedFetcher::new(tours()));
        let handle = spawn(ExhibitKind::Basecamp, &broker, fetcher.clone());

        handle.handle_load_tour("t1").await.unwrap();
        handle.flush().await.unwrap();

        let loading = handle.reported();
        assert_eq!(loading.slide, "loading");
        assert_eq!(loading.tour_id.as_deref(), Some("t1"));
        assert!(!loading.volume_muted);
        assert_eq!(retained_state(&broker, "state/basecamp")["slide"], "loading");

        fetcher.release(1);
        let ready = wait_for_slide(&handle, "welcome-1").await;
        assert_eq!(ready.tour_id.as_deref(), Some("t1"));
        assert_eq!(handle.navigation(), ExhibitNavigationState::new("welcome", 0));
        assert_eq!(handle.content().unwrap().data["title"], "t1");
        assert_eq!(fetcher.calls(), vec![(ExhibitKind::Basecamp, Some("t1".to_string()))]);
    }

    #[tokio::test]
    async fn test_load_tour_failure_reports_error_muted() {
        let broker = Arc::new(MemoryBroker::default());
        let handle = spawn(ExhibitKind::Basecamp, &broker, tours());

        handle.handle_load_tour("missing").await.unwrap();
        let error = wait_for_slide(&handle, "error").await;

        assert!(error.volume_muted);
        assert_eq!(error.volume_level, 0.0);
        assert_eq!(error.tour_id.as_deref(), Some("missing"));
        assert_eq!(retained_state(&broker, "state/basecamp")["volume-muted"], true);
    }

    #[tokio::test]
    async fn test_welcome_wall_fetches_without_tour() {
        let broker = Arc::new(MemoryBroker::default());
        let fetcher = Arc::new(GatedFetcher::new(tours()));
        let handle = spawn(ExhibitKind::WelcomeWall, &broker, fetcher.clone());

        handle.handle_load_tour("t1").await.unwrap();
        fetcher.release(1);
        let ready = wait_for_slide(&handle, "welcome-1").await;

        assert_eq!(ready.tour_id.as_deref(), Some("t1"));
        assert_eq!(fetcher.calls(), vec![(ExhibitKind::WelcomeWall, None)]);
        assert_eq!(retained_state(&broker, "state/welcome-wall")["beat-id"], "welcome-1");
    }

    #[tokio::test]
    async fn test_go_idle_wins_over_in_flight_load() {
        let broker = Arc::new(MemoryBroker::default());
        let fetcher = Arc::new(GatedFetcher::new(tours()));
        let handle = spawn(ExhibitKind::Basecamp, &broker, fetcher.clone());

        handle.handle_load_tour("t1").await.unwrap();
        handle.flush().await.unwrap();
        handle.handle_go_idle(Some("closing".to_string())).await.unwrap();
        handle.flush().await.unwrap();

        // The aborted fetch can no longer report, even if released
        fetcher.release(1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.flush().await.unwrap();

        let reported = handle.reported();
        assert_eq!(reported.slide, "idle");
        assert_eq!(reported.tour_id, None);
        assert_eq!(handle.navigation(), ExhibitNavigationState::new("ambient", 0));
        assert!(handle.content().is_none());
        assert_eq!(retained_state(&broker, "state/basecamp")["tour-id"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_newer_load_supersedes_older() {
        let broker = Arc::new(MemoryBroker::default());
        let fetcher = Arc::new(GatedFetcher::new(tours()));
        let handle = spawn(ExhibitKind::Basecamp, &broker, fetcher.clone());

        handle.handle_load_tour("t1").await.unwrap();
        handle.handle_load_tour("t2").await.unwrap();
        handle.flush().await.unwrap();
        fetcher.release(2);

        let ready = wait_for_slide(&handle, "welcome-1").await;
        assert_eq!(ready.tour_id.as_deref(), Some("t2"));
        assert_eq!(handle.content().unwrap().data["title"], "t2");
    }

    #[tokio::test]
    async fn test_end_tour_goes_idle() {
        let broker = Arc::new(MemoryBroker::default());
        let handle = spawn(ExhibitKind::Summit, &broker, tours());

        handle.handle_load_tour("t1").await.unwrap();
        wait_for_slide(&handle, "journey-1").await;

        handle.dispatch(Command::EndTour).await.unwrap();
        handle.flush().await.unwrap();
        assert!(handle.reported().is_idle());
        assert_eq!(handle.navigation(), ExhibitNavigationState::new("ambient", 0));
    }

    #[tokio::test]
    async fn test_goto_beat_echoes_raw_id() {
        let broker = Arc::new(MemoryBroker::default());
        let handle = spawn(ExhibitKind::Summit, &broker, tours());

        handle.handle_goto_beat("case-study-02").await.unwrap();
        handle.flush().await.unwrap();

        assert_eq!(handle.navigation(), ExhibitNavigationState::new("case-study", 1));
        assert_eq!(handle.reported().slide, "case-study-02");
        assert_eq!(retained_state(&broker, "state/summit")["beat-id"], "case-study-02");
    }

    #[tokio::test]
    async fn test_invalid_goto_beat_is_noop() {
        let broker = Arc::new(MemoryBroker::default());
        let handle = spawn(ExhibitKind::Basecamp, &broker, tours());

        for raw in ["welcome-0", "bogus", "not-a-number", "case-study-1"] {
            handle.handle_goto_beat(raw).await.unwrap();
        }
        handle.flush().await.unwrap();

        assert_eq!(handle.navigation(), ExhibitNavigationState::new("ambient", 0));
        assert_eq!(handle.reported(), ReportedState::idle());
        assert!(broker.retained("state/basecamp").is_none());
    }

    #[tokio::test]
    async fn test_disconnected_publish_is_noop() {
        let broker = Arc::new(MemoryBroker::default());
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let (handle, _task) = Synchronizer::builder(ExhibitKind::Basecamp)
            .client(broker.clone())
            .fetcher(tours())
            .on_error(Arc::new(move |e: &SyncError| {
                sink.lock().unwrap().push(e.to_string())
            }))
            .spawn()
            .unwrap();

        broker.set_connected(false);
        let merged = handle
            .report_state(StatePatch::new().slide("welcome-1"))
            .await
            .unwrap();

        assert_eq!(merged.slide, "welcome-1");
        assert_eq!(handle.reported().slide, "welcome-1");
        assert!(broker.retained("state/basecamp").is_none());
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_reaches_callback() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let (handle, _task) = Synchronizer::builder(ExhibitKind::Basecamp)
            .client(Arc::new(RejectingClient))
            .fetcher(tours())
            .on_error(Arc::new(move |e: &SyncError| {
                sink.lock().unwrap().push(e.to_string())
            }))
            .spawn()
            .unwrap();

        let merged = handle
            .report_state(StatePatch::new().slide("welcome-1"))
            .await
            .unwrap();
        assert_eq!(merged.slide, "welcome-1");

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("state/basecamp"));
    }

    #[tokio::test]
    async fn test_restore_rebuilds_without_publishing() {
        let broker = Arc::new(MemoryBroker::default());
        let fetcher = Arc::new(GatedFetcher::new(tours()));
        let handle = spawn(ExhibitKind::Basecamp, &broker, fetcher.clone());

        let recovered = RecoveredState {
            reported: ReportedState {
                slide: "welcome-3".to_string(),
                tour_id: Some("t1".to_string()),
                volume_level: 0.4,
                volume_muted: false,
            },
            navigation: Some(ExhibitNavigationState::new("welcome", 2)),
        };
        assert!(handle.restore(recovered.clone()).await.unwrap());

        assert_eq!(handle.navigation(), ExhibitNavigationState::new("welcome", 2));
        assert_eq!(handle.reported(), recovered.reported);
        assert_eq!(broker.published_count(), 0);

        fetcher.release(1);
        let mut content = handle.watch_content();
        tokio::time::timeout(Duration::from_secs(5), content.wait_for(Option::is_some))
            .await
            .unwrap()
            .unwrap();

        // Recovery keeps the recovered position and does not report "ready"
        handle.flush().await.unwrap();
        assert_eq!(handle.navigation(), ExhibitNavigationState::new("welcome", 2));
        assert_eq!(handle.reported().slide, "welcome-3");
        assert_eq!(fetcher.calls(), vec![(ExhibitKind::Basecamp, Some("t1".to_string()))]);
    }

    #[tokio::test]
    async fn test_restore_after_command_is_discarded() {
        let broker = Arc::new(MemoryBroker::default());
        let handle = spawn(ExhibitKind::Basecamp, &broker, tours());

        handle.handle_goto_beat("problem-1").await.unwrap();
        let recovered = RecoveredState {
            reported: ReportedState::idle(),
            navigation: Some(ExhibitNavigationState::new("welcome", 2)),
        };
        assert!(!handle.restore(recovered).await.unwrap());
        assert_eq!(handle.navigation(), ExhibitNavigationState::new("problem", 0));
    }

    #[tokio::test]
    async fn test_shutdown_stops_handle() {
        let broker = Arc::new(MemoryBroker::default());
        let (handle, task) = Synchronizer::builder(ExhibitKind::Basecamp)
            .client(broker)
            .fetcher(tours())
            .spawn()
            .unwrap();

        handle.shutdown().await.unwrap();
        task.await.unwrap();
        assert!(matches!(
            handle.handle_go_idle(None).await,
            Err(SyncError::Stopped)
        ));
    }
}
