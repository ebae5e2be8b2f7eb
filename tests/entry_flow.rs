use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use facegate::api::{RecognitionApi, RecognizeResponse};
use facegate::capture::{Camera, CaptureFrame, CaptureSource};
use facegate::config::RecognitionConfig;
use facegate::db::{Database, MARKER_USER_ID, MARKER_USER_NAME};
use facegate::error::FacegateError;
use facegate::models::SessionRecord;
use facegate::navigation::{Navigator, Route};
use facegate::presence::PresenceMonitor;
use facegate::recognition::{Outcome, CONNECTIVITY_MESSAGE};
use facegate::session;
use facegate::welcome::WelcomeFlow;

struct FakeCamera {
    fail_acquire: bool,
    acquired: AtomicUsize,
}

impl FakeCamera {
    fn new(fail_acquire: bool) -> Self {
        Self {
            fail_acquire,
            acquired: AtomicUsize::new(0),
        }
    }
}

impl Camera for FakeCamera {
    fn acquire(&self) -> Result<(), FacegateError> {
        if self.fail_acquire {
            return Err(FacegateError::CameraUnavailable("permission denied".into()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn grab_frame(&self) -> Result<Vec<u8>, FacegateError> {
        Ok(vec![0xff, 0xd8, 0xff])
    }

    fn release(&self) {}
}

/// Backend fake: scripted responses per endpoint, with call recording.
struct ScriptedApi {
    responses: Mutex<VecDeque<Result<RecognizeResponse, FacegateError>>>,
    lookups: Mutex<VecDeque<Result<String, FacegateError>>>,
    started: Mutex<Vec<(String, String)>>,
    ended: Mutex<Vec<String>>,
    end_fails: bool,
    healthy: bool,
    /// When the recognize script runs out: simulate a transport failure
    /// instead of the default "no face" response.
    fallback_transport_error: bool,
    /// When set, recognize blocks until notified (for teardown tests).
    gate: Option<Arc<Notify>>,
    recognize_calls: AtomicUsize,
}

impl ScriptedApi {
    fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            lookups: Mutex::new(VecDeque::new()),
            started: Mutex::new(Vec::new()),
            ended: Mutex::new(Vec::new()),
            end_fails: false,
            healthy: true,
            fallback_transport_error: false,
            gate: None,
            recognize_calls: AtomicUsize::new(0),
        }
    }

    fn script_recognize(&self, result: Result<RecognizeResponse, FacegateError>) {
        self.responses.lock().unwrap().push_back(result);
    }

    fn script_lookup(&self, result: Result<String, FacegateError>) {
        self.lookups.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl RecognitionApi for ScriptedApi {
    async fn recognize(&self, _frame: &CaptureFrame) -> Result<RecognizeResponse, FacegateError> {
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None if self.fallback_transport_error => {
                Err(FacegateError::Transport("connection refused".into()))
            }
            None => Ok(resp(false, None)),
        }
    }

    async fn user_id_by_name(&self, name: &str) -> Result<String, FacegateError> {
        let next = self.lookups.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                let _ = name;
                Ok("u-1".into())
            }
        }
    }

    async fn start_session(&self, user_id: &str, user_name: &str) -> Result<(), FacegateError> {
        self.started
            .lock()
            .unwrap()
            .push((user_id.to_string(), user_name.to_string()));
        Ok(())
    }

    async fn end_session(&self, session_id: &str) -> Result<(), FacegateError> {
        self.ended.lock().unwrap().push(session_id.to_string());
        if self.end_fails {
            return Err(FacegateError::Transport("connection refused".into()));
        }
        Ok(())
    }

    async fn health(&self) -> Result<(), FacegateError> {
        if self.healthy {
            Ok(())
        } else {
            Err(FacegateError::ServerUnavailable("connection refused".into()))
        }
    }
}

struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
        }
    }

    fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

fn resp(found: bool, user: Option<&str>) -> RecognizeResponse {
    RecognizeResponse {
        found,
        user: user.map(str::to_string),
        confidence: 0.8,
    }
}

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("facegate.sqlite3")).unwrap();
    (dir, db)
}

async fn wait_for_route(navigator: &RecordingNavigator, route: Route) {
    tokio::time::timeout(Duration::from_secs(300), async {
        loop {
            if navigator.routes().contains(&route) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("navigation to {route:?} never happened"));
}

#[tokio::test(start_paused = true)]
async fn matched_login_navigates_home_and_persists_session() {
    let (_dir, db) = test_db();
    let api = Arc::new(ScriptedApi::new());
    api.script_recognize(Ok(resp(true, Some("Ana"))));
    let camera = Arc::new(FakeCamera::new(false));
    let navigator = Arc::new(RecordingNavigator::new());
    let mut flow = WelcomeFlow::new(
        camera,
        api.clone(),
        db.clone(),
        navigator.clone(),
        RecognitionConfig::default(),
    );

    flow.enter().await.unwrap();
    wait_for_route(&navigator, Route::Home).await;

    assert_eq!(
        db.get_marker(MARKER_USER_NAME).await.unwrap().as_deref(),
        Some("Ana")
    );
    assert_eq!(
        db.get_marker(MARKER_USER_ID).await.unwrap().as_deref(),
        Some("u-1")
    );

    let record = db.latest_session_record().await.unwrap().unwrap();
    assert_eq!(record.user_id, "u-1");
    assert_eq!(record.user_name, "Ana");

    assert_eq!(
        api.started.lock().unwrap().as_slice(),
        &[("u-1".to_string(), "Ana".to_string())]
    );
    // Matched is terminal: no further frames were submitted.
    assert_eq!(api.recognize_calls.load(Ordering::SeqCst), 1);

    flow.leave().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unregistered_face_redirects_to_registration() {
    let (_dir, db) = test_db();
    let api = Arc::new(ScriptedApi::new());
    api.script_recognize(Ok(resp(true, None)));
    let navigator = Arc::new(RecordingNavigator::new());
    let mut flow = WelcomeFlow::new(
        Arc::new(FakeCamera::new(false)),
        api.clone(),
        db.clone(),
        navigator.clone(),
        RecognitionConfig::default(),
    );

    flow.enter().await.unwrap();
    wait_for_route(&navigator, Route::Register).await;

    assert!(api.started.lock().unwrap().is_empty());
    assert_eq!(db.get_marker(MARKER_USER_NAME).await.unwrap(), None);

    flow.leave().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn transport_failure_on_final_attempt_exhausts_budget() {
    let (_dir, db) = test_db();
    let mut api = ScriptedApi::new();
    // 29 clean "no face" cycles, then the transport fallback kicks in.
    for _ in 0..29 {
        api.script_recognize(Ok(resp(false, None)));
    }
    api.fallback_transport_error = true;
    let api = Arc::new(api);

    let navigator = Arc::new(RecordingNavigator::new());
    let mut flow = WelcomeFlow::new(
        Arc::new(FakeCamera::new(false)),
        api.clone(),
        db,
        navigator.clone(),
        RecognitionConfig::default(),
    );

    let mut snapshots = flow.subscribe();
    flow.enter().await.unwrap();

    let state = snapshots
        .wait_for(|state| state.outcome == Outcome::Exhausted)
        .await
        .unwrap()
        .clone();
    assert_eq!(state.attempts_made, 30);
    assert_eq!(state.message.as_deref(), Some(CONNECTIVITY_MESSAGE));

    // The loop stopped: attempts stay capped and nothing navigates.
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(snapshots.borrow().attempts_made, 30);
    assert_eq!(snapshots.borrow().outcome, Outcome::Exhausted);
    assert!(navigator.routes().is_empty());

    flow.leave().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn teardown_mid_request_mutates_nothing() {
    let (_dir, db) = test_db();
    let mut api = ScriptedApi::new();
    let gate = Arc::new(Notify::new());
    api.gate = Some(gate.clone());
    api.script_recognize(Ok(resp(true, Some("Ana"))));
    let api = Arc::new(api);

    let navigator = Arc::new(RecordingNavigator::new());
    let mut flow = WelcomeFlow::new(
        Arc::new(FakeCamera::new(false)),
        api.clone(),
        db.clone(),
        navigator.clone(),
        RecognitionConfig::default(),
    );

    let mut snapshots = flow.subscribe();
    flow.enter().await.unwrap();
    snapshots.wait_for(|state| state.is_busy).await.unwrap();

    flow.leave().await.unwrap();

    // Resolve the held request after teardown; it must change nothing.
    gate.notify_waiters();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let state = snapshots.borrow().clone();
    assert_eq!(state.attempts_made, 1);
    assert_eq!(state.outcome, Outcome::Pending);
    assert!(navigator.routes().is_empty());
    assert!(api.started.lock().unwrap().is_empty());
    assert_eq!(db.get_marker(MARKER_USER_NAME).await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn failed_profile_lookup_retries_recognition() {
    let (_dir, db) = test_db();
    let api = Arc::new(ScriptedApi::new());
    api.script_recognize(Ok(resp(true, Some("Ana"))));
    api.script_recognize(Ok(resp(true, Some("Ana"))));
    api.script_lookup(Err(FacegateError::ProfileResolution {
        name: "Ana".into(),
        reason: "not in database".into(),
    }));
    api.script_lookup(Ok("u-7".into()));

    let navigator = Arc::new(RecordingNavigator::new());
    let mut flow = WelcomeFlow::new(
        Arc::new(FakeCamera::new(false)),
        api.clone(),
        db.clone(),
        navigator.clone(),
        RecognitionConfig::default(),
    );

    flow.enter().await.unwrap();
    wait_for_route(&navigator, Route::Home).await;

    // The second match (after the cooldown reset) carried the login.
    assert_eq!(api.recognize_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        api.started.lock().unwrap().as_slice(),
        &[("u-7".to_string(), "Ana".to_string())]
    );
    assert_eq!(
        db.get_marker(MARKER_USER_ID).await.unwrap().as_deref(),
        Some("u-7")
    );

    flow.leave().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unhealthy_backend_blocks_standby() {
    let (_dir, db) = test_db();
    let mut api = ScriptedApi::new();
    api.healthy = false;
    let camera = Arc::new(FakeCamera::new(false));
    let navigator = Arc::new(RecordingNavigator::new());
    let mut flow = WelcomeFlow::new(
        camera.clone(),
        Arc::new(api),
        db,
        navigator.clone(),
        RecognitionConfig::default(),
    );

    let err = flow.enter().await.expect_err("standby should be refused");
    assert!(matches!(err, FacegateError::ServerUnavailable(_)));
    assert_eq!(camera.acquired.load(Ordering::SeqCst), 0);
    assert!(navigator.routes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn camera_failure_is_terminal() {
    let (_dir, db) = test_db();
    let navigator = Arc::new(RecordingNavigator::new());
    let mut flow = WelcomeFlow::new(
        Arc::new(FakeCamera::new(true)),
        Arc::new(ScriptedApi::new()),
        db,
        navigator.clone(),
        RecognitionConfig::default(),
    );

    let err = flow.enter().await.expect_err("camera should fail");
    assert!(matches!(err, FacegateError::CameraUnavailable(_)));
    assert!(navigator.routes().is_empty());

    // Teardown of a never-activated surface is a no-op.
    flow.leave().await.unwrap();
}

#[tokio::test]
async fn logout_clears_markers_even_when_server_end_fails() {
    let (_dir, db) = test_db();
    let record = SessionRecord::new("u-1".into(), "Ana".into());
    db.insert_session_record(&record).await.unwrap();
    db.set_marker(MARKER_USER_ID, "u-1").await.unwrap();
    db.set_marker(MARKER_USER_NAME, "Ana").await.unwrap();

    let mut api = ScriptedApi::new();
    api.end_fails = true;
    let navigator = RecordingNavigator::new();

    session::end_session(&db, &api, &navigator).await.unwrap();

    assert_eq!(api.ended.lock().unwrap().as_slice(), &[record.id.clone()]);
    assert_eq!(db.get_marker(MARKER_USER_ID).await.unwrap(), None);
    assert_eq!(db.get_marker(MARKER_USER_NAME).await.unwrap(), None);
    let record = db.latest_session_record().await.unwrap().unwrap();
    assert!(record.ended_at.is_some());
    assert_eq!(navigator.routes(), vec![Route::Entry]);
}

#[tokio::test(start_paused = true)]
async fn absent_user_is_logged_out_by_presence_monitor() {
    let (_dir, db) = test_db();
    db.set_marker(MARKER_USER_NAME, "Ana").await.unwrap();

    // Default recognize response is "no face": the user is never seen.
    let api = Arc::new(ScriptedApi::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let config = RecognitionConfig::default();

    let mut source = CaptureSource::new(Arc::new(FakeCamera::new(false)), config.poll_interval);
    let frames = source.activate().unwrap();

    let mut monitor = PresenceMonitor::new();
    monitor
        .start(frames, api.clone(), db.clone(), navigator.clone(), &config)
        .await
        .unwrap();

    wait_for_route(&navigator, Route::Entry).await;
    assert_eq!(db.get_marker(MARKER_USER_NAME).await.unwrap(), None);

    monitor.stop().await.unwrap();
    source.deactivate();
}

#[tokio::test(start_paused = true)]
async fn paused_presence_monitor_never_logs_out() {
    let (_dir, db) = test_db();
    db.set_marker(MARKER_USER_NAME, "Ana").await.unwrap();

    let api = Arc::new(ScriptedApi::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let config = RecognitionConfig::default();

    let mut source = CaptureSource::new(Arc::new(FakeCamera::new(false)), config.poll_interval);
    let frames = source.activate().unwrap();

    let mut monitor = PresenceMonitor::new();
    monitor
        .start(frames, api.clone(), db.clone(), navigator.clone(), &config)
        .await
        .unwrap();
    monitor.set_paused(true);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(navigator.routes().is_empty());

    // Resuming restarts the absence window instead of firing instantly.
    monitor.set_paused(false);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(navigator.routes().is_empty());

    wait_for_route(&navigator, Route::Entry).await;

    monitor.stop().await.unwrap();
    source.deactivate();
}
