use super::*;
use std::{
    collections::VecDeque,
    sync::Mutex as StdMutex,
    time::Duration,
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use shared::protocol::{CallAnalysis, CallPhase, TranscriptionPhase};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
enum SurfaceEvent {
    Status(StatusUpdate),
    Revealed,
    Elapsed(String),
    Navigated(String),
}

#[derive(Default)]
struct RecordingSurface {
    events: StdMutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().expect("events").clone()
    }

    fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Status(update) => Some(update.message),
                _ => None,
            })
            .collect()
    }

    fn last_message(&self) -> Option<String> {
        self.messages().pop()
    }

    fn count(&self, predicate: impl Fn(&SurfaceEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    fn push(&self, event: SurfaceEvent) {
        self.events.lock().expect("events").push(event);
    }
}

impl StatusSurface for RecordingSurface {
    fn show_status(&self, update: &StatusUpdate) {
        self.push(SurfaceEvent::Status(update.clone()));
    }

    fn reveal_call_status(&self) {
        self.push(SurfaceEvent::Revealed);
    }

    fn update_elapsed(&self, elapsed: &str) {
        self.push(SurfaceEvent::Elapsed(elapsed.to_string()));
    }

    fn navigate(&self, location: &str) {
        self.push(SurfaceEvent::Navigated(location.to_string()));
    }
}

struct ScriptedCallApi {
    make_call_result: Result<CallSid, CallApiError>,
    statuses: StdMutex<VecDeque<Result<CallStatusResponse, CallApiError>>>,
    fallback: Result<CallStatusResponse, CallApiError>,
    make_call_numbers: StdMutex<Vec<String>>,
    status_calls: StdMutex<u32>,
}

impl ScriptedCallApi {
    fn accepting(call_sid: &str) -> Self {
        Self {
            make_call_result: Ok(CallSid(call_sid.to_string())),
            statuses: StdMutex::new(VecDeque::new()),
            fallback: Ok(CallStatusResponse::new(CallPhase::Ringing)),
            make_call_numbers: StdMutex::new(Vec::new()),
            status_calls: StdMutex::new(0),
        }
    }

    fn rejecting(err: CallApiError) -> Self {
        let mut api = Self::accepting("unused");
        api.make_call_result = Err(err);
        api
    }

    fn then(self, status: Result<CallStatusResponse, CallApiError>) -> Self {
        self.statuses.lock().expect("statuses").push_back(status);
        self
    }

    fn otherwise(mut self, status: Result<CallStatusResponse, CallApiError>) -> Self {
        self.fallback = status;
        self
    }

    fn status_calls(&self) -> u32 {
        *self.status_calls.lock().expect("calls")
    }

    fn dialed(&self) -> Vec<String> {
        self.make_call_numbers.lock().expect("numbers").clone()
    }
}

#[async_trait]
impl CallApi for ScriptedCallApi {
    async fn make_call(&self, to_number: &PhoneNumber) -> Result<CallSid, CallApiError> {
        self.make_call_numbers
            .lock()
            .expect("numbers")
            .push(to_number.to_string());
        self.make_call_result.clone()
    }

    async fn call_status(&self, _call_sid: &CallSid) -> Result<CallStatusResponse, CallApiError> {
        *self.status_calls.lock().expect("calls") += 1;
        self.statuses
            .lock()
            .expect("statuses")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

fn status(phase: CallPhase) -> Result<CallStatusResponse, CallApiError> {
    Ok(CallStatusResponse::new(phase))
}

fn with_dtmf(phase: CallPhase, digit: &str) -> Result<CallStatusResponse, CallApiError> {
    let mut body = CallStatusResponse::new(phase);
    body.dtmf = Some(digit.to_string());
    Ok(body)
}

fn with_analysis(transcript: &str, flowchart: &str) -> Result<CallStatusResponse, CallApiError> {
    let mut body = CallStatusResponse::new(CallPhase::Completed);
    body.analysis = Some(CallAnalysis {
        transcript: Some(transcript.to_string()),
        flowchart: Some(flowchart.to_string()),
    });
    Ok(body)
}

fn controller(
    api: &Arc<ScriptedCallApi>,
    surface: &Arc<RecordingSurface>,
    policy: PollPolicy,
) -> CallController {
    let api: Arc<dyn CallApi> = api.clone();
    let surface: Arc<dyn StatusSurface> = surface.clone();
    CallController::new(api, surface, policy)
}

#[tokio::test]
async fn empty_input_is_rejected_without_request() {
    let api = Arc::new(ScriptedCallApi::accepting("CA1"));
    let surface = Arc::new(RecordingSurface::default());

    let err = controller(&api, &surface, PollPolicy::default())
        .initiate_call("   ")
        .await
        .err()
        .expect("must fail");

    assert!(matches!(err, CallFlowError::Validation(_)));
    assert_eq!(surface.messages(), ["Please enter a phone number"]);
    assert!(api.dialed().is_empty());
}

#[tokio::test]
async fn nine_digit_number_is_rejected_without_request() {
    let api = Arc::new(ScriptedCallApi::accepting("CA1"));
    let surface = Arc::new(RecordingSurface::default());

    let err = controller(&api, &surface, PollPolicy::default())
        .initiate_call("555-123-456")
        .await
        .err()
        .expect("must fail");

    assert_eq!(err.user_message(), "Please enter a valid US phone number");
    assert_eq!(surface.messages(), ["Please enter a valid US phone number"]);
    assert!(api.dialed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn initiation_failure_shows_server_error_and_does_not_poll() {
    let api = Arc::new(ScriptedCallApi::rejecting(CallApiError::Http {
        status: 400,
        message: Some("Number is blocked".into()),
    }));
    let surface = Arc::new(RecordingSurface::default());

    let result = controller(&api, &surface, PollPolicy::default())
        .initiate_call("1-555-123-4567")
        .await;
    assert!(matches!(result, Err(CallFlowError::Initiation(_))));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(api.dialed(), ["+15551234567"]);
    assert_eq!(
        surface.messages(),
        ["Initiating call...", "Error: Number is blocked"]
    );
    assert_eq!(surface.count(|e| *e == SurfaceEvent::Revealed), 0);
    assert_eq!(surface.count(|e| matches!(e, SurfaceEvent::Elapsed(_))), 0);
    assert_eq!(api.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_on_initiation_uses_transport_message() {
    let api = Arc::new(ScriptedCallApi::rejecting(CallApiError::Transport(
        "connection refused".into(),
    )));
    let surface = Arc::new(RecordingSurface::default());

    let _ = controller(&api, &surface, PollPolicy::default())
        .initiate_call("5551234567")
        .await;

    assert_eq!(
        surface.last_message().as_deref(),
        Some("Error: connection refused")
    );
}

#[tokio::test(start_paused = true)]
async fn completed_without_analysis_keeps_polling_until_analysis() {
    let api = Arc::new(
        ScriptedCallApi::accepting("CA7")
            .then(status(CallPhase::Initiated))
            .then(status(CallPhase::Completed))
            .then(with_analysis("hello", "fc1")),
    );
    let surface = Arc::new(RecordingSurface::default());

    let call = controller(&api, &surface, PollPolicy::default())
        .initiate_call("(555) 123-4567")
        .await
        .expect("call starts");
    assert_eq!(call.call_sid().as_str(), "CA7");

    let report = call.wait().await.expect("report");
    assert_eq!(
        report.outcome,
        PollOutcome::AnalysisComplete {
            location: "/insights?transcript=hello&flowchart=fc1".into()
        }
    );
    assert_eq!(report.attempts, 3);
    assert_eq!(api.status_calls(), 3);
    assert_eq!(
        report
            .analysis
            .as_ref()
            .and_then(|analysis| analysis.flowchart.as_deref()),
        Some("fc1")
    );

    let messages = surface.messages();
    assert_eq!(
        messages,
        [
            "Initiating call...",
            "Call initiated successfully. Waiting for connection...",
            "Call initiated. Waiting for connection...",
            "Call completed. Processing analysis...",
            "Call completed. Processing analysis...",
            "Analysis complete!",
        ]
    );

    let events = surface.events();
    assert_eq!(
        events.last(),
        Some(&SurfaceEvent::Navigated(
            "/insights?transcript=hello&flowchart=fc1".into()
        ))
    );
    assert!(events.contains(&SurfaceEvent::Status(
        StatusUpdate::message("Analysis complete!").with_transcript("hello")
    )));
}

#[tokio::test(start_paused = true)]
async fn analysis_completion_stops_the_elapsed_display() {
    let api = Arc::new(
        ScriptedCallApi::accepting("CA8")
            .then(status(CallPhase::Ringing))
            .then(status(CallPhase::InProgress))
            .then(status(CallPhase::InProgress))
            .then(with_analysis("done", "graph TD")),
    );
    let surface = Arc::new(RecordingSurface::default());

    let call = controller(&api, &surface, PollPolicy::default())
        .initiate_call("5551234567")
        .await
        .expect("call starts");
    call.wait().await.expect("report");

    let ticks_at_completion = surface.count(|e| matches!(e, SurfaceEvent::Elapsed(_)));
    assert!(ticks_at_completion >= 2, "timer never ticked");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        surface.count(|e| matches!(e, SurfaceEvent::Elapsed(_))),
        ticks_at_completion
    );
    assert_eq!(surface.count(|e| *e == SurfaceEvent::Revealed), 1);
}

#[tokio::test(start_paused = true)]
async fn times_out_after_sixty_cycles() {
    let api = Arc::new(ScriptedCallApi::accepting("CA9"));
    let surface = Arc::new(RecordingSurface::default());

    let call = controller(&api, &surface, PollPolicy::default())
        .initiate_call("5551234567")
        .await
        .expect("call starts");
    let report = call.wait().await.expect("report");

    assert_eq!(report.outcome, PollOutcome::TimedOut);
    assert_eq!(report.attempts, 60);
    assert_eq!(api.status_calls(), 60);
    assert_eq!(
        surface.last_message().as_deref(),
        Some("Call timed out. Please try again.")
    );

    let ticks = surface.count(|e| matches!(e, SurfaceEvent::Elapsed(_)));
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.status_calls(), 60);
    assert_eq!(surface.count(|e| matches!(e, SurfaceEvent::Elapsed(_))), ticks);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_back_off_and_count_toward_timeout() {
    let api = Arc::new(
        ScriptedCallApi::accepting("CA10")
            .otherwise(Err(CallApiError::Transport("connection reset".into()))),
    );
    let surface = Arc::new(RecordingSurface::default());
    let policy = PollPolicy {
        max_attempts: 3,
        ..PollPolicy::default()
    };

    let started = tokio::time::Instant::now();
    let call = controller(&api, &surface, policy)
        .initiate_call("5551234567")
        .await
        .expect("call starts");
    let report = call.wait().await.expect("report");

    assert_eq!(report.outcome, PollOutcome::TimedOut);
    assert_eq!(api.status_calls(), 3);
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16),
        "unexpected elapsed time {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn http_errors_keep_normal_cadence() {
    let api = Arc::new(ScriptedCallApi::accepting("CA11").otherwise(Err(
        CallApiError::Http {
            status: 502,
            message: Some("bad gateway".into()),
        },
    )));
    let surface = Arc::new(RecordingSurface::default());
    let policy = PollPolicy {
        max_attempts: 3,
        ..PollPolicy::default()
    };

    let started = tokio::time::Instant::now();
    let call = controller(&api, &surface, policy)
        .initiate_call("5551234567")
        .await
        .expect("call starts");
    let report = call.wait().await.expect("report");

    assert_eq!(report.outcome, PollOutcome::TimedOut);
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4),
        "unexpected elapsed time {elapsed:?}"
    );
    // failed cycles do not touch the modal
    assert_eq!(
        surface.messages(),
        [
            "Initiating call...",
            "Call initiated successfully. Waiting for connection...",
            "Call timed out. Please try again.",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn dtmf_digits_accumulate_in_order() {
    let api = Arc::new(
        ScriptedCallApi::accepting("CA12")
            .then(with_dtmf(CallPhase::InProgress, "1"))
            .then(status(CallPhase::InProgress))
            .then(with_dtmf(CallPhase::InProgress, "2"))
            .then(with_analysis("bye", "fc")),
    );
    let surface = Arc::new(RecordingSurface::default());

    let call = controller(&api, &surface, PollPolicy::default())
        .initiate_call("5551234567")
        .await
        .expect("call starts");
    let report = call.wait().await.expect("report");

    assert_eq!(report.session.dtmf_sequence(), ["1", "2"]);
    assert!(surface.events().contains(&SurfaceEvent::Status(
        StatusUpdate::message("Call connected. Recording in progress...")
            .with_dtmf(&["1".to_string(), "2".to_string()])
    )));
}

#[tokio::test(start_paused = true)]
async fn transcript_and_transcribing_updates_reach_the_modal() {
    let mut transcribing = CallStatusResponse::new(CallPhase::InProgress);
    transcribing.transcription_status = Some(TranscriptionPhase::InProgress);
    let mut partial = CallStatusResponse::new(CallPhase::InProgress);
    partial.transcript = Some("hello".into());

    let api = Arc::new(
        ScriptedCallApi::accepting("CA13")
            .then(Ok(transcribing))
            .then(Ok(partial))
            .then(with_analysis("hello world", "fc")),
    );
    let surface = Arc::new(RecordingSurface::default());

    let call = controller(&api, &surface, PollPolicy::default())
        .initiate_call("5551234567")
        .await
        .expect("call starts");
    let report = call.wait().await.expect("report");

    assert_eq!(report.session.transcript(), Some("hello"));
    let events = surface.events();
    assert!(events.contains(&SurfaceEvent::Status(StatusUpdate::message(
        "Call connected. Recording in progress... (Transcribing...)"
    ))));
    assert!(events.contains(&SurfaceEvent::Status(
        StatusUpdate::message("Call connected. Recording in progress...")
            .with_transcript("hello")
    )));
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_polling_and_timer() {
    let api = Arc::new(ScriptedCallApi::accepting("CA14"));
    let surface = Arc::new(RecordingSurface::default());

    let call = controller(&api, &surface, PollPolicy::default())
        .initiate_call("5551234567")
        .await
        .expect("call starts");

    tokio::time::sleep(Duration::from_millis(4_500)).await;
    call.cancel();
    let report = call.wait().await.expect("report");
    assert_eq!(report.outcome, PollOutcome::Cancelled);

    let calls = api.status_calls();
    let ticks = surface.count(|e| matches!(e, SurfaceEvent::Elapsed(_)));
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.status_calls(), calls);
    assert_eq!(surface.count(|e| matches!(e, SurfaceEvent::Elapsed(_))), ticks);
    assert_ne!(
        surface.last_message().as_deref(),
        Some("Call timed out. Please try again.")
    );
}

#[derive(Clone, Default)]
struct BackendState {
    dialed: Arc<Mutex<Vec<String>>>,
    polled: Arc<Mutex<Vec<String>>>,
}

#[derive(serde::Deserialize)]
struct StatusParams {
    call_sid: String,
}

async fn handle_make_call(
    State(state): State<BackendState>,
    Form(payload): Form<MakeCallRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    state.dialed.lock().await.push(payload.to_number.clone());
    if payload.to_number == "+15550000000" {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Number is blocked" })),
        );
    }
    (StatusCode::OK, Json(serde_json::json!({ "call_sid": "CA-http" })))
}

async fn handle_call_status(
    State(state): State<BackendState>,
    Query(params): Query<StatusParams>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut polled = state.polled.lock().await;
    polled.push(params.call_sid);
    let body = match polled.len() {
        1 => serde_json::json!({ "status": "ringing" }),
        2 => serde_json::json!({ "status": "in-progress", "dtmf": "7" }),
        3 => return (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({}))),
        _ => serde_json::json!({
            "status": "completed",
            "analysis": { "transcript": "hello there", "flowchart": "A-->B" }
        }),
    };
    (StatusCode::OK, Json(body))
}

async fn spawn_call_backend() -> anyhow::Result<(String, BackendState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = BackendState::default();
    let app = Router::new()
        .route("/make-call", post(handle_make_call))
        .route("/call-status", get(handle_call_status))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn fast_policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        error_backoff: Duration::from_millis(20),
        max_attempts: 20,
    }
}

#[tokio::test]
async fn http_flow_posts_form_and_polls_until_insights() {
    let (server_url, state) = spawn_call_backend().await.expect("spawn backend");
    let surface = Arc::new(RecordingSurface::default());
    let api: Arc<dyn CallApi> = Arc::new(HttpCallApi::new(format!("{server_url}/")));
    let surface_dyn: Arc<dyn StatusSurface> = surface.clone();
    let controller = CallController::new(api, surface_dyn, fast_policy());

    let call = controller
        .initiate_call("1 (555) 123-4567")
        .await
        .expect("call starts");
    let report = call.wait().await.expect("report");

    assert_eq!(
        report.outcome,
        PollOutcome::AnalysisComplete {
            location: "/insights?transcript=hello+there&flowchart=A--%3EB".into()
        }
    );
    assert_eq!(report.session.dtmf_sequence(), ["7"]);
    assert_eq!(*state.dialed.lock().await, ["+15551234567"]);
    let polled = state.polled.lock().await.clone();
    assert_eq!(polled.len(), 4);
    assert!(polled.iter().all(|sid| sid == "CA-http"));
}

#[tokio::test]
async fn http_initiation_error_surfaces_server_message() {
    let (server_url, _state) = spawn_call_backend().await.expect("spawn backend");
    let api = HttpCallApi::new(server_url);

    let err = api
        .make_call(&PhoneNumber::parse("555-000-0000").expect("valid"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, CallApiError::Http { status: 400, .. }));
    assert_eq!(err.initiation_message(), "Error: Number is blocked");
}

#[tokio::test]
async fn http_status_error_is_not_transient() {
    let (server_url, state) = spawn_call_backend().await.expect("spawn backend");
    let api = HttpCallApi::new(server_url);
    let sid = CallSid("CA-http".into());

    for _ in 0..2 {
        api.call_status(&sid).await.expect("status");
    }
    let err = api.call_status(&sid).await.expect_err("unavailable");
    assert!(matches!(err, CallApiError::Http { status: 503, .. }));
    assert!(!err.is_transient());
    assert_eq!(state.polled.lock().await.len(), 3);
}

#[tokio::test]
async fn unreachable_backend_is_a_transient_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = HttpCallApi::new(format!("http://{addr}"));
    let err = api
        .call_status(&CallSid("CA1".into()))
        .await
        .expect_err("must fail");
    assert!(err.is_transient(), "unexpected error: {err}");
}
