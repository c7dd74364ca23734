//! Case resolution scenarios and an end-to-end run against a fake collector.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::Router;
use iglu_core::{LineKind, MemoryReporter, RunVerdict, SchemaIdentifier};
use iglu_harness::{
    parse_collector_url, run_schema_checks, CaseVerdict, CollectorClient, CollectorSink,
    DeliveryResponse, EmitError, EventSink, Harness, Payload, SuiteRegistry, TestCase,
    TestSuite,
};
use serde_json::{json, Value};

/// What the sink does with the next payload.
#[derive(Debug, Clone, Copy)]
enum Step {
    /// Reply with this status after a delay.
    Reply(Duration, u16),
    /// Fail delivery outright.
    Error,
    /// Never reply.
    Hang,
}

/// Plays one scripted step per delivery, repeating the last one.
struct ScriptedSink {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
}

impl ScriptedSink {
    fn new(steps: &[Step]) -> Arc<Self> {
        Arc::new(ScriptedSink {
            steps: Mutex::new(steps.iter().copied().collect()),
            last: Mutex::new(Step::Hang),
        })
    }

    fn status(code: u16) -> Arc<Self> {
        Self::new(&[Step::Reply(Duration::ZERO, code)])
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(step) = steps.pop_front() {
            *last = step;
        }
        *last
    }
}

#[async_trait]
impl EventSink for ScriptedSink {
    async fn send(&self, _payload: Payload) -> Result<DeliveryResponse, EmitError> {
        match self.next_step() {
            Step::Reply(delay, status_code) => {
                tokio::time::sleep(delay).await;
                Ok(DeliveryResponse { status_code })
            }
            Step::Error => Err(EmitError::Transport("connection refused".into())),
            Step::Hang => std::future::pending().await,
        }
    }
}

fn suite_id() -> SchemaIdentifier {
    SchemaIdentifier::new(
        "com.example.entities",
        "example",
        "jsonschema",
        "1-0-0",
        "/unused",
    )
    .unwrap()
}

fn page_view_case(name: &str, expect_success: bool) -> TestCase {
    TestCase::new(name, move |tracker, sdk, assert| {
        tracker.track(sdk.page_view("http://www.example.com", Some("http://www.referer.com")));
        if expect_success {
            assert.ok();
        } else {
            assert.fail();
        }
    })
}

#[tokio::test(start_paused = true)]
async fn delivered_event_with_ok_assertion_passes() {
    let harness = Harness::new(ScriptedSink::status(200));
    let verdict = harness.run_case(&page_view_case("happy", true)).await;
    assert_eq!(verdict, CaseVerdict::Pass);
}

#[tokio::test(start_paused = true)]
async fn rejected_event_with_fail_assertion_passes() {
    let harness = Harness::new(ScriptedSink::status(500));
    let verdict = harness.run_case(&page_view_case("rejected", false)).await;
    assert_eq!(verdict, CaseVerdict::Pass);
}

#[tokio::test(start_paused = true)]
async fn transport_error_counts_as_not_delivered() {
    let harness = Harness::new(ScriptedSink::new(&[Step::Error]));
    assert_eq!(
        harness.run_case(&page_view_case("fail", false)).await,
        CaseVerdict::Pass
    );
    assert_eq!(
        harness.run_case(&page_view_case("ok", true)).await,
        CaseVerdict::Mismatch {
            expect_success: true,
            delivered: false
        }
    );
}

#[tokio::test(start_paused = true)]
async fn transport_error_fails_the_run_even_when_the_case_passes() {
    let harness = Harness::new(ScriptedSink::new(&[Step::Error]));
    let mut suite = TestSuite::new(suite_id());
    suite.add(page_view_case("expects failure", false)).unwrap();

    let mut reporter = MemoryReporter::new();
    let mut verdict = RunVerdict::new();
    let report = harness
        .run_suites(std::slice::from_ref(&suite), &mut reporter, &mut verdict)
        .await;

    assert_eq!(report[0].cases[0].verdict, CaseVerdict::Pass);
    assert_eq!(
        reporter.rendered(),
        vec![
            "[PASS] \"expects failure\"".to_string(),
            "[ERROR] \"expects failure\" - delivery failed: collector transport error: connection refused"
                .to_string(),
        ]
    );
    assert!(verdict.is_failed());
    assert_eq!(verdict.exit_code(), 1);
    assert_eq!(harness.report_delivery_failures(&mut reporter, &mut verdict), 0);
}

#[tokio::test(start_paused = true)]
async fn non_200_success_codes_are_not_delivery() {
    let harness = Harness::new(ScriptedSink::status(204));
    let verdict = harness.run_case(&page_view_case("204", true)).await;
    assert!(matches!(verdict, CaseVerdict::Mismatch { .. }));
}

#[tokio::test(start_paused = true)]
async fn silent_collector_times_out_after_three_seconds() {
    let harness = Harness::new(ScriptedSink::new(&[Step::Hang]));
    let started = tokio::time::Instant::now();
    let verdict = harness.run_case(&page_view_case("silent", true)).await;

    assert_eq!(
        verdict,
        CaseVerdict::TimedOut {
            after: Duration::from_millis(3000)
        }
    );
    assert_eq!(verdict.to_string(), "Timed out after 3000ms.");
    assert!(started.elapsed() >= Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn response_before_assertion_resolves_the_same() {
    let harness = Harness::new(ScriptedSink::status(200));
    let case = TestCase::new("late assert", |tracker, sdk, assert| {
        tracker.track(sdk.page_view("http://www.example.com", None));
        let assert = assert.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            assert.ok();
        });
    });
    assert_eq!(harness.run_case(&case).await, CaseVerdict::Pass);
}

#[tokio::test(start_paused = true)]
async fn straggler_response_does_not_leak_into_next_case() {
    // First case times out at 3s; its 200 lands at 5s while the second case
    // is still waiting for its own 500 at 5.5s.
    let sink = ScriptedSink::new(&[
        Step::Reply(Duration::from_millis(5000), 200),
        Step::Reply(Duration::from_millis(2500), 500),
    ]);
    let harness = Harness::new(sink);

    let first = harness.run_case(&page_view_case("slow", true)).await;
    assert!(matches!(first, CaseVerdict::TimedOut { .. }));

    let second = harness.run_case(&page_view_case("rejected", false)).await;
    assert_eq!(second, CaseVerdict::Pass);
}

#[tokio::test(start_paused = true)]
async fn missing_assertion_resolves_without_waiting_forever() {
    let harness = Harness::new(ScriptedSink::status(200));
    let case = TestCase::new("no assert", |tracker, sdk, _assert| {
        tracker.track(sdk.page_view("http://www.example.com", None));
    });
    let verdict = harness.run_case(&case).await;
    assert_eq!(
        verdict,
        CaseVerdict::Incomplete {
            assertion_made: false,
            response_received: true
        }
    );
    assert_eq!(verdict.to_string(), "No assertion was made.");
}

#[tokio::test(start_paused = true)]
async fn missing_event_resolves_as_incomplete() {
    let harness = Harness::new(ScriptedSink::status(200));
    let case = TestCase::new("no event", |_tracker, _sdk, assert| assert.ok());
    let verdict = harness.run_case(&case).await;
    assert_eq!(verdict.to_string(), "No event was tracked.");
}

#[tokio::test(start_paused = true)]
async fn panicking_case_fails_and_run_continues() {
    let mut suite = TestSuite::new(suite_id());
    suite
        .add(TestCase::new("boom", |_, _, _| panic!("kaboom")))
        .unwrap();
    suite.add(page_view_case("after", true)).unwrap();

    let harness = Harness::new(ScriptedSink::status(200));
    let mut reporter = MemoryReporter::new();
    let mut verdict = RunVerdict::new();
    let report = harness.run_suite(&suite, &mut reporter, &mut verdict).await;

    assert_eq!(
        report.cases[0].verdict,
        CaseVerdict::Panicked {
            message: "kaboom".into()
        }
    );
    assert_eq!(report.cases[1].verdict, CaseVerdict::Pass);
    assert!(verdict.is_failed());
}

#[tokio::test(start_paused = true)]
async fn failures_are_sticky_and_reported_in_order() {
    let mut suite = TestSuite::new(suite_id());
    suite.add(page_view_case("first passes", true)).unwrap();
    suite.add(page_view_case("second mismatches", false)).unwrap();
    suite.add(page_view_case("third passes", true)).unwrap();

    let harness = Harness::new(ScriptedSink::status(200));
    let mut reporter = MemoryReporter::new();
    let mut verdict = RunVerdict::new();
    let reports = harness
        .run_suites(&[suite], &mut reporter, &mut verdict)
        .await;

    assert_eq!(
        reporter.rendered(),
        vec![
            "[PASS] \"first passes\"".to_string(),
            "[FAIL] \"second mismatches\" - Assertion failed.".to_string(),
            "[PASS] \"third passes\"".to_string(),
        ]
    );
    assert_eq!(reports[0].passed(), 2);
    assert_eq!(reports[0].failed(), 1);
    assert!(verdict.is_failed());
    assert_eq!(verdict.exit_code(), 1);
}

// In-process collector.

#[derive(Default)]
struct FakeCollector {
    known: Vec<String>,
    posted: Mutex<Vec<Value>>,
}

async fn collect(
    State(collector): State<Arc<FakeCollector>>,
    method: Method,
    uri: Uri,
    body: String,
) -> StatusCode {
    let path = uri.path();
    if method == Method::POST && path == "/com.snowplowanalytics.snowplow/tp2" {
        let Ok(value) = serde_json::from_str::<Value>(&body) else {
            return StatusCode::BAD_REQUEST;
        };
        collector.posted.lock().unwrap().push(value);
        return StatusCode::OK;
    }
    if method == Method::GET {
        if let Some(iglu_path) = path.strip_prefix("/micro/iglu/") {
            return if collector.known.iter().any(|k| k == iglu_path) {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            };
        }
    }
    StatusCode::NOT_FOUND
}

async fn serve(collector: Arc<FakeCollector>) -> String {
    let app = Router::new().fallback(collect).with_state(collector);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn write_schema(root: &Path, name: &str, self_name: &str, required: &[&str]) -> SchemaIdentifier {
    let path = root
        .join("com.example.entities")
        .join(name)
        .join("jsonschema")
        .join("1-0-0");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let doc = json!({
        "self": {
            "vendor": "com.example.entities",
            "name": self_name,
            "format": "jsonschema",
            "version": "1-0-0"
        },
        "type": "object",
        "properties": {"id": {"type": "integer"}},
        "required": required
    });
    std::fs::write(&path, doc.to_string()).unwrap();
    SchemaIdentifier::new("com.example.entities", name, "jsonschema", "1-0-0", path).unwrap()
}

#[tokio::test]
async fn declarative_suite_runs_against_collector() {
    let collector = Arc::new(FakeCollector::default());
    let url = parse_collector_url(&serve(Arc::clone(&collector)).await).unwrap();

    let tests = tempfile::tempdir().unwrap();
    let dir = tests.path().join("com.example.entities/example/jsonschema");
    std::fs::create_dir_all(&dir).unwrap();
    let cases = json!([{
        "name": "It should send a page view on happy path",
        "track": {"type": "page_view", "url": "http://www.example.com", "referrer": "http://www.referer.com"},
        "expect": "ok"
    }]);
    std::fs::write(dir.join("1-0-0.json"), cases.to_string()).unwrap();

    let mut registry = SuiteRegistry::new();
    registry.load_dir(tests.path()).unwrap();

    let harness = Harness::new(Arc::new(CollectorSink::new(url).unwrap()));
    let mut reporter = MemoryReporter::new();
    let mut verdict = RunVerdict::new();
    harness
        .run_suites(registry.suites(), &mut reporter, &mut verdict)
        .await;

    assert_eq!(
        reporter.rendered(),
        vec!["[PASS] \"It should send a page view on happy path\"".to_string()]
    );
    assert!(!verdict.is_failed());

    let posted = collector.posted.lock().unwrap();
    assert_eq!(posted.len(), 1);
    let payload = &posted[0]["data"][0];
    assert_eq!(payload["e"], "pv");
    assert_eq!(payload["url"], "http://www.example.com");
    assert_eq!(payload["refr"], "http://www.referer.com");
    assert_eq!(payload["tna"], "TestTracker");
    assert!(payload["stm"].is_string());
}

#[tokio::test]
async fn unreachable_collector_is_a_failed_delivery() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = parse_collector_url(&format!("http://{addr}")).unwrap();
    let harness = Harness::new(Arc::new(CollectorSink::new(url).unwrap()));
    assert_eq!(
        harness.run_case(&page_view_case("offline", false)).await,
        CaseVerdict::Pass
    );

    let mut reporter = MemoryReporter::new();
    let mut verdict = RunVerdict::new();
    assert_eq!(harness.report_delivery_failures(&mut reporter, &mut verdict), 1);
    assert!(verdict.is_failed());
    assert!(reporter.rendered()[0].starts_with("[ERROR] \"offline\" - delivery failed:"));
}

#[tokio::test]
async fn stalled_collector_is_cut_off_by_the_request_timeout() {
    let app = Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        StatusCode::OK
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = parse_collector_url(&format!("http://{addr}")).unwrap();
    let sink = CollectorSink::with_timeout(url, Duration::from_millis(200)).unwrap();
    let result = sink.send(Payload::new()).await;
    assert!(matches!(result, Err(EmitError::Transport(_))), "{result:?}");

    let harness = Harness::new(Arc::new(sink));
    assert_eq!(
        harness.run_case(&page_view_case("stalled", false)).await,
        CaseVerdict::Pass
    );
    let mut reporter = MemoryReporter::new();
    let mut verdict = RunVerdict::new();
    harness.report_delivery_failures(&mut reporter, &mut verdict);
    assert!(verdict.is_failed());
}

#[tokio::test]
async fn schema_checks_report_every_problem() {
    let schemas = tempfile::tempdir().unwrap();
    let good = write_schema(schemas.path(), "example", "example", &["id"]);
    let unknown = write_schema(schemas.path(), "unknown", "unknown", &[]);
    let broken = write_schema(schemas.path(), "broken", "wrong_name", &["missing"]);

    let collector = Arc::new(FakeCollector {
        known: vec![good.to_iglu_path(), broken.to_iglu_path()],
        ..Default::default()
    });
    let url = parse_collector_url(&serve(collector).await).unwrap();
    let client = CollectorClient::new(url).unwrap();

    let mut reporter = MemoryReporter::new();
    let verdict = run_schema_checks(
        &client,
        &[good.clone(), unknown.clone(), broken.clone()],
        &mut reporter,
    )
    .await;

    assert!(verdict.is_failed());
    let errors: Vec<String> = reporter
        .of_kind(LineKind::Error)
        .iter()
        .map(|l| l.text.clone())
        .collect();
    assert_eq!(
        errors[0],
        "com.example.entities/unknown/jsonschema/1-0-0 - does not exist in iglu"
    );
    assert!(errors
        .iter()
        .any(|e| e.starts_with("com.example.entities/broken/jsonschema/1-0-0")
            && e.contains("name")));
    assert!(errors
        .iter()
        .any(|e| e.contains("required property \"missing\" is not defined!")));
    assert!(!errors
        .iter()
        .any(|e| e.starts_with("com.example.entities/example/")));
}

#[test]
fn bundled_sample_tree_is_consistent() {
    let workspace = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let schemas = iglu_core::resolve_layout(&workspace.join("src/main")).unwrap();
    let suites = iglu_harness::load_declarative_suites(&workspace.join("src/test")).unwrap();

    assert_eq!(schemas.len(), 1);
    assert!(iglu_core::check_schema(&schemas[0]).is_empty());
    assert_eq!(suites.len(), 1);
    assert_eq!(suites[0].id.to_iglu_path(), schemas[0].to_iglu_path());
    assert_eq!(
        suites[0].cases[0].name,
        "It should send a page view on happy path"
    );
}
