//! Sequential case runner.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use iglu_core::{emit_case_resolved, LineKind, Reporter, RunVerdict};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, error, info};

use crate::case::{drive_case, Assert, CaseOutcome, CaseSignal, CaseVerdict};
use crate::error::EmitError;
use crate::sdk::Sdk;
use crate::suite::{TestCase, TestSuite};
use crate::tracker::{DeliveryResponse, EventSink, ResponseHandler, Tracker};

/// How long a case waits for its second signal after the first arrives.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Harness settings.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub response_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// Verdict for one named case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseReport {
    pub name: String,
    pub verdict: CaseVerdict,
}

/// Verdicts for one suite, in case order.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteReport {
    pub suite: String,
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.verdict.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }
}

/// A delivery that never got a response, tagged with its case.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryFailure {
    pub case: String,
    pub error: String,
}

/// Runs test cases one at a time against a sink.
///
/// A transport error still resolves its case as "not delivered", but it is
/// also recorded here and fails the whole run once reported.
pub struct Harness {
    config: HarnessConfig,
    sink: Arc<dyn EventSink>,
    sdk: Sdk,
    delivery_failures: Arc<Mutex<Vec<DeliveryFailure>>>,
}

impl Harness {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_config(sink, HarnessConfig::default())
    }

    pub fn with_config(sink: Arc<dyn EventSink>, config: HarnessConfig) -> Self {
        Harness {
            config,
            sink,
            sdk: Sdk::new(),
            delivery_failures: Arc::default(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one case to its single resolution.
    ///
    /// Each case gets its own channel, tracker and handler, so a straggling
    /// response from an earlier case has nowhere to land.
    pub async fn run_case(&self, case: &TestCase) -> CaseVerdict {
        let (tx, rx) = unbounded_channel();

        let response_tx = tx.clone();
        let failures = Arc::clone(&self.delivery_failures);
        let case_name = case.name.clone();
        let handler: ResponseHandler =
            Arc::new(move |result: Result<DeliveryResponse, EmitError>| {
                let delivered = match result {
                    Ok(response) => {
                        debug!(status_code = response.status_code, "delivery response");
                        response.is_success()
                    }
                    Err(err) => {
                        error!(case = %case_name, error = %err, "event delivery failed");
                        failures
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .push(DeliveryFailure {
                                case: case_name.clone(),
                                error: err.to_string(),
                            });
                        false
                    }
                };
                // The case may already be resolved.
                let _ = response_tx.send(CaseSignal::Response { delivered });
            });

        let tracker = Tracker::new(Arc::clone(&self.sink), handler);
        let assert = Assert::new(tx);
        let mut outcome = CaseOutcome::new();

        let body = catch_unwind(AssertUnwindSafe(|| {
            (case.run)(&tracker, &self.sdk, &assert)
        }));
        drop(tracker);
        drop(assert);

        if let Err(payload) = body {
            if let Some(verdict) = outcome.panicked(panic_message(payload.as_ref())) {
                return verdict;
            }
        }

        drive_case(rx, &mut outcome, self.config.response_timeout).await
    }

    /// Run every case of a suite in order, reporting each verdict.
    pub async fn run_suite<R: Reporter>(
        &self,
        suite: &TestSuite,
        reporter: &mut R,
        verdict: &mut RunVerdict,
    ) -> SuiteReport {
        let suite_path = suite.id.to_iglu_path();
        info!(suite = %suite_path, cases = suite.cases.len(), "running suite");

        let mut cases = Vec::with_capacity(suite.cases.len());
        for case in &suite.cases {
            let case_verdict = self.run_case(case).await;
            let passed = case_verdict.passed();
            if passed {
                reporter.line(LineKind::Pass, format!("\"{}\"", case.name));
            } else {
                reporter.line(
                    LineKind::Fail,
                    format!("\"{}\" - {}", case.name, case_verdict),
                );
            }
            emit_case_resolved(&suite_path, &case.name, case_verdict.label(), passed);
            verdict.record(passed);
            self.report_delivery_failures(reporter, verdict);
            cases.push(CaseReport {
                name: case.name.clone(),
                verdict: case_verdict,
            });
        }

        SuiteReport {
            suite: suite_path,
            cases,
        }
    }

    /// Run suites strictly one after another.
    pub async fn run_suites<R: Reporter>(
        &self,
        suites: &[TestSuite],
        reporter: &mut R,
        verdict: &mut RunVerdict,
    ) -> Vec<SuiteReport> {
        let mut reports = Vec::with_capacity(suites.len());
        for suite in suites {
            reports.push(self.run_suite(suite, reporter, verdict).await);
        }
        self.report_delivery_failures(reporter, verdict);
        reports
    }

    /// Report and clear recorded transport errors; any of them fails the run.
    pub fn report_delivery_failures<R: Reporter>(
        &self,
        reporter: &mut R,
        verdict: &mut RunVerdict,
    ) -> usize {
        let failures = std::mem::take(
            &mut *self
                .delivery_failures
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for failure in &failures {
            reporter.line(
                LineKind::Error,
                format!("\"{}\" - delivery failed: {}", failure.case, failure.error),
            );
            verdict.fail();
        }
        failures.len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
