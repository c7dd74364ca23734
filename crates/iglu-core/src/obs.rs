//! Structured lifecycle events for schema runs.
//!
//! Events are emitted at `info!` level with a stable `event` field so they can
//! be filtered out of JSON logs.

use tracing::info;

/// RAII guard that enters a command-scoped span for the duration of a run.
///
/// ```ignore
/// let _span = RunSpan::enter("publish");
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(command: &str) -> Self {
        let span = tracing::info_span!("iglu.run", command = %command);
        Self {
            _span: span.entered(),
        }
    }
}

/// One schema went through validate or publish.
pub fn emit_schema_processed(schema: &str, action: &str, errors: u32) {
    info!(
        event = "schema.processed",
        schema = %schema,
        action = %action,
        errors = errors,
    );
}

/// A test case reached its single resolution.
pub fn emit_case_resolved(suite: &str, case: &str, verdict: &str, passed: bool) {
    info!(
        event = "case.resolved",
        suite = %suite,
        case = %case,
        verdict = %verdict,
        passed = passed,
    );
}

/// A whole command finished with the given exit status.
pub fn emit_run_finished(command: &str, items: usize, exit_code: i32) {
    info!(
        event = "run.finished",
        command = %command,
        items = items,
        exit_code = exit_code,
    );
}
