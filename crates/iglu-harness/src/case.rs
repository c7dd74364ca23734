//! Per-case resolution state machine.
//!
//! A case waits for two independent signals: the response handler reporting
//! whether delivery succeeded, and the test calling `assert.ok()` or
//! `assert.fail()`. Either may arrive first. The deadline is armed by the
//! first signal, not at case start. [`CaseOutcome`] resolves exactly once;
//! anything observed after resolution is ignored.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Signals feeding a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSignal {
    /// The tracked event was (or was not) delivered with a 200.
    Response { delivered: bool },
    /// The test declared the outcome it expects.
    Assertion { expect_success: bool },
}

/// How a case resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseVerdict {
    Pass,
    /// Both signals arrived but disagree.
    Mismatch {
        expect_success: bool,
        delivered: bool,
    },
    /// The deadline passed before both signals arrived.
    TimedOut { after: Duration },
    /// Every signal source went away before both signals arrived.
    Incomplete {
        assertion_made: bool,
        response_received: bool,
    },
    /// The test body panicked.
    Panicked { message: String },
}

impl CaseVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, CaseVerdict::Pass)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaseVerdict::Pass => "pass",
            CaseVerdict::Mismatch { .. } => "mismatch",
            CaseVerdict::TimedOut { .. } => "timeout",
            CaseVerdict::Incomplete { .. } => "incomplete",
            CaseVerdict::Panicked { .. } => "panicked",
        }
    }
}

impl fmt::Display for CaseVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseVerdict::Pass => f.write_str("Passed."),
            CaseVerdict::Mismatch { .. } => f.write_str("Assertion failed."),
            CaseVerdict::TimedOut { after } => {
                write!(f, "Timed out after {}ms.", after.as_millis())
            }
            CaseVerdict::Incomplete {
                assertion_made: false,
                ..
            } => f.write_str("No assertion was made."),
            CaseVerdict::Incomplete { .. } => f.write_str("No event was tracked."),
            CaseVerdict::Panicked { message } => write!(f, "Test panicked: {message}"),
        }
    }
}

/// Lifecycle of a case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseState {
    /// Nothing observed yet; no deadline.
    Pending,
    /// At least one signal observed; the deadline is running.
    Awaiting,
    Resolved(CaseVerdict),
}

/// Observed signals for one case, with a one-shot resolution gate.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    assertion: Option<bool>,
    response: Option<bool>,
    state: CaseState,
}

impl Default for CaseOutcome {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseOutcome {
    pub fn new() -> Self {
        CaseOutcome {
            assertion: None,
            response: None,
            state: CaseState::Pending,
        }
    }

    pub fn state(&self) -> &CaseState {
        &self.state
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, CaseState::Resolved(_))
    }

    /// Record a signal. Returns the verdict when this signal completes the pair.
    ///
    /// A repeated signal of the same kind keeps the first value.
    pub fn observe(&mut self, signal: CaseSignal) -> Option<CaseVerdict> {
        if self.is_resolved() {
            debug!(?signal, "ignoring signal after resolution");
            return None;
        }

        let slot = match signal {
            CaseSignal::Response { delivered } => (&mut self.response, delivered),
            CaseSignal::Assertion { expect_success } => (&mut self.assertion, expect_success),
        };
        match slot {
            (Some(_), _) => warn!(?signal, "duplicate signal ignored"),
            (empty, value) => *empty = Some(value),
        }
        self.state = CaseState::Awaiting;

        match (self.assertion, self.response) {
            (Some(expect_success), Some(delivered)) => {
                let verdict = if expect_success == delivered {
                    CaseVerdict::Pass
                } else {
                    CaseVerdict::Mismatch {
                        expect_success,
                        delivered,
                    }
                };
                self.resolve(verdict)
            }
            _ => None,
        }
    }

    /// The deadline passed. Returns the verdict unless already resolved.
    pub fn time_out(&mut self, after: Duration) -> Option<CaseVerdict> {
        self.resolve(CaseVerdict::TimedOut { after })
    }

    /// No further signals can arrive.
    pub fn abandon(&mut self) -> Option<CaseVerdict> {
        let verdict = CaseVerdict::Incomplete {
            assertion_made: self.assertion.is_some(),
            response_received: self.response.is_some(),
        };
        self.resolve(verdict)
    }

    /// The test body panicked before returning.
    pub fn panicked(&mut self, message: String) -> Option<CaseVerdict> {
        self.resolve(CaseVerdict::Panicked { message })
    }

    fn resolve(&mut self, verdict: CaseVerdict) -> Option<CaseVerdict> {
        if self.is_resolved() {
            return None;
        }
        self.state = CaseState::Resolved(verdict.clone());
        Some(verdict)
    }
}

/// Handle given to test code for declaring the expected outcome.
#[derive(Debug, Clone)]
pub struct Assert {
    tx: UnboundedSender<CaseSignal>,
}

impl Assert {
    pub fn new(tx: UnboundedSender<CaseSignal>) -> Self {
        Assert { tx }
    }

    /// Expect the tracked event to be delivered.
    pub fn ok(&self) {
        self.declare(true);
    }

    /// Expect the tracked event to be rejected or undeliverable.
    pub fn fail(&self) {
        self.declare(false);
    }

    fn declare(&self, expect_success: bool) {
        // A closed channel means the case already resolved.
        let _ = self.tx.send(CaseSignal::Assertion { expect_success });
    }
}

/// Drive a case to its single resolution.
///
/// Waits with no deadline until the first signal, then at most `timeout`
/// for the pair to complete. Returning drops the receiver and with it the
/// pending deadline, so stragglers have nowhere to land.
pub async fn drive_case(
    mut rx: UnboundedReceiver<CaseSignal>,
    outcome: &mut CaseOutcome,
    timeout: Duration,
) -> CaseVerdict {
    let mut deadline: Option<Instant> = None;

    loop {
        let next = match deadline {
            None => rx.recv().await,
            Some(at) => match tokio::time::timeout_at(at, rx.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    if let Some(verdict) = outcome.time_out(timeout) {
                        return verdict;
                    }
                    break;
                }
            },
        };

        let Some(signal) = next else {
            if let Some(verdict) = outcome.abandon() {
                return verdict;
            }
            break;
        };

        if deadline.is_none() {
            deadline = Some(Instant::now() + timeout);
        }
        if let Some(verdict) = outcome.observe(signal) {
            return verdict;
        }
    }

    match outcome.state() {
        CaseState::Resolved(verdict) => verdict.clone(),
        _ => unreachable!("loop exits only after resolution"),
    }
}
