//! Run-level result accumulation.
//!
//! Results are threaded explicitly through a run and turned into the process
//! exit status at the very end.

use serde::Serialize;
use std::ops::{Add, AddAssign};

/// Sum of per-item failures for batch validate/publish runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorTally(pub u32);

impl ErrorTally {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn count(&self) -> u32 {
        self.0
    }

    pub fn is_clean(&self) -> bool {
        self.0 == 0
    }

    /// The failure count as a process exit status.
    ///
    /// Saturates at 255 so a multiple of 256 failures cannot exit 0.
    pub fn exit_code(&self) -> i32 {
        self.0.min(255) as i32
    }
}

impl Add<u32> for ErrorTally {
    type Output = ErrorTally;

    fn add(self, rhs: u32) -> ErrorTally {
        ErrorTally(self.0.saturating_add(rhs))
    }
}

impl AddAssign<u32> for ErrorTally {
    fn add_assign(&mut self, rhs: u32) {
        self.0 = self.0.saturating_add(rhs);
    }
}

/// Sticky pass/fail flag for test runs. Once failed, stays failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunVerdict {
    failed: bool,
    failures: u32,
}

impl RunVerdict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self) {
        self.failed = true;
        self.failures = self.failures.saturating_add(1);
    }

    /// Record an outcome; `false` marks the run failed.
    pub fn record(&mut self, passed: bool) {
        if !passed {
            self.fail();
        }
    }

    pub fn merge(&mut self, other: RunVerdict) {
        self.failed |= other.failed;
        self.failures = self.failures.saturating_add(other.failures);
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn exit_code(&self) -> i32 {
        i32::from(self.failed)
    }
}

/// Kind of a user-facing report line; decides the marker and the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Plain,
    Ok,
    Info,
    Pass,
    Error,
    Fail,
}

impl LineKind {
    fn marker(&self) -> Option<&'static str> {
        match self {
            LineKind::Plain => None,
            LineKind::Ok => Some("[OK]"),
            LineKind::Info => Some("[INFO]"),
            LineKind::Pass => Some("[PASS]"),
            LineKind::Error => Some("[ERROR]"),
            LineKind::Fail => Some("[FAIL]"),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, LineKind::Error | LineKind::Fail)
    }
}

/// One line of the run report, e.g. `[OK] path - {...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub kind: LineKind,
    pub text: String,
}

impl ReportLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for ReportLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind.marker() {
            Some(marker) => write!(f, "{} {}", marker, self.text),
            None => f.write_str(&self.text),
        }
    }
}

/// Destination for report lines, in the order items are processed.
pub trait Reporter {
    fn report(&mut self, line: ReportLine);

    fn line(&mut self, kind: LineKind, text: impl Into<String>)
    where
        Self: Sized,
    {
        self.report(ReportLine::new(kind, text));
    }
}

/// Prints successes to stdout and failures to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&mut self, line: ReportLine) {
        if line.kind.is_failure() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    pub lines: Vec<ReportLine>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_kind(&self, kind: LineKind) -> Vec<&ReportLine> {
        self.lines.iter().filter(|l| l.kind == kind).collect()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.lines.iter().map(ToString::to_string).collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&mut self, line: ReportLine) {
        self.lines.push(line);
    }
}
