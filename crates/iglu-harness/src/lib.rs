//! Behavioural test harness for iglu schemas.
//!
//! Test cases track one event through a [`Tracker`] pointed at a local
//! collector and declare, through [`Assert`], whether delivery should
//! succeed. [`Harness`] runs cases strictly one at a time and resolves each
//! exactly once: pass, mismatch, or timed out.

pub mod case;
pub mod checks;
pub mod collector;
pub mod error;
pub mod harness;
pub mod sdk;
pub mod suite;
pub mod tracker;

pub use case::{drive_case, Assert, CaseOutcome, CaseSignal, CaseState, CaseVerdict};
pub use checks::run_schema_checks;
pub use collector::{
    parse_collector_url, CollectorClient, CollectorSink, DEFAULT_COLLECTOR, DELIVERY_TIMEOUT,
    POST_PATH,
};
pub use error::{EmitError, HarnessError};
pub use harness::{
    CaseReport, DeliveryFailure, Harness, HarnessConfig, SuiteReport, DEFAULT_RESPONSE_TIMEOUT,
};
pub use sdk::{EventKind, Sdk, SelfDescribingJson, StructuredBuilder, TrackedEvent};
pub use suite::{
    load_declarative_suites, load_suite_file, CaseSpec, Expectation, SuiteRegistry, TestCase,
    TestFn, TestSuite, TrackSpec,
};
pub use tracker::{
    DeliveryResponse, EventSink, Payload, ResponseHandler, Tracker, TrackerIdentity,
};
