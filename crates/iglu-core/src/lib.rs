//! Iglu Core Library
//!
//! Schema identity, directory layout resolution, schema cross-checks and
//! run bookkeeping shared by the validate, publish and test commands.

pub mod checks;
pub mod error;
pub mod identifier;
pub mod layout;
pub mod obs;
pub mod report;
pub mod telemetry;

pub use checks::{check_document, check_schema, CheckFailure};
pub use error::{LayoutError, Result};
pub use identifier::{type_of_vendor, SchemaIdentifier, SchemaType};
pub use layout::{resolve_layout, version_segment, SUITE_SUFFIX};
pub use obs::{emit_case_resolved, emit_run_finished, emit_schema_processed, RunSpan};
pub use report::{
    ConsoleReporter, ErrorTally, LineKind, MemoryReporter, ReportLine, Reporter, RunVerdict,
};
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
