//! Per-schema checks run before any test case.

use futures::future::join_all;
use iglu_core::{check_schema, LineKind, Reporter, RunVerdict, SchemaIdentifier};
use tracing::{debug, warn};

use crate::collector::CollectorClient;

/// Check that the collector resolves every schema and that each schema
/// document agrees with its location.
///
/// Lookups go out together; lines are reported in schema order. Every
/// failure is reported and none stops the others.
pub async fn run_schema_checks<R: Reporter>(
    collector: &CollectorClient,
    schemas: &[SchemaIdentifier],
    reporter: &mut R,
) -> RunVerdict {
    let mut verdict = RunVerdict::new();

    let lookups = join_all(schemas.iter().map(|id| collector.schema_known(id))).await;
    for (id, known) in schemas.iter().zip(lookups) {
        let known = known.unwrap_or_else(|err| {
            warn!(schema = %id, error = %err, "iglu lookup failed");
            false
        });
        if !known {
            reporter.line(
                LineKind::Error,
                format!("{} - does not exist in iglu", id.to_iglu_path()),
            );
            verdict.fail();
        }
    }

    for id in schemas {
        let failures = check_schema(id);
        debug!(schema = %id, failures = failures.len(), "schema cross-checks");
        for failure in failures {
            reporter.line(
                LineKind::Error,
                format!("{} - {}", id.to_iglu_path(), failure),
            );
            verdict.fail();
        }
    }

    verdict
}
