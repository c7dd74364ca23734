//! Sequential validate/publish folds.
//!
//! Schemas are processed one at a time so report lines come out in schema
//! order; a failing schema is counted and the batch moves on.

use iglu_core::{emit_schema_processed, ErrorTally, LineKind, Reporter, SchemaIdentifier};
use serde_json::Value;
use tracing::debug;

use crate::client::{AccessToken, RegistryClient};
use crate::reply::ItemFailure;
use crate::request::{DeployTarget, PublishRequest, ValidationRequest};

/// What happened to one schema in a publish run.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// The promotion request was accepted.
    Published { patch: bool, body: Value },
    /// Already deployed to PROD; nothing was sent.
    AlreadyInProd,
    Failed(ItemFailure),
}

impl PublishOutcome {
    pub fn errors(&self) -> u32 {
        u32::from(matches!(self, PublishOutcome::Failed(_)))
    }
}

/// What happened to one schema in a validate run.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidateOutcome {
    Valid { body: Value },
    Failed(ItemFailure),
}

impl ValidateOutcome {
    pub fn errors(&self) -> u32 {
        u32::from(matches!(self, ValidateOutcome::Failed(_)))
    }
}

fn report_failure<R: Reporter>(reporter: &mut R, id: &SchemaIdentifier, failure: &ItemFailure) {
    match failure {
        ItemFailure::Transport { .. } => reporter.line(LineKind::Error, failure.to_string()),
        _ => reporter.line(
            LineKind::Error,
            format!("{} - {}", id.path.display(), failure),
        ),
    }
}

/// Promote one schema to `target`.
///
/// An existing PROD deployment is left untouched. Otherwise the request is a
/// patch exactly when the schema identity is already deployed to the target.
pub async fn publish_schema<R: Reporter>(
    client: &RegistryClient,
    token: &AccessToken,
    org_id: &str,
    id: &SchemaIdentifier,
    target: DeployTarget,
    reporter: &mut R,
) -> PublishOutcome {
    let request = PublishRequest::new(id, target);
    let body = serde_json::to_string(&request).unwrap_or_default();
    reporter.line(LineKind::Plain, format!("Publishing - {body}"));

    let exists = match client.schema_exists(token, org_id, id, target).await {
        Ok(exists) => exists,
        Err(e) => {
            let failure = ItemFailure::Request {
                reason: e.to_string(),
            };
            report_failure(reporter, id, &failure);
            return PublishOutcome::Failed(failure);
        }
    };

    if exists && target == DeployTarget::Prod {
        let self_json = serde_json::to_string(id).unwrap_or_default();
        reporter.line(
            LineKind::Info,
            format!("Schema already exists in PROD - no update to be performed for {self_json}"),
        );
        return PublishOutcome::AlreadyInProd;
    }

    let patch = exists;
    let reply = match client.publish(token, org_id, patch, &request).await {
        Ok(reply) => reply,
        Err(e) => {
            let failure = ItemFailure::Request {
                reason: e.to_string(),
            };
            report_failure(reporter, id, &failure);
            return PublishOutcome::Failed(failure);
        }
    };

    match reply.evaluate() {
        Ok(body) => {
            reporter.line(LineKind::Ok, format!("{} - {}", id.path.display(), body));
            PublishOutcome::Published { patch, body }
        }
        Err(failure) => {
            report_failure(reporter, id, &failure);
            PublishOutcome::Failed(failure)
        }
    }
}

/// Publish every schema in order, summing per-item failures.
pub async fn publish_all<R: Reporter>(
    client: &RegistryClient,
    token: &AccessToken,
    org_id: &str,
    schemas: &[SchemaIdentifier],
    target: DeployTarget,
    reporter: &mut R,
) -> ErrorTally {
    let mut tally = ErrorTally::new();
    for id in schemas {
        let outcome = publish_schema(client, token, org_id, id, target, reporter).await;
        emit_schema_processed(&id.to_iglu_path(), "publish", outcome.errors());
        tally += outcome.errors();
    }
    debug!(errors = tally.count(), "publish finished");
    tally
}

/// Submit one schema document for validation.
pub async fn validate_schema<R: Reporter>(
    client: &RegistryClient,
    token: &AccessToken,
    org_id: &str,
    id: &SchemaIdentifier,
    reporter: &mut R,
) -> ValidateOutcome {
    let request = match ValidationRequest::from_schema(id) {
        Ok(r) => r,
        Err(e) => {
            let failure = ItemFailure::Request {
                reason: e.to_string(),
            };
            report_failure(reporter, id, &failure);
            return ValidateOutcome::Failed(failure);
        }
    };
    debug!(schema = %id, "posting validation request");

    let reply = match client.validate(token, org_id, &request).await {
        Ok(reply) => reply,
        Err(e) => {
            let failure = ItemFailure::Request {
                reason: e.to_string(),
            };
            report_failure(reporter, id, &failure);
            return ValidateOutcome::Failed(failure);
        }
    };

    match reply.evaluate() {
        Ok(body) => {
            reporter.line(LineKind::Ok, format!("{} - {}", id.path.display(), body));
            ValidateOutcome::Valid { body }
        }
        Err(failure) => {
            report_failure(reporter, id, &failure);
            ValidateOutcome::Failed(failure)
        }
    }
}

/// Validate every schema in order, summing per-item failures.
pub async fn validate_all<R: Reporter>(
    client: &RegistryClient,
    token: &AccessToken,
    org_id: &str,
    schemas: &[SchemaIdentifier],
    reporter: &mut R,
) -> ErrorTally {
    let mut tally = ErrorTally::new();
    for id in schemas {
        let outcome = validate_schema(client, token, org_id, id, reporter).await;
        emit_schema_processed(&id.to_iglu_path(), "validate", outcome.errors());
        tally += outcome.errors();
    }
    debug!(errors = tally.count(), "validation finished");
    tally
}
