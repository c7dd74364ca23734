//! Success predicate for validation and deployment replies.

use serde_json::Value;
use std::fmt;

/// Statuses accepted as a transport-level success.
pub const ACCEPTED_STATUSES: [u16; 2] = [200, 201];

/// Raw reply from a validation or deployment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryReply {
    pub status: u16,
    pub body: String,
}

/// Why a single schema failed. Counted against the run, never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemFailure {
    /// Status outside [`ACCEPTED_STATUSES`].
    Transport { status: u16, body: String },
    /// Accepted status but the payload reports a problem.
    Semantic { body: Value },
    /// The request could not be built or sent.
    Request { reason: String },
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemFailure::Transport { body, .. } => f.write_str(body),
            ItemFailure::Semantic { body } => write!(f, "{body}"),
            ItemFailure::Request { reason } => f.write_str(reason),
        }
    }
}

impl RegistryReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Accept only `{success: true, errors: null, warnings: null, completed: true}`
    /// on a 200/201. Absent `errors`/`warnings` fields do not count as null.
    pub fn evaluate(&self) -> Result<Value, ItemFailure> {
        if !ACCEPTED_STATUSES.contains(&self.status) {
            return Err(ItemFailure::Transport {
                status: self.status,
                body: self.body.clone(),
            });
        }

        let body: Value = match serde_json::from_str(&self.body) {
            Ok(v) => v,
            Err(_) => {
                return Err(ItemFailure::Semantic {
                    body: Value::String(self.body.clone()),
                })
            }
        };

        let truthy = |key: &str| body.get(key).and_then(Value::as_bool) == Some(true);
        let null = |key: &str| matches!(body.get(key), Some(Value::Null));

        if truthy("success") && null("errors") && null("warnings") && truthy("completed") {
            Ok(body)
        } else {
            Err(ItemFailure::Semantic { body })
        }
    }
}
