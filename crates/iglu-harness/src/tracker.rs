//! Event emitter adapter.
//!
//! A [`Tracker`] serialises events into tracker-protocol payloads and hands
//! each one to an [`EventSink`] on its own task. Buffering and retries are
//! off: every `track` call makes exactly one delivery attempt and fires the
//! response handler exactly once.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::EmitError;
use crate::sdk::{EventKind, SelfDescribingJson, TrackedEvent};

pub const UNSTRUCT_EVENT_SCHEMA: &str =
    "iglu:com.snowplowanalytics.snowplow/unstruct_event/jsonschema/1-0-0";
pub const CONTEXTS_SCHEMA: &str = "iglu:com.snowplowanalytics.snowplow/contexts/jsonschema/1-0-0";

/// Tracker version reported in the `tv` field.
pub const TRACKER_VERSION: &str = concat!("rs-iglu-harness-", env!("CARGO_PKG_VERSION"));

/// One serialised event, field name to value.
pub type Payload = BTreeMap<String, String>;

/// HTTP-like result of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status_code: u16,
}

impl DeliveryResponse {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Callback fired once per tracked event.
pub type ResponseHandler = Arc<dyn Fn(Result<DeliveryResponse, EmitError>) + Send + Sync>;

/// Where tracked payloads are delivered.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, payload: Payload) -> Result<DeliveryResponse, EmitError>;
}

/// Tracker identity fields.
#[derive(Debug, Clone)]
pub struct TrackerIdentity {
    pub namespace: String,
    pub app_id: String,
    pub platform: String,
}

impl Default for TrackerIdentity {
    fn default() -> Self {
        TrackerIdentity {
            namespace: "TestTracker".to_string(),
            app_id: "myApp".to_string(),
            platform: "srv".to_string(),
        }
    }
}

/// Tracking client bound to one sink and one response handler.
///
/// Built fresh for every test case so the handler closure is case-scoped.
pub struct Tracker {
    sink: Arc<dyn EventSink>,
    handler: ResponseHandler,
    identity: TrackerIdentity,
}

impl Tracker {
    pub fn new(sink: Arc<dyn EventSink>, handler: ResponseHandler) -> Self {
        Self::with_identity(sink, handler, TrackerIdentity::default())
    }

    pub fn with_identity(
        sink: Arc<dyn EventSink>,
        handler: ResponseHandler,
        identity: TrackerIdentity,
    ) -> Self {
        Tracker {
            sink,
            handler,
            identity,
        }
    }

    /// Send the event in the background and report the outcome to the handler.
    ///
    /// Must be called from within a tokio runtime.
    pub fn track(&self, event: TrackedEvent) {
        let payload = self.payload(&event);
        let sink = Arc::clone(&self.sink);
        let handler = Arc::clone(&self.handler);
        debug!(event_id = %payload.get("eid").map(String::as_str).unwrap_or(""), "tracking event");
        tokio::spawn(async move {
            let result = sink.send(payload).await;
            handler(result);
        });
    }

    /// Serialise an event into a tracker-protocol payload.
    pub fn payload(&self, event: &TrackedEvent) -> Payload {
        let mut p = Payload::new();
        let mut put = |k: &str, v: String| {
            p.insert(k.to_string(), v);
        };

        put("eid", uuid::Uuid::new_v4().to_string());
        put("dtm", chrono::Utc::now().timestamp_millis().to_string());
        put("tv", TRACKER_VERSION.to_string());
        put("tna", self.identity.namespace.clone());
        put("aid", self.identity.app_id.clone());
        put("p", self.identity.platform.clone());

        match &event.kind {
            EventKind::PageView {
                url,
                referrer,
                title,
            } => {
                put("e", "pv".to_string());
                put("url", url.clone());
                if let Some(r) = referrer {
                    put("refr", r.clone());
                }
                if let Some(t) = title {
                    put("page", t.clone());
                }
            }
            EventKind::Structured {
                category,
                action,
                label,
                property,
                value,
            } => {
                put("e", "se".to_string());
                put("se_ca", category.clone());
                put("se_ac", action.clone());
                if let Some(l) = label {
                    put("se_la", l.clone());
                }
                if let Some(pr) = property {
                    put("se_pr", pr.clone());
                }
                if let Some(v) = value {
                    put("se_va", v.to_string());
                }
            }
            EventKind::SelfDescribing(sdj) => {
                put("e", "ue".to_string());
                put(
                    "ue_pr",
                    json!({ "schema": UNSTRUCT_EVENT_SCHEMA, "data": sdj }).to_string(),
                );
            }
        }

        if !event.context.is_empty() {
            put("co", contexts_json(&event.context));
        }

        p
    }
}

fn contexts_json(entities: &[SelfDescribingJson]) -> String {
    json!({ "schema": CONTEXTS_SCHEMA, "data": entities }).to_string()
}
