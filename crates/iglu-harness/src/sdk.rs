//! Event builders handed to test cases.
//!
//! A test case receives an [`Sdk`] and uses it to build exactly the event it
//! wants to track; the [`Tracker`](crate::tracker::Tracker) turns the event
//! into a tracker-protocol payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A `{schema, data}` pair referencing an iglu schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfDescribingJson {
    pub schema: String,
    pub data: Value,
}

impl SelfDescribingJson {
    pub fn new(schema: impl Into<String>, data: Value) -> Self {
        Self {
            schema: schema.into(),
            data,
        }
    }
}

/// Event kinds the tracker knows how to serialise.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    PageView {
        url: String,
        referrer: Option<String>,
        title: Option<String>,
    },
    Structured {
        category: String,
        action: String,
        label: Option<String>,
        property: Option<String>,
        value: Option<f64>,
    },
    SelfDescribing(SelfDescribingJson),
}

/// An event ready to be tracked, with any attached entities.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEvent {
    pub kind: EventKind,
    pub context: Vec<SelfDescribingJson>,
}

impl TrackedEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            context: Vec::new(),
        }
    }

    /// Attach an entity to the event.
    pub fn with_context(mut self, entity: SelfDescribingJson) -> Self {
        self.context.push(entity);
        self
    }
}

/// Capability set passed to every test case.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sdk;

impl Sdk {
    pub fn new() -> Self {
        Sdk
    }

    pub fn page_view(&self, url: impl Into<String>, referrer: Option<&str>) -> TrackedEvent {
        TrackedEvent::new(EventKind::PageView {
            url: url.into(),
            referrer: referrer.map(str::to_string),
            title: None,
        })
    }

    pub fn page_view_titled(
        &self,
        url: impl Into<String>,
        referrer: Option<&str>,
        title: impl Into<String>,
    ) -> TrackedEvent {
        TrackedEvent::new(EventKind::PageView {
            url: url.into(),
            referrer: referrer.map(str::to_string),
            title: Some(title.into()),
        })
    }

    pub fn structured(
        &self,
        category: impl Into<String>,
        action: impl Into<String>,
    ) -> StructuredBuilder {
        StructuredBuilder {
            category: category.into(),
            action: action.into(),
            label: None,
            property: None,
            value: None,
        }
    }

    pub fn self_describing(&self, schema: impl Into<String>, data: Value) -> TrackedEvent {
        TrackedEvent::new(EventKind::SelfDescribing(SelfDescribingJson::new(
            schema, data,
        )))
    }

    pub fn entity(&self, schema: impl Into<String>, data: Value) -> SelfDescribingJson {
        SelfDescribingJson::new(schema, data)
    }
}

/// Builder for structured events; optional fields default to absent.
#[derive(Debug, Clone)]
pub struct StructuredBuilder {
    category: String,
    action: String,
    label: Option<String>,
    property: Option<String>,
    value: Option<f64>,
}

impl StructuredBuilder {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn build(self) -> TrackedEvent {
        TrackedEvent::new(EventKind::Structured {
            category: self.category,
            action: self.action,
            label: self.label,
            property: self.property,
            value: self.value,
        })
    }
}
