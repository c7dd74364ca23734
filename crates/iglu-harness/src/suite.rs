//! Test suites and how they are registered.
//!
//! A suite is the set of named cases for one schema identity. Suites come
//! from two places:
//! - code, via [`SuiteRegistry::register`]
//! - declarative JSON files under the tests root, laid out like the schemas
//!   with a `.json` suffix on the version segment
//!
//! A declarative suite file is an array of cases:
//!
//! ```json
//! [
//!   {
//!     "name": "It should send a page view on happy path",
//!     "track": { "type": "page_view", "url": "http://www.example.com", "referrer": "http://www.referer.com" },
//!     "expect": "ok"
//!   }
//! ]
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use iglu_core::{resolve_layout, SchemaIdentifier};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::case::Assert;
use crate::error::HarnessError;
use crate::sdk::{Sdk, SelfDescribingJson, TrackedEvent};
use crate::tracker::Tracker;

/// Test body: track one event and declare the expected outcome.
pub type TestFn = Arc<dyn Fn(&Tracker, &Sdk, &Assert) + Send + Sync>;

/// A named unit of behaviour.
#[derive(Clone)]
pub struct TestCase {
    pub name: String,
    pub run: TestFn,
}

impl TestCase {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&Tracker, &Sdk, &Assert) + Send + Sync + 'static,
    {
        TestCase {
            name: name.into(),
            run: Arc::new(run),
        }
    }
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

/// Ordered cases for one schema identity.
#[derive(Debug, Clone)]
pub struct TestSuite {
    pub id: SchemaIdentifier,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(id: SchemaIdentifier) -> Self {
        TestSuite {
            id,
            cases: Vec::new(),
        }
    }

    /// Append a case; names must be unique within the suite.
    pub fn add(&mut self, case: TestCase) -> Result<(), HarnessError> {
        if self.cases.iter().any(|c| c.name == case.name) {
            return Err(HarnessError::DuplicateCase {
                suite: self.id.to_iglu_path(),
                case: case.name,
            });
        }
        self.cases.push(case);
        Ok(())
    }
}

/// Explicit registry of suites, in registration order.
#[derive(Debug, Default)]
pub struct SuiteRegistry {
    suites: Vec<TestSuite>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a case under a schema identity, creating the suite on first use.
    pub fn register(&mut self, id: SchemaIdentifier, case: TestCase) -> Result<(), HarnessError> {
        match self.suites.iter_mut().find(|s| s.id.to_iglu_path() == id.to_iglu_path()) {
            Some(suite) => suite.add(case),
            None => {
                let mut suite = TestSuite::new(id);
                suite.add(case)?;
                self.suites.push(suite);
                Ok(())
            }
        }
    }

    /// Register every declarative suite found under `tests_root`.
    pub fn load_dir(&mut self, tests_root: &Path) -> Result<usize, HarnessError> {
        let mut loaded = 0;
        for suite in load_declarative_suites(tests_root)? {
            for case in suite.cases {
                self.register(suite.id.clone(), case)?;
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    pub fn into_suites(self) -> Vec<TestSuite> {
        self.suites
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}

/// Outcome a declarative case expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    Ok,
    Fail,
}

/// Entity attached to a declarative event. `schema` defaults to the suite's own.
#[derive(Debug, Clone, Deserialize)]
pub struct EntitySpec {
    pub schema: Option<String>,
    pub data: Value,
}

/// Event a declarative case tracks.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackSpec {
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
    /// `schema` defaults to the suite's own schema.
    SelfDescribing {
        schema: Option<String>,
        data: Value,
    },
}

/// One case in a declarative suite file.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseSpec {
    pub name: String,
    pub track: TrackSpec,
    #[serde(default)]
    pub context: Vec<EntitySpec>,
    pub expect: Expectation,
}

impl CaseSpec {
    /// Build the event this case tracks, resolving default schemas to `id`.
    pub fn event(&self, sdk: &Sdk, id: &SchemaIdentifier) -> TrackedEvent {
        let own_schema = id.to_iglu_uri();
        let mut event = match &self.track {
            TrackSpec::PageView {
                url,
                referrer,
                title,
            } => match title {
                Some(t) => sdk.page_view_titled(url.clone(), referrer.as_deref(), t.clone()),
                None => sdk.page_view(url.clone(), referrer.as_deref()),
            },
            TrackSpec::Structured {
                category,
                action,
                label,
                property,
                value,
            } => {
                let mut b = sdk.structured(category.clone(), action.clone());
                if let Some(l) = label {
                    b = b.label(l.clone());
                }
                if let Some(p) = property {
                    b = b.property(p.clone());
                }
                if let Some(v) = value {
                    b = b.value(*v);
                }
                b.build()
            }
            TrackSpec::SelfDescribing { schema, data } => sdk.self_describing(
                schema.clone().unwrap_or_else(|| own_schema.clone()),
                data.clone(),
            ),
        };
        for entity in &self.context {
            event = event.with_context(SelfDescribingJson::new(
                entity.schema.clone().unwrap_or_else(|| own_schema.clone()),
                entity.data.clone(),
            ));
        }
        event
    }

    /// Turn the declaration into a runnable case.
    pub fn into_case(self, id: &SchemaIdentifier) -> TestCase {
        let id = id.clone();
        let name = self.name.clone();
        TestCase::new(name, move |tracker, sdk, assert| {
            tracker.track(self.event(sdk, &id));
            match self.expect {
                Expectation::Ok => assert.ok(),
                Expectation::Fail => assert.fail(),
            }
        })
    }
}

/// Parse one declarative suite file.
pub fn load_suite_file(id: &SchemaIdentifier, path: &Path) -> Result<TestSuite, HarnessError> {
    let content = std::fs::read_to_string(path)?;
    let specs: Vec<CaseSpec> =
        serde_json::from_str(&content).map_err(|source| HarnessError::InvalidSuite {
            path: path.to_path_buf(),
            source,
        })?;

    let mut suite = TestSuite::new(id.clone());
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.name.clone()) {
            return Err(HarnessError::DuplicateCase {
                suite: id.to_iglu_path(),
                case: spec.name,
            });
        }
        suite.cases.push(spec.into_case(id));
    }
    debug!(suite = %id, cases = suite.cases.len(), "loaded suite");
    Ok(suite)
}

/// Load every declarative suite under `tests_root`.
pub fn load_declarative_suites(tests_root: &Path) -> Result<Vec<TestSuite>, HarnessError> {
    resolve_layout(tests_root)?
        .iter()
        .map(|id| load_suite_file(id, &id.path))
        .collect()
}
