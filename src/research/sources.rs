//! Source registry and baseline store
//!
//! Sources simulate external research feeds. Each carries a weight and a
//! set of per-entity field values. The baseline only fills gaps.

use crate::error::AssistantError;
use crate::models::{EntityId, FieldMap, Value};
use crate::Result;
use std::collections::BTreeMap;

/// A weighted, immutable research feed.
#[derive(Debug, Clone)]
pub struct Source {
    name: String,
    weight: f64,
    data: BTreeMap<EntityId, FieldMap>,
}

impl Source {
    pub fn new(name: impl Into<String>, weight: f64) -> Result<Self> {
        let name = name.into();
        if !weight.is_finite() || weight < 0.0 {
            return Err(AssistantError::InvalidSource(format!(
                "source '{}' has invalid weight {}",
                name, weight
            )));
        }

        Ok(Self {
            name,
            weight,
            data: BTreeMap::new(),
        })
    }

    /// Builder-style helper used while assembling a source before registration.
    pub fn with_record<I, K, V>(mut self, entity: impl Into<EntityId>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let record = self.data.entry(entity.into()).or_default();
        for (field, value) in fields {
            record.insert(field.into(), value.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn record(&self, entity: &str) -> Option<&FieldMap> {
        self.data.get(entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|k| k.as_str())
    }
}

/// Ordered collection of sources. Registration order is significant: it
/// drives `sources_used` and tie-breaking during resolution.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register(&mut self, source: Source) {
        self.sources.push(source);
    }

    pub fn get(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn list(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Default records per entity, consulted only for fields no source voted on.
#[derive(Debug, Clone, Default)]
pub struct BaselineStore {
    records: BTreeMap<EntityId, FieldMap>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    pub fn insert<I, K, V>(&mut self, entity: impl Into<EntityId>, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let record = self.records.entry(entity.into()).or_default();
        for (field, value) in fields {
            record.insert(field.into(), value.into());
        }
    }

    pub fn record(&self, entity: &str) -> Option<&FieldMap> {
        self.records.get(entity)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.records.contains_key(entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|k| k.as_str())
    }

    /// Overwrite one field. Only entities that already have a record are
    /// touched; returns whether the write happened.
    pub fn set_field(&mut self, entity: &str, field: &str, value: Value) -> bool {
        match self.records.get_mut(entity) {
            Some(record) => {
                record.insert(field.to_string(), value);
                true
            }
            None => false,
        }
    }
}

/// Demo sources. OldArchive carries a stale founding year for Google.
pub fn create_default_registry() -> Result<SourceRegistry> {
    let mut registry = SourceRegistry::new();

    registry.register(
        Source::new("CorporateSite", 0.5)?
            .with_record(
                "Google",
                [
                    ("founded", Value::from(1998)),
                    ("headquarters", Value::from("Mountain View, CA")),
                ],
            )
            .with_record(
                "Microsoft",
                [
                    ("founded", Value::from(1975)),
                    ("headquarters", Value::from("Redmond, WA")),
                ],
            )
            .with_record(
                "Tesla",
                [
                    ("founded", Value::from(2003)),
                    ("headquarters", Value::from("Palo Alto, CA")),
                ],
            ),
    );

    registry.register(
        Source::new("OldArchive", 0.2)?
            .with_record(
                "Google",
                [
                    ("founded", Value::from(1996)),
                    ("headquarters", Value::from("Mountain View, CA")),
                ],
            )
            .with_record("Microsoft", [("founded", 1975)])
            .with_record("Tesla", [("founded", 2003)]),
    );

    registry.register(
        Source::new("NewsReport", 0.3)?
            .with_record("Google", [("founded", 1998)])
            .with_record("Microsoft", [("founded", 1975)])
            .with_record("Tesla", [("founded", 2003)]),
    );

    Ok(registry)
}

pub fn default_baseline() -> BaselineStore {
    let mut baseline = BaselineStore::new();

    baseline.insert(
        "Google",
        [
            ("industry", Value::from("Technology")),
            ("headquarters", Value::from("Mountain View, CA")),
            ("founded", Value::from(1998)),
            ("employees", Value::from(156_500)),
            ("notes", Value::from("Known for search engine and AI research.")),
        ],
    );
    baseline.insert(
        "Microsoft",
        [
            ("industry", Value::from("Technology")),
            ("headquarters", Value::from("Redmond, WA")),
            ("founded", Value::from(1975)),
            ("employees", Value::from(221_000)),
            ("notes", Value::from("Focus on software, cloud computing, and AI.")),
        ],
    );
    baseline.insert(
        "Tesla",
        [
            ("industry", Value::from("Automotive & Energy")),
            ("headquarters", Value::from("Palo Alto, CA")),
            ("founded", Value::from(2003)),
            ("employees", Value::from(110_000)),
            ("notes", Value::from("Electric vehicles and clean energy solutions.")),
        ],
    );

    baseline
}
