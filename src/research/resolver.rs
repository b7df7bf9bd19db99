//! Multi-source resolution
//!
//! Merges weighted source votes into one value per field, flags fields
//! whose top two candidates are too close to call, and fills the gaps
//! from the baseline. Resolution is a pure function of the registry and
//! baseline at call time.

use crate::models::{FieldMap, FieldName, ResolvedRecord, Value};
use crate::research::sources::{BaselineStore, SourceRegistry};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Minimum weight gap between the top two candidates for a field to be
/// considered settled.
pub const CONFLICT_MARGIN: f64 = 0.25;

/// Absorbs rounding in decimal weights: 0.35 - 0.1 is 0.24999999999999997.
const MARGIN_TOLERANCE: f64 = 1e-9;

/// Accumulated weight per distinct value per field. Candidate order is the
/// order in which values were first seen, which is registration order.
#[derive(Debug, Default)]
pub struct FieldVoteTable {
    fields: BTreeMap<FieldName, Vec<(Value, f64)>>,
}

impl FieldVoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `weight` to `value`'s total. `1998` and `1998.0` are the same vote.
    pub fn cast(&mut self, field: &str, value: &Value, weight: f64) {
        let value = vote_key(value);
        let candidates = self.fields.entry(field.to_string()).or_default();

        match candidates.iter_mut().find(|(candidate, _)| *candidate == value) {
            Some((_, total)) => *total += weight,
            None => candidates.push((value, weight)),
        }
    }

    pub fn weight_of(&self, field: &str, value: &Value) -> Option<f64> {
        let value = vote_key(value);
        self.fields
            .get(field)?
            .iter()
            .find(|(candidate, _)| *candidate == value)
            .map(|(_, weight)| *weight)
    }

    /// Consume the table, yielding each field's candidates sorted by weight
    /// descending. `sort_by` is stable, so equal weights keep first-seen order.
    pub fn into_ranked(self) -> impl Iterator<Item = (FieldName, Vec<(Value, f64)>)> {
        self.fields.into_iter().map(|(field, mut candidates)| {
            candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            (field, candidates)
        })
    }
}

/// Integral floats vote as integers.
fn vote_key(value: &Value) -> Value {
    match value {
        Value::Float(f) if f.fract() == 0.0 && f.abs() < (1u64 << 53) as f64 => {
            Value::Integer(*f as i64)
        }
        other => other.clone(),
    }
}

/// Resolve one entity against a registry and baseline snapshot.
pub fn resolve(
    registry: &SourceRegistry,
    baseline: &BaselineStore,
    entity: &str,
) -> ResolvedRecord {
    let mut votes = FieldVoteTable::new();
    let mut sources_used = Vec::with_capacity(registry.len());

    for source in registry.iter() {
        sources_used.push(source.name().to_string());

        // Zero weight: listed, but its votes do not exist.
        if source.weight() == 0.0 {
            continue;
        }

        if let Some(record) = source.record(entity) {
            for (field, value) in record {
                votes.cast(field, value, source.weight());
            }
        }
    }

    let mut resolved = FieldMap::new();
    let mut conflicts = BTreeMap::new();

    for (field, ranked) in votes.into_ranked() {
        let Some((top_value, top_weight)) = ranked.first() else {
            continue;
        };

        debug!(
            entity = %entity,
            field = %field,
            candidates = ranked.len(),
            top = %top_value,
            top_weight = top_weight,
            "Field votes ranked"
        );

        resolved.insert(field.clone(), top_value.clone());

        let contested = ranked
            .get(1)
            .map(|(_, second_weight)| {
                top_weight - second_weight < CONFLICT_MARGIN - MARGIN_TOLERANCE
            })
            .unwrap_or(false);

        if contested {
            conflicts.insert(field, ranked.into_iter().map(|(value, _)| value).collect());
        }
    }

    if let Some(defaults) = baseline.record(entity) {
        for (field, value) in defaults {
            resolved.entry(field.clone()).or_insert_with(|| value.clone());
        }
    }

    ResolvedRecord {
        entity: entity.to_string(),
        resolved,
        conflicts,
        sources_used,
    }
}

/// Shared handle over the registry and the (mutable) baseline.
pub struct ResolutionEngine {
    registry: Arc<SourceRegistry>,
    baseline: RwLock<BaselineStore>,
}

impl ResolutionEngine {
    pub fn new(registry: SourceRegistry, baseline: BaselineStore) -> Self {
        Self {
            registry: Arc::new(registry),
            baseline: RwLock::new(baseline),
        }
    }

    pub async fn resolve(&self, entity: &str) -> ResolvedRecord {
        let record = {
            let baseline = self.baseline.read().await;
            resolve(&self.registry, &baseline, entity)
        };

        info!(
            entity = %entity,
            fields = record.resolved.len(),
            conflicts = record.conflicts.len(),
            sources = record.sources_used.len(),
            "Research resolved"
        );

        record
    }

    /// Baseline entities first, then any entity only a source knows about.
    pub async fn known_entities(&self) -> Vec<String> {
        let baseline = self.baseline.read().await;
        let mut entities: Vec<String> = baseline.entities().map(str::to_string).collect();

        for source in self.registry.iter() {
            for entity in source.entities() {
                if !entities.iter().any(|known| known == entity) {
                    entities.push(entity.to_string());
                }
            }
        }

        entities
    }

    pub async fn has_baseline(&self, entity: &str) -> bool {
        self.baseline.read().await.contains(entity)
    }

    pub async fn update_baseline(&self, entity: &str, field: &str, value: Value) -> bool {
        let updated = self.baseline.write().await.set_field(entity, field, value);
        if updated {
            info!(entity = %entity, field = %field, "Baseline field updated");
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::sources::{create_default_registry, default_baseline, Source};

    fn registry_of(sources: Vec<Source>) -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        for source in sources {
            registry.register(source);
        }
        registry
    }

    fn source(name: &str, weight: f64, entity: &str, fields: &[(&str, Value)]) -> Source {
        Source::new(name, weight)
            .unwrap()
            .with_record(entity, fields.iter().cloned())
    }

    #[test]
    fn test_google_majority_wins_without_conflict() {
        let registry = create_default_registry().unwrap();
        let record = resolve(&registry, &BaselineStore::new(), "Google");

        assert_eq!(record.field("founded"), Some(&Value::Integer(1998)));
        assert!(!record.conflicts.contains_key("founded"));
        assert_eq!(record.field("headquarters"), Some(&Value::text("Mountain View, CA")));
        assert!(!record.has_conflicts());
    }

    #[test]
    fn test_vote_weights_accumulate_per_value() {
        let registry = create_default_registry().unwrap();
        let mut votes = FieldVoteTable::new();
        for src in registry.iter() {
            if let Some(record) = src.record("Google") {
                for (field, value) in record {
                    votes.cast(field, value, src.weight());
                }
            }
        }

        let founded_1998 = votes.weight_of("founded", &Value::Integer(1998)).unwrap();
        let founded_1996 = votes.weight_of("founded", &Value::Integer(1996)).unwrap();
        assert!((founded_1998 - 0.8).abs() < 1e-9);
        assert!((founded_1996 - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_equal_weights_conflict_first_registered_first() {
        let registry = registry_of(vec![
            source("A", 0.5, "Acme", &[("headquarters", Value::text("Boston, MA"))]),
            source("B", 0.5, "Acme", &[("headquarters", Value::text("Austin, TX"))]),
        ]);

        let record = resolve(&registry, &BaselineStore::new(), "Acme");

        assert_eq!(record.field("headquarters"), Some(&Value::text("Boston, MA")));
        assert_eq!(
            record.conflicts.get("headquarters"),
            Some(&vec![Value::text("Boston, MA"), Value::text("Austin, TX")])
        );
    }

    #[test]
    fn test_tie_break_is_registration_order_not_value_order() {
        let registry = registry_of(vec![
            source("A", 0.4, "Acme", &[("ceo", Value::text("Zed"))]),
            source("B", 0.4, "Acme", &[("ceo", Value::text("Amy"))]),
        ]);

        let record = resolve(&registry, &BaselineStore::new(), "Acme");
        assert_eq!(record.field("ceo"), Some(&Value::text("Zed")));
        assert_eq!(
            record.conflicts["ceo"],
            vec![Value::text("Zed"), Value::text("Amy")]
        );
    }

    #[test]
    fn test_conflict_lists_all_candidates_by_weight() {
        let registry = registry_of(vec![
            source("A", 0.1, "Acme", &[("founded", Value::Integer(1990))]),
            source("B", 0.3, "Acme", &[("founded", Value::Integer(1991))]),
            source("C", 0.2, "Acme", &[("founded", Value::Integer(1992))]),
        ]);

        let record = resolve(&registry, &BaselineStore::new(), "Acme");
        assert_eq!(record.field("founded"), Some(&Value::Integer(1991)));
        assert_eq!(
            record.conflicts["founded"],
            vec![Value::Integer(1991), Value::Integer(1992), Value::Integer(1990)]
        );
    }

    #[test]
    fn test_margin_boundary_is_exclusive() {
        // 0.5 - 0.25 is exactly representable, so the gap is exactly the margin.
        let at_margin = registry_of(vec![
            source("A", 0.5, "Acme", &[("industry", Value::text("Retail"))]),
            source("B", 0.25, "Acme", &[("industry", Value::text("Logistics"))]),
        ]);
        let record = resolve(&at_margin, &BaselineStore::new(), "Acme");
        assert_eq!(record.field("industry"), Some(&Value::text("Retail")));
        assert!(record.conflicts.is_empty());

        let inside_margin = registry_of(vec![
            source("A", 0.5, "Acme", &[("industry", Value::text("Retail"))]),
            source("B", 0.375, "Acme", &[("industry", Value::text("Logistics"))]),
        ]);
        let record = resolve(&inside_margin, &BaselineStore::new(), "Acme");
        assert!(record.conflicts.contains_key("industry"));
    }

    #[test]
    fn test_decimal_gap_equal_to_margin_is_not_a_conflict() {
        let registry = registry_of(vec![
            source("A", 0.35, "Acme", &[("ceo", Value::text("Ann"))]),
            source("B", 0.1, "Acme", &[("ceo", Value::text("Bob"))]),
        ]);
        let record = resolve(&registry, &BaselineStore::new(), "Acme");
        assert_eq!(record.field("ceo"), Some(&Value::text("Ann")));
        assert!(record.conflicts.is_empty());

        let registry = registry_of(vec![
            source("A", 0.35, "Acme", &[("ceo", Value::text("Ann"))]),
            source("B", 0.11, "Acme", &[("ceo", Value::text("Bob"))]),
        ]);
        let record = resolve(&registry, &BaselineStore::new(), "Acme");
        assert!(record.conflicts.contains_key("ceo"));
    }

    #[test]
    fn test_integral_float_votes_with_matching_integer() {
        let registry = registry_of(vec![
            source("A", 0.4, "Acme", &[("founded", Value::Integer(1998))]),
            source("B", 0.4, "Acme", &[("founded", Value::Float(1998.0))]),
            source("C", 0.3, "Acme", &[("founded", Value::Float(1998.5))]),
        ]);
        let record = resolve(&registry, &BaselineStore::new(), "Acme");

        assert_eq!(record.field("founded"), Some(&Value::Integer(1998)));
        assert!(record.conflicts.is_empty());

        let mut votes = FieldVoteTable::new();
        votes.cast("founded", &Value::Integer(1998), 0.4);
        votes.cast("founded", &Value::Float(1998.0), 0.4);
        let total = votes.weight_of("founded", &Value::Float(1998.0)).unwrap();
        assert!((total - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_conflict_appears_as_gap_shrinks() {
        let gaps = [(1.0, 0.5, false), (0.75, 0.5, false), (0.625, 0.5, true), (0.5, 0.5, true)];

        for (top, second, expect_conflict) in gaps {
            let registry = registry_of(vec![
                source("A", top, "Acme", &[("ceo", Value::text("Ann"))]),
                source("B", second, "Acme", &[("ceo", Value::text("Bob"))]),
            ]);
            let record = resolve(&registry, &BaselineStore::new(), "Acme");
            assert_eq!(
                record.conflicts.contains_key("ceo"),
                expect_conflict,
                "gap {} - {}",
                top,
                second
            );
        }
    }

    #[test]
    fn test_unknown_entity_lists_every_source() {
        let registry = create_default_registry().unwrap();
        let record = resolve(&registry, &default_baseline(), "Initech");

        assert!(record.resolved.is_empty());
        assert!(record.conflicts.is_empty());
        assert_eq!(record.sources_used.len(), registry.len());
        assert_eq!(record.sources_used, vec!["CorporateSite", "OldArchive", "NewsReport"]);
    }

    #[test]
    fn test_baseline_only_entity_equals_baseline() {
        let mut baseline = BaselineStore::new();
        baseline.insert(
            "Initech",
            [("industry", Value::text("Software")), ("employees", Value::Integer(300))],
        );

        let record = resolve(&create_default_registry().unwrap(), &baseline, "Initech");
        assert_eq!(&record.resolved, baseline.record("Initech").unwrap());
        assert!(record.conflicts.is_empty());
    }

    #[test]
    fn test_baseline_never_overrides_votes_or_conflicts() {
        let registry = registry_of(vec![
            source("A", 0.5, "Acme", &[("headquarters", Value::text("Boston, MA"))]),
            source("B", 0.5, "Acme", &[("headquarters", Value::text("Austin, TX"))]),
        ]);
        let mut baseline = BaselineStore::new();
        baseline.insert(
            "Acme",
            [
                ("headquarters", Value::text("Denver, CO")),
                ("industry", Value::text("Widgets")),
            ],
        );

        let record = resolve(&registry, &baseline, "Acme");
        assert_eq!(record.field("headquarters"), Some(&Value::text("Boston, MA")));
        assert_eq!(record.field("industry"), Some(&Value::text("Widgets")));
        assert!(!record.conflicts.contains_key("industry"));
        assert!(!record.conflicts["headquarters"].contains(&Value::text("Denver, CO")));
    }

    #[test]
    fn test_single_source_never_conflicts() {
        let registry = registry_of(vec![source(
            "Only",
            0.1,
            "Acme",
            &[("founded", Value::Integer(2001)), ("ceo", Value::text("Ann"))],
        )]);

        let record = resolve(&registry, &BaselineStore::new(), "Acme");
        assert_eq!(record.resolved.len(), 2);
        assert!(record.conflicts.is_empty());
    }

    #[test]
    fn test_zero_weight_source_is_listed_but_silent() {
        let registry = registry_of(vec![
            source("Muted", 0.0, "Acme", &[("ceo", Value::text("Zed"))]),
            source("Live", 0.1, "Acme", &[("ceo", Value::text("Ann"))]),
        ]);
        let mut baseline = BaselineStore::new();
        baseline.insert("Acme", [("industry", Value::text("Widgets"))]);

        let record = resolve(&registry, &baseline, "Acme");
        assert_eq!(record.sources_used, vec!["Muted", "Live"]);
        assert_eq!(record.field("ceo"), Some(&Value::text("Ann")));
        assert!(record.conflicts.is_empty());

        let muted_only = registry_of(vec![source(
            "Muted",
            0.0,
            "Acme",
            &[("industry", Value::text("Gadgets"))],
        )]);
        let record = resolve(&muted_only, &baseline, "Acme");
        assert_eq!(record.field("industry"), Some(&Value::text("Widgets")));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let registry = create_default_registry().unwrap();
        let baseline = default_baseline();

        let first = resolve(&registry, &baseline, "Google");
        let second = resolve(&registry, &baseline, "Google");
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_engine_update_baseline_only_touches_known_entities() {
        let engine = ResolutionEngine::new(create_default_registry().unwrap(), default_baseline());

        assert!(engine.update_baseline("Tesla", "employees", Value::Integer(127_855)).await);
        assert!(!engine.update_baseline("Initech", "employees", Value::Integer(1)).await);

        let record = engine.resolve("Tesla").await;
        assert_eq!(record.field("employees"), Some(&Value::Integer(127_855)));
        assert!(!engine.has_baseline("Initech").await);
    }

    #[tokio::test]
    async fn test_known_entities_puts_baseline_first() {
        let mut registry = create_default_registry().unwrap();
        registry.register(Source::new("Extra", 0.1).unwrap().with_record("Acme", [("ceo", "Ann")]));
        let engine = ResolutionEngine::new(registry, default_baseline());

        assert_eq!(
            engine.known_entities().await,
            vec!["Google", "Microsoft", "Tesla", "Acme"]
        );
    }
}
