//! Core data models for the research assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub type EntityId = String;
pub type FieldName = String;
pub type SessionId = Uuid;

/// Field name → value for a single entity.
pub type FieldMap = BTreeMap<FieldName, Value>;

//
// ================= Value =================
//

/// Scalar field value as carried by sources, the baseline and plans.
///
/// Serialized untagged, so `1998`, `"Redmond, WA"`, `true` and `null`
/// appear on the wire as plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Coerce arbitrary client JSON into a scalar. Arrays and objects are
    /// kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

//
// ================= Research =================
//

/// Outcome of resolving every source vote for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    #[serde(rename = "company")]
    pub entity: EntityId,
    pub resolved: FieldMap,
    /// Candidate values per contested field, highest weight first.
    pub conflicts: BTreeMap<FieldName, Vec<Value>>,
    #[serde(rename = "sources")]
    pub sources_used: Vec<String>,
}

impl ResolvedRecord {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.resolved.get(name)
    }

    /// Resolved field rendered for prose, `Unknown` when missing.
    pub fn field_or_unknown(&self, name: &str) -> String {
        match self.resolved.get(name) {
            Some(value) if !value.is_null() => value.to_string(),
            _ => "Unknown".to_string(),
        }
    }

    pub fn conflicting_fields(&self) -> Vec<&str> {
        self.conflicts.keys().map(|k| k.as_str()).collect()
    }
}

//
// ================= Account Plan =================
//

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
    #[default]
    Concise,
    Detailed,
}

impl fmt::Display for PlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanMode::Concise => "concise",
            PlanMode::Detailed => "detailed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPlan {
    pub overview: String,
    pub key_metrics: BTreeMap<String, Value>,
    pub opportunities: Vec<String>,
    pub risks: Vec<String>,
    pub next_steps: Vec<String>,
    pub human_summary: String,
    pub notes: ResolvedRecord,
    pub mode: PlanMode,
    pub generated_at: DateTime<Utc>,
    /// Sections added through field-level updates that have no typed slot.
    #[serde(flatten)]
    pub extra_sections: BTreeMap<String, serde_json::Value>,
}

//
// ================= Session =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Coarse conversational tone, in tie-break order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PersonaTag {
    Confused,
    Efficient,
    Chatty,
    #[default]
    Neutral,
}

impl fmt::Display for PersonaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PersonaTag::Confused => "confused",
            PersonaTag::Efficient => "efficient",
            PersonaTag::Chatty => "chatty",
            PersonaTag::Neutral => "neutral",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub history: Vec<HistoryEntry>,
    #[serde(rename = "active_company")]
    pub active_entity: Option<EntityId>,
    pub research_progress: BTreeMap<EntityId, ResolvedRecord>,
    pub persona: PersonaTag,
    pub account_plans: BTreeMap<EntityId, AccountPlan>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, persona: PersonaTag) -> Self {
        Self {
            id,
            history: Vec::new(),
            active_entity: None,
            research_progress: BTreeMap::new(),
            persona,
            account_plans: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_serializes_as_plain_scalar() {
        let json = serde_json::to_string(&vec![
            Value::Integer(1998),
            Value::text("Mountain View, CA"),
            Value::Bool(true),
            Value::Null,
        ])
        .unwrap();
        assert_eq!(json, r#"[1998,"Mountain View, CA",true,null]"#);
    }

    #[test]
    fn test_value_deserializes_integers_before_floats() {
        let values: Vec<Value> = serde_json::from_str(r#"[2003, 2.5, "x", null]"#).unwrap();
        assert_eq!(values[0], Value::Integer(2003));
        assert_eq!(values[1], Value::Float(2.5));
        assert_eq!(values[2], Value::text("x"));
        assert!(values[3].is_null());
    }

    #[test]
    fn test_from_json_keeps_structures_as_text() {
        let v = Value::from_json(&serde_json::json!(["a", "b"]));
        assert_eq!(v, Value::text(r#"["a","b"]"#));
        assert_eq!(Value::from_json(&serde_json::json!(42)), Value::Integer(42));
    }

    #[test]
    fn test_record_wire_names() {
        let record = ResolvedRecord {
            entity: "Tesla".into(),
            resolved: FieldMap::new(),
            conflicts: BTreeMap::new(),
            sources_used: vec!["CorporateSite".into()],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["company"], "Tesla");
        assert_eq!(json["sources"][0], "CorporateSite");
        assert_eq!(record.field_or_unknown("industry"), "Unknown");
    }
}
