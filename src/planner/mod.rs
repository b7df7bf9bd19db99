//! Account plan composition
//!
//! Turns a resolved research record into an account plan. Only the
//! human summary comes from the text generator; everything else is
//! derived from the record or fixed.

use crate::generator::TextGenerator;
use crate::models::{AccountPlan, PlanMode, ResolvedRecord, Value};
use crate::research::ResolutionEngine;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

const BASE_OPPORTUNITY: &str = "AI/ML product partnerships";
const TECHNOLOGY_INDUSTRY: &str = "Technology";

const RISKS: &[&str] = &["Competition from large incumbents", "Regulatory changes"];

const NEXT_STEPS: &[&str] = &[
    "Validate data from trusted sources",
    "Reach out to product leads for discovery call",
];

pub struct PlanComposer {
    engine: Arc<ResolutionEngine>,
    generator: Arc<dyn TextGenerator>,
}

impl PlanComposer {
    pub fn new(engine: Arc<ResolutionEngine>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { engine, generator }
    }

    pub async fn compose(&self, entity: &str, mode: PlanMode) -> AccountPlan {
        let research = self.engine.resolve(entity).await;

        let overview = shape_for_mode(
            &format!(
                "{} is in {} industry, headquartered at {}.",
                entity,
                research.field_or_unknown("industry"),
                research.field_or_unknown("headquarters"),
            ),
            mode,
        );

        let mut key_metrics = BTreeMap::new();
        key_metrics.insert(
            "founded".to_string(),
            research.field("founded").cloned().unwrap_or(Value::Null),
        );
        key_metrics.insert(
            "employees".to_string(),
            research
                .field("employees")
                .cloned()
                .unwrap_or_else(|| Value::text("Unknown")),
        );

        let human_summary = self
            .generator
            .generate(&summary_prompt(&research))
            .await
            .into_text_or("LLM adapter failed");

        info!(
            entity = %entity,
            mode = %mode,
            conflicts = research.conflicts.len(),
            "Account plan composed"
        );

        AccountPlan {
            overview,
            key_metrics,
            opportunities: opportunities_for(&research),
            risks: to_strings(RISKS),
            next_steps: to_strings(NEXT_STEPS),
            human_summary,
            notes: research,
            mode,
            generated_at: Utc::now(),
            extra_sections: BTreeMap::new(),
        }
    }
}

fn summary_prompt(research: &ResolvedRecord) -> String {
    let research_json = serde_json::to_string(research).unwrap_or_default();
    format!(
        "You are a helpful assistant. Summarize the following research about {} in 3 bullets and give a one-sentence outreach template:\n\nResearch: {}",
        research.entity, research_json
    )
}

fn opportunities_for(research: &ResolvedRecord) -> Vec<String> {
    let industry_specific = match research.field("industry").and_then(Value::as_str) {
        Some(TECHNOLOGY_INDUSTRY) => "Cloud migration services",
        _ => "Market expansion",
    };
    vec![BASE_OPPORTUNITY.to_string(), industry_specific.to_string()]
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Concise mode keeps the first sentence only.
pub fn shape_for_mode(text: &str, mode: PlanMode) -> String {
    match mode {
        PlanMode::Detailed => text.to_string(),
        PlanMode::Concise => first_sentence(text),
    }
}

/// Text up to and including the first period. Text without a period gets
/// one appended.
pub fn first_sentence(text: &str) -> String {
    match text.find('.') {
        Some(idx) => text[..=idx].to_string(),
        None => format!("{}.", text),
    }
}

/// Lenient mode parse: only "detailed" selects the detailed plan.
pub fn parse_mode(raw: Option<&str>) -> PlanMode {
    match raw.map(|m| m.trim().to_lowercase()) {
        Some(m) if m == "detailed" => PlanMode::Detailed,
        _ => PlanMode::Concise,
    }
}

fn json_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_to_list(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items.iter().map(json_to_text).collect(),
        other => vec![json_to_text(other)],
    }
}

impl AccountPlan {
    /// Field-level update. Typed sections are coerced; unknown sections are
    /// kept verbatim in `extra_sections`.
    pub fn apply_update(&mut self, section: &str, value: &serde_json::Value) {
        match section {
            "overview" => self.overview = json_to_text(value),
            "human_summary" => self.human_summary = json_to_text(value),
            "opportunities" => self.opportunities = json_to_list(value),
            "risks" => self.risks = json_to_list(value),
            "next_steps" => self.next_steps = json_to_list(value),
            "founded" | "employees" => {
                self.key_metrics
                    .insert(section.to_string(), Value::from_json(value));
            }
            "key_metrics" => match value.as_object() {
                Some(metrics) => {
                    self.key_metrics = metrics
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect();
                }
                None => warn!("Ignoring non-object key_metrics update"),
            },
            "notes" => match serde_json::from_value::<ResolvedRecord>(value.clone()) {
                Ok(record) => self.notes = record,
                Err(e) => warn!("Ignoring notes update that is not a research record: {}", e),
            },
            // Serialized names of typed fields; a flattened copy would collide.
            "mode" | "generated_at" => warn!(section = %section, "Ignoring read-only plan section"),
            other => {
                self.extra_sections.insert(other.to_string(), value.clone());
            }
        }
    }
}
