//! Assistant - the request flows behind every endpoint
//!
//! SESSION → CLASSIFY → RESEARCH? → REPLY → RECORD
//!
//! Generator calls are awaited with no session or baseline lock held.

use crate::classifier::{mentioned_entity, wants_research, PersonaDetector};
use crate::conversational::small_talk_reply;
use crate::generator::TextGenerator;
use crate::models::{AccountPlan, ResolvedRecord, Session, SessionId, Speaker, Value};
use crate::planner::{parse_mode, PlanComposer};
use crate::research::ResolutionEngine;
use crate::state::{session_id_from_client, SessionStore};
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research: Option<ResolvedRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchReply {
    pub session_id: SessionId,
    pub reply: String,
    pub research: ResolvedRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReply {
    pub session_id: SessionId,
    pub account_plan: AccountPlan,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateReply {
    pub session_id: SessionId,
    pub message: String,
    pub updated_value: serde_json::Value,
}

pub struct Assistant {
    engine: Arc<ResolutionEngine>,
    composer: PlanComposer,
    generator: Arc<dyn TextGenerator>,
    sessions: Box<dyn SessionStore>,
}

impl Assistant {
    pub fn new(
        engine: Arc<ResolutionEngine>,
        generator: Arc<dyn TextGenerator>,
        sessions: Box<dyn SessionStore>,
    ) -> Self {
        let composer = PlanComposer::new(Arc::clone(&engine), Arc::clone(&generator));
        Self {
            engine,
            composer,
            generator,
            sessions,
        }
    }

    /// Reuse the client's session (creating it if unknown) or start a new one.
    pub async fn open_session(&self, client_id: Option<&str>) -> Result<SessionId> {
        match client_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(raw) => {
                let id = session_id_from_client(raw);
                self.sessions.ensure(id).await?;
                Ok(id)
            }
            None => self.sessions.create_session(None).await,
        }
    }

    pub async fn create_session(&self, preferred_persona: Option<&str>) -> Result<SessionId> {
        let persona = preferred_persona.map(PersonaDetector::parse);
        let id = self.sessions.create_session(persona).await?;
        info!(session_id = %id, persona = %persona.unwrap_or_default(), "New session");
        Ok(id)
    }

    pub async fn session(&self, client_id: &str) -> Result<Session> {
        self.sessions.get(session_id_from_client(client_id)).await
    }

    pub async fn companies(&self) -> Vec<String> {
        self.engine.known_entities().await
    }

    pub async fn chat(&self, client_id: Option<&str>, message: &str) -> Result<ChatReply> {
        let session_id = self.open_session(client_id).await?;

        let persona = PersonaDetector::detect(message);
        self.sessions.set_persona(session_id, persona).await?;
        self.sessions
            .append_history(session_id, Speaker::User, message)
            .await?;

        let known = self.engine.known_entities().await;
        let mentioned = mentioned_entity(message, &known);

        info!(
            session_id = %session_id,
            persona = %persona,
            research_requested = wants_research(message),
            mentioned = mentioned.unwrap_or("-"),
            "Chat message classified"
        );

        // "research" without a recognised company falls through to small talk.
        if let Some(entity) = mentioned {
            return self.chat_research(session_id, entity).await;
        }

        let reply = small_talk_reply(persona, message, self.generator.as_ref()).await;
        self.sessions
            .append_history(session_id, Speaker::Bot, &reply)
            .await?;

        Ok(ChatReply {
            session_id,
            reply,
            research: None,
        })
    }

    async fn chat_research(&self, session_id: SessionId, entity: &str) -> Result<ChatReply> {
        self.sessions.set_active_entity(session_id, entity).await?;
        self.sessions
            .append_history(
                session_id,
                Speaker::Bot,
                &format!("Starting research for {}...", entity),
            )
            .await?;

        let research = self.engine.resolve(entity).await;
        self.sessions
            .record_research(session_id, research.clone())
            .await?;

        let reply = if research.has_conflicts() {
            format!(
                "I found conflicting information about {}. Sources: {}. Do you want me to dig deeper or proceed with the highest-confidence values?",
                research.conflicting_fields().join(", "),
                research.sources_used.join(", ")
            )
        } else {
            let prompt = format!(
                "Summarize the following research succinctly for a product manager: {}",
                to_json(&research)
            );
            let summary = self
                .generator
                .generate(&prompt)
                .await
                .into_text_or("LLM unavailable");
            format!(
                "I researched {} and prepared a brief summary. {} Would you like an account plan?",
                entity, summary
            )
        };

        self.sessions
            .append_history(session_id, Speaker::Bot, &reply)
            .await?;

        Ok(ChatReply {
            session_id,
            reply,
            research: Some(research),
        })
    }

    pub async fn research(&self, client_id: Option<&str>, company: &str) -> Result<ResearchReply> {
        let session_id = self.open_session(client_id).await?;
        self.sessions
            .append_history(
                session_id,
                Speaker::User,
                &format!("Research request: {}", company),
            )
            .await?;

        let research = self.engine.resolve(company).await;
        self.sessions
            .record_research(session_id, research.clone())
            .await?;
        self.sessions
            .append_history(
                session_id,
                Speaker::Bot,
                &format!("Completed research for {} (summary attached)", company),
            )
            .await?;

        let prompt = format!(
            "You are a research assistant. Given the following research JSON, produce:\n1) A 2-sentence summary\n2) One recommended next step\n3) Note if any conflicts exist.\n\nResearch: {}",
            to_json(&research)
        );
        let analysis = self
            .generator
            .generate(&prompt)
            .await
            .into_text_or("LLM unavailable");

        let reply = if research.has_conflicts() {
            format!(
                "I found conflicts for {} in fields: {}. {} Would you like me to dig deeper (simulate deeper search) or proceed using the majority values?",
                company,
                research.conflicting_fields().join(", "),
                analysis
            )
        } else {
            format!(
                "Research complete for {}. {} Ready to generate an account plan.",
                company, analysis
            )
        };

        Ok(ResearchReply {
            session_id,
            reply,
            research,
        })
    }

    pub async fn generate_account_plan(
        &self,
        client_id: Option<&str>,
        company: &str,
        mode: Option<&str>,
    ) -> Result<PlanReply> {
        let session_id = self.open_session(client_id).await?;
        let mode = parse_mode(mode);

        let plan = self.composer.compose(company, mode).await;
        self.sessions
            .store_plan(session_id, company, plan.clone())
            .await?;
        self.sessions
            .append_history(
                session_id,
                Speaker::Bot,
                &format!("Generated {} account plan for {}.", mode, company),
            )
            .await?;

        Ok(PlanReply {
            session_id,
            account_plan: plan,
        })
    }

    /// Write a value into the baseline (known companies only) and into the
    /// session's cached plan (when one exists). Never fails on content.
    pub async fn update(
        &self,
        client_id: Option<&str>,
        company: &str,
        section: &str,
        new_value: serde_json::Value,
    ) -> Result<UpdateReply> {
        let session_id = self.open_session(client_id).await?;

        let baseline_updated = self
            .engine
            .update_baseline(company, section, Value::from_json(&new_value))
            .await;
        let plan_updated = self
            .sessions
            .update_plan_section(session_id, company, section, &new_value)
            .await?;

        info!(
            session_id = %session_id,
            company = %company,
            section = %section,
            baseline_updated,
            plan_updated,
            "Update applied"
        );

        self.sessions
            .append_history(
                session_id,
                Speaker::User,
                &format!("Update request: {} -> {} = {}", company, section, new_value),
            )
            .await?;
        self.sessions
            .append_history(
                session_id,
                Speaker::Bot,
                &format!("Updated {} for {}.", section, company),
            )
            .await?;

        Ok(UpdateReply {
            session_id,
            message: format!("Updated '{}' for {}", section, company),
            updated_value: new_value,
        })
    }
}

fn to_json(record: &ResolvedRecord) -> String {
    serde_json::to_string(record).unwrap_or_default()
}
