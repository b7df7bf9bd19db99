//! Session state
//!
//! Process-wide, keyed by session id, in memory. Sessions are created on
//! first reference and live until the process exits; there is no eviction.
//! Each call is one short critical section, so concurrent requests for the
//! same session can interleave between calls.

use crate::error::AssistantError;
use crate::models::{
    AccountPlan, HistoryEntry, PersonaTag, ResolvedRecord, Session, SessionId, Speaker,
};
use crate::Result;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Trait for session persistence
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, persona: Option<PersonaTag>) -> Result<SessionId>;
    /// Idempotent create-if-absent. Accepts any id, including client-chosen ones.
    async fn ensure(&self, id: SessionId) -> Result<()>;
    async fn append_history(&self, id: SessionId, speaker: Speaker, text: &str) -> Result<()>;
    async fn get(&self, id: SessionId) -> Result<Session>;
    async fn set_persona(&self, id: SessionId, persona: PersonaTag) -> Result<()>;
    async fn set_active_entity(&self, id: SessionId, entity: &str) -> Result<()>;
    async fn record_research(&self, id: SessionId, record: ResolvedRecord) -> Result<()>;
    async fn store_plan(&self, id: SessionId, entity: &str, plan: AccountPlan) -> Result<()>;
    /// Apply a section update to a cached plan. `Ok(false)` when the session
    /// holds no plan for the entity.
    async fn update_plan_section(
        &self,
        id: SessionId,
        entity: &str,
        section: &str,
        value: &serde_json::Value,
    ) -> Result<bool>;
}

/// In-memory session store. Clones share the same sessions.
#[derive(Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Run `f` against the session, creating it first if needed.
    async fn with_session<T>(&self, id: SessionId, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id)
            .or_insert_with(|| Session::new(id, PersonaTag::Neutral));
        f(session)
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, persona: Option<PersonaTag>) -> Result<SessionId> {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Session::new(id, persona.unwrap_or_default()));
        debug!(session_id = %id, "Session created");
        Ok(id)
    }

    async fn ensure(&self, id: SessionId) -> Result<()> {
        self.with_session(id, |_| ()).await;
        Ok(())
    }

    async fn append_history(&self, id: SessionId, speaker: Speaker, text: &str) -> Result<()> {
        self.with_session(id, |session| {
            session.history.push(HistoryEntry {
                speaker,
                text: text.to_string(),
                timestamp: Utc::now(),
            })
        })
        .await;
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .cloned()
            .ok_or(AssistantError::SessionNotFound(id))
    }

    async fn set_persona(&self, id: SessionId, persona: PersonaTag) -> Result<()> {
        self.with_session(id, |session| session.persona = persona).await;
        Ok(())
    }

    async fn set_active_entity(&self, id: SessionId, entity: &str) -> Result<()> {
        self.with_session(id, |session| session.active_entity = Some(entity.to_string()))
            .await;
        Ok(())
    }

    async fn record_research(&self, id: SessionId, record: ResolvedRecord) -> Result<()> {
        self.with_session(id, |session| {
            session.research_progress.insert(record.entity.clone(), record);
        })
        .await;
        Ok(())
    }

    async fn store_plan(&self, id: SessionId, entity: &str, plan: AccountPlan) -> Result<()> {
        self.with_session(id, |session| {
            session.account_plans.insert(entity.to_string(), plan);
        })
        .await;
        Ok(())
    }

    async fn update_plan_section(
        &self,
        id: SessionId,
        entity: &str,
        section: &str,
        value: &serde_json::Value,
    ) -> Result<bool> {
        let updated = self
            .with_session(id, |session| match session.account_plans.get_mut(entity) {
                Some(plan) => {
                    plan.apply_update(section, value);
                    true
                }
                None => false,
            })
            .await;
        Ok(updated)
    }
}

/// Map a client-supplied identifier onto a session id. Valid UUIDs are
/// used as-is; anything else hashes to a stable UUID so the same string
/// keeps reaching the same session.
pub fn session_id_from_client(raw: &str) -> SessionId {
    let raw = raw.trim();
    Uuid::parse_str(raw).unwrap_or_else(|_| stable_uuid_from_string(raw))
}

fn stable_uuid_from_string(input: &str) -> Uuid {
    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}
