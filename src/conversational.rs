//! Small-talk replies
//!
//! Used when a chat message does not lead to research. Canned replies per
//! persona; neutral users get a generated onboarding paragraph.

use crate::generator::{GenerationOutcome, TextGenerator};
use crate::models::PersonaTag;
use tracing::warn;

const CONFUSED_REPLY: &str =
    "No worries, let's take it step by step. Who or which company should we research first?";

const EFFICIENT_REPLY: &str = "Short answer: I can research companies and generate a concise account plan. Tell me the company name.";

const CHATTY_REPLY: &str =
    "Love the energy! Tell me more, then I can dig into the company you want.";

/// Reply for a message that did not trigger research.
pub async fn small_talk_reply(
    persona: PersonaTag,
    message: &str,
    generator: &dyn TextGenerator,
) -> String {
    match persona {
        PersonaTag::Confused => CONFUSED_REPLY.to_string(),
        PersonaTag::Efficient => EFFICIENT_REPLY.to_string(),
        PersonaTag::Chatty => CHATTY_REPLY.to_string(),
        PersonaTag::Neutral => onboarding_reply(message, generator).await,
    }
}

async fn onboarding_reply(message: &str, generator: &dyn TextGenerator) -> String {
    let prompt = format!(
        "User said: '{}'. Provide a friendly onboarding reply telling them how to ask for company research in one short paragraph.",
        message
    );

    match generator.generate(&prompt).await {
        GenerationOutcome::Generated(text) => text,
        GenerationOutcome::Failed(reason) => {
            warn!("Onboarding generation failed: {}", reason);
            format!(
                "I received: '{}'. I can research companies, generate account plans, and keep track of our conversation. Try asking me to research a company (e.g. 'Research Google').",
                message
            )
        }
    }
}
