//! Text generator trait and implementations
//!
//! Generators never fail the caller: every outcome is either generated
//! text or a failure reason the caller turns into placeholder text.

use crate::config::AssistantConfig;
use crate::gemini::GeminiClient;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated(String),
    Failed(String),
}

impl GenerationOutcome {
    /// Generated text, or `"(<marker>: <reason>)"` on failure.
    pub fn into_text_or(self, marker: &str) -> String {
        match self {
            GenerationOutcome::Generated(text) => text,
            GenerationOutcome::Failed(reason) => {
                warn!("{}: {}", marker, reason);
                format!("({}: {})", marker, reason)
            }
        }
    }
}

/// Trait for prompt → text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str) -> GenerationOutcome;
}

const MOCK_TEMPLATES: &[&str] = &[
    "Analyzing the request... Here are 3 concise bullets:",
    "Thinking step-by-step: summary and suggestion below:",
    "Simulated research synthesis:",
    "Mock assistant: here's a short summary and an outreach line:",
];

const MOCK_PROMPT_CLIP: usize = 400;
const MOCK_ECHO_CHARS: usize = 120;

/// Offline generator for demos and tests.
/// Output depends only on the prompt.
pub struct MockGenerator;

impl MockGenerator {
    pub fn render(prompt: &str) -> String {
        let digest = Sha256::digest(prompt.as_bytes());
        let template = MOCK_TEMPLATES[digest[0] as usize % MOCK_TEMPLATES.len()];

        let snippet: String = if prompt.chars().count() > MOCK_PROMPT_CLIP {
            let mut clipped: String = prompt.chars().take(MOCK_PROMPT_CLIP).collect();
            clipped.push_str("...");
            clipped
        } else {
            prompt.to_string()
        };
        let echo: String = snippet
            .chars()
            .take(MOCK_ECHO_CHARS)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();

        let mut body = String::new();
        body.push_str(template);
        body.push_str("\n\n");
        body.push_str(&format!("- {}\n", echo));
        body.push_str("- Suggestion: Validate key facts and schedule discovery call.\n");
        body.push_str(
            "- Outreach: Hi {contact}, we have a short idea to discuss. Can we book 20 minutes?\n",
        );
        body
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, prompt: &str) -> GenerationOutcome {
        GenerationOutcome::Generated(Self::render(prompt))
    }
}

/// Gemini-backed generator. Missing credentials and upstream errors come
/// back as `Failed`.
pub struct GeminiGenerator {
    client: Option<GeminiClient>,
    unavailable_reason: String,
}

impl GeminiGenerator {
    pub fn from_config(config: &AssistantConfig) -> Self {
        let Some(api_key) = config.gemini_api_key.clone() else {
            return Self {
                client: None,
                unavailable_reason: "GEMINI_API_KEY not set".to_string(),
            };
        };

        match GeminiClient::new(api_key, &config.gemini_model, config.llm_timeout) {
            Ok(client) => Self {
                client: Some(client),
                unavailable_reason: String::new(),
            },
            Err(e) => {
                warn!("Gemini client could not be built: {}", e);
                Self {
                    client: None,
                    unavailable_reason: format!("Gemini client missing: {}", e),
                }
            }
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> GenerationOutcome {
        let Some(client) = &self.client else {
            return GenerationOutcome::Failed(self.unavailable_reason.clone());
        };

        match client.generate(prompt).await {
            Ok(text) => GenerationOutcome::Generated(text),
            Err(e) => {
                warn!("Gemini generation failed: {}", e);
                GenerationOutcome::Failed(format!("Gemini call failed: {}", e))
            }
        }
    }
}

/// Pick the generator the configuration asks for.
pub fn create_generator(config: &AssistantConfig) -> Arc<dyn TextGenerator> {
    let generator: Arc<dyn TextGenerator> = if config.use_real_llm {
        Arc::new(GeminiGenerator::from_config(config))
    } else {
        Arc::new(MockGenerator)
    };

    info!(generator = generator.name(), "Text generator selected");
    generator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let first = MockGenerator.generate("Explain Tesla's competitive position.").await;
        let second = MockGenerator.generate("Explain Tesla's competitive position.").await;
        assert_eq!(first, second);
        assert!(matches!(first, GenerationOutcome::Generated(_)));
    }

    #[test]
    fn test_mock_clips_and_flattens_prompt() {
        let prompt = format!("line one\nline two {}", "x".repeat(500));
        let text = MockGenerator::render(&prompt);

        let echo_line = text.lines().nth(2).unwrap();
        assert!(echo_line.starts_with("- line one line two"));
        assert_eq!(echo_line.chars().count(), 2 + MOCK_ECHO_CHARS);
        assert!(text.contains("- Outreach:"));
        assert!(MOCK_TEMPLATES.iter().any(|t| text.starts_with(t)));
    }

    #[test]
    fn test_failure_renders_parenthesised_marker() {
        let text = GenerationOutcome::Failed("GEMINI_API_KEY not set".into())
            .into_text_or("LLM unavailable");
        assert_eq!(text, "(LLM unavailable: GEMINI_API_KEY not set)");

        let text = GenerationOutcome::Generated("- bullet".into()).into_text_or("LLM unavailable");
        assert_eq!(text, "- bullet");
    }

    #[tokio::test]
    async fn test_real_generator_without_key_fails_softly() {
        let config = AssistantConfig {
            use_real_llm: true,
            ..AssistantConfig::default()
        };
        let generator = create_generator(&config);
        assert_eq!(generator.name(), "gemini");

        let outcome = generator.generate("hello").await;
        assert_eq!(outcome, GenerationOutcome::Failed("GEMINI_API_KEY not set".into()));
    }

    #[test]
    fn test_default_config_uses_mock() {
        assert_eq!(create_generator(&AssistantConfig::default()).name(), "mock");
    }
}
