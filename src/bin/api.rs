use company_research_assistant::{
    agent::Assistant,
    api::start_server,
    config::AssistantConfig,
    generator::create_generator,
    research::{create_default_registry, default_baseline, ResolutionEngine},
    state::InMemorySessionStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AssistantConfig::from_env()?;
    if config.use_real_llm && config.gemini_api_key.is_none() {
        eprintln!("⚠️  USE_REAL_LLM is set but GEMINI_API_KEY is missing");
        eprintln!("📌 See .env.example for setup instructions");
    }

    info!("🚀 Company Research Assistant - API Server");
    info!("📍 Port: {}", config.port);

    // Create components
    let engine = Arc::new(ResolutionEngine::new(
        create_default_registry()?,
        default_baseline(),
    ));
    let generator = create_generator(&config);
    let sessions = Box::new(InMemorySessionStore::new());

    let assistant = Arc::new(Assistant::new(engine, generator, sessions));

    info!("✅ Assistant initialized");
    info!("📡 Starting API server...");

    start_server(assistant, config.port).await?;

    Ok(())
}
