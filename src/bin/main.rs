use clap::{Parser, ValueEnum};
use company_research_assistant::{
    config::AssistantConfig,
    generator::create_generator,
    models::PlanMode,
    planner::PlanComposer,
    research::{create_default_registry, default_baseline, ResolutionEngine},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Offline demo: resolve a company across the demo sources and compose an
/// account plan for it.
#[derive(Parser, Debug)]
#[command(name = "research", version)]
struct Cli {
    /// Company to research
    #[arg(default_value = "Google")]
    company: String,

    /// Plan verbosity
    #[arg(value_enum, default_value_t = ModeArg::Concise)]
    mode: ModeArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ModeArg {
    Concise,
    Detailed,
}

impl From<ModeArg> for PlanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Concise => PlanMode::Concise,
            ModeArg::Detailed => PlanMode::Detailed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let company = cli.company;
    let mode = PlanMode::from(cli.mode);

    let config = AssistantConfig::from_env()?;
    let engine = Arc::new(ResolutionEngine::new(
        create_default_registry()?,
        default_baseline(),
    ));
    let composer = PlanComposer::new(Arc::clone(&engine), create_generator(&config));

    info!(company = %company, mode = %mode, "Running research demo");

    let research = engine.resolve(&company).await;
    println!("\n=== RESEARCH ===");
    println!("Sources: {}", research.sources_used.join(", "));
    for (field, value) in &research.resolved {
        println!("  {}: {}", field, value);
    }
    if research.has_conflicts() {
        println!("\nConflicts:");
        for (field, candidates) in &research.conflicts {
            let rendered: Vec<String> = candidates.iter().map(|v| v.to_string()).collect();
            println!("  {}: {}", field, rendered.join(" | "));
        }
    }

    let plan = composer.compose(&company, mode).await;
    println!("\n=== ACCOUNT PLAN ({}) ===", mode);
    println!("{}", serde_json::to_string_pretty(&plan)?);

    Ok(())
}
