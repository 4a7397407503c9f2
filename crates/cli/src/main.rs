use anyhow::{Context, Result};
use cache::{generate_analysis_hash, AnalysisCache, AnalysisKey, CacheConfig};
use clap::{Parser, Subcommand};
use common::{init_logging, LoggingConfig};
use embeddings::{EmbeddingsClient, EmbeddingsConfig};
use llm::{CompletionRequest, LlmConfig, LlmProvider, ProviderFactory, ProviderKind};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const ANALYSIS_SYSTEM_PROMPT: &str = "You are an infrastructure architecture reviewer. \
Examine the provided architecture description and respond with a single JSON object \
containing `summary` (string), `findings` (array of strings) and `risk_score` (0-100).";

#[derive(Parser)]
#[command(name = "archlens")]
#[command(about = "Architecture analysis over pluggable LLM providers")]
#[command(version)]
struct Cli {
    /// Emit logs as one JSON object per line
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze architecture files for a component, caching by content hash
    Analyze {
        /// Files to analyze (IaC, manifests, diagram exports)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Application the component belongs to
        #[arg(long)]
        app_id: String,

        /// Component name within the application
        #[arg(long)]
        component: String,

        #[arg(long, default_value = "prod")]
        environment: String,

        /// Component version the analysis applies to
        #[arg(long, default_value = "0.0.0")]
        version: String,
    },
    /// Embed texts with the configured embeddings provider
    Embed {
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// List every known provider and whether it is configured
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig {
        json: cli.json_logs,
        ..Default::default()
    });

    match cli.command {
        Commands::Analyze {
            files,
            app_id,
            component,
            environment,
            version,
        } => {
            let key = AnalysisKey::new(&app_id, &component, &environment, &version);
            analyze(&files, &key).await?;
        }
        Commands::Embed { texts } => embed(&texts).await?,
        Commands::Providers => list_providers().await,
    }

    Ok(())
}

async fn analyze(files: &[PathBuf], key: &AnalysisKey) -> Result<()> {
    let config = LlmConfig::from_env()?;
    let provider = ProviderFactory::create(&config)?;
    info!(provider = %provider.id(), "analyzing {} file(s)", files.len());

    let cache = Arc::new(AnalysisCache::new(CacheConfig::default()));
    let sweeper = AnalysisCache::spawn_sweeper(Arc::clone(&cache));

    for file in files {
        let content = std::fs::read(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let hash = generate_analysis_hash(&content, key);

        let analysis = match cache.get(&hash) {
            Some(cached) => {
                info!(file = %file.display(), "analysis served from cache");
                cached
            }
            None => {
                let prompt = format!(
                    "Component `{}` of application `{}` ({} environment, version {}).\n\
                     Architecture description:\n\n{}",
                    key.component_name,
                    key.app_id,
                    key.environment,
                    key.version,
                    String::from_utf8_lossy(&content),
                );
                let request = CompletionRequest::new(&prompt)
                    .with_system_prompt(ANALYSIS_SYSTEM_PROMPT)
                    .with_parameters(Some(config.max_tokens), Some(config.temperature));

                let response = provider.complete(request).await?;
                info!(
                    model = %response.model,
                    tokens = response.usage.total_tokens,
                    elapsed_ms = response.elapsed.as_millis() as u64,
                    "analysis completed"
                );

                // Models sometimes wrap or skip the JSON shape they were
                // asked for; fall back to the raw text so nothing is lost.
                let analysis = serde_json::from_str(&response.content)
                    .unwrap_or_else(|_| json!({ "analysis": response.content }));
                cache.insert(&hash, analysis.clone());
                analysis
            }
        };

        println!("{}", serde_json::to_string_pretty(&json!({
            "file": file.display().to_string(),
            "hash": hash,
            "analysis": analysis,
        }))?);
    }

    let stats = cache.stats();
    info!(hits = stats.hits, misses = stats.misses, "cache statistics");
    sweeper.abort();
    Ok(())
}

async fn embed(texts: &[String]) -> Result<()> {
    let config = EmbeddingsConfig::from_env()?;
    let client = EmbeddingsClient::new(&config)?;
    info!(provider = %config.provider, model = %config.model_name(), "embedding {} text(s)", texts.len());

    let vectors = client.embed_batch(texts).await?;
    for (text, vector) in texts.iter().zip(&vectors) {
        println!("{}", serde_json::to_string(&json!({
            "text": text,
            "dimensions": vector.len(),
            "embedding": vector,
        }))?);
    }
    Ok(())
}

async fn list_providers() {
    for kind in ProviderKind::all() {
        let config = LlmConfig::for_provider(*kind);
        match ProviderFactory::create(&config) {
            Ok(client) => {
                let status = if client.is_available() {
                    "available"
                } else {
                    "not configured"
                };
                println!("{:<12} {:<28} {}", kind.as_str(), config.model_name(), status);
            }
            Err(e) => {
                warn!(provider = %kind, error = %e, "failed to construct provider");
                println!("{:<12} {:<28} error: {e}", kind.as_str(), "-");
            }
        }
    }
}
