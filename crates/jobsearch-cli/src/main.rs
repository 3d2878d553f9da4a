use clap::{Parser, Subcommand};
use jobsearch_core::{DatePosted, SearchFilters};
use jobsearch_gateway::{GatewayServer, RateLimiter};
use jobsearch_retrieval::{
    AdvisorConfig, CacheConfig, DidYouMeanAdvisor, EmbeddingConfig, EmbeddingProvider,
    InMemoryJobCorpus, JobSearchService, LocalEmbedding, PipelineConfig, SearchRequest,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobsearch", about = "Multi-layer job search with graceful fallback")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "jobsearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one search and print the response as JSON
    Search {
        query: String,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        remote_only: bool,
        /// One of 24h, 7d, 30d, all
        #[arg(long)]
        date_posted: Option<DatePosted>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// Skip the semantic layer
        #[arg(long)]
        no_enhanced: bool,
    },
    /// Print did-you-mean suggestions for a query
    Suggest { query: String },
}

#[derive(Deserialize)]
struct JobsearchConfig {
    #[serde(default = "default_corpus_path")]
    corpus_path: PathBuf,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    security: SecurityConfig,
    #[serde(default)]
    search: PipelineConfig,
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    advisor: AdvisorConfig,
    #[serde(default)]
    embedding: EmbeddingConfig,
}

#[derive(Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Deserialize)]
struct SecurityConfig {
    #[serde(default = "default_rps")]
    max_requests_per_second: f64,
    #[serde(default = "default_burst")]
    max_burst: f64,
    #[serde(default = "default_client_idle_secs")]
    client_idle_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: default_rps(),
            max_burst: default_burst(),
            client_idle_secs: default_client_idle_secs(),
        }
    }
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("./data/jobs.jsonl")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_rps() -> f64 {
    10.0
}
fn default_burst() -> f64 {
    50.0
}
fn default_client_idle_secs() -> u64 {
    600
}

fn build_embedder(config: &EmbeddingConfig) -> anyhow::Result<Option<Arc<dyn EmbeddingProvider>>> {
    match config {
        EmbeddingConfig::Local { dimension } => Ok(Some(Arc::new(LocalEmbedding::new(*dimension)))),
        #[cfg(feature = "http-embeddings")]
        EmbeddingConfig::Http {
            base_url,
            model,
            api_key_env,
            dimension,
        } => {
            let api_key = api_key_env.as_deref().and_then(|var| std::env::var(var).ok());
            if api_key_env.is_some() && api_key.is_none() {
                warn!(var = ?api_key_env, "Embedding API key variable is not set");
            }
            Ok(Some(Arc::new(jobsearch_retrieval::HttpEmbedding::new(
                base_url.clone(),
                model.clone(),
                api_key,
                *dimension,
            ))))
        }
        #[cfg(not(feature = "http-embeddings"))]
        EmbeddingConfig::Http { .. } => anyhow::bail!(
            "embedding provider 'http' requires building with the 'http-embeddings' feature"
        ),
        EmbeddingConfig::Disabled => Ok(None),
    }
}

/// Relative corpus paths are resolved against the config file's directory.
fn resolve_corpus_path(config_dir: &Path, corpus_path: &Path) -> PathBuf {
    if corpus_path.is_absolute() {
        corpus_path.to_path_buf()
    } else {
        config_dir.join(corpus_path)
    }
}

async fn build_service(
    config: &JobsearchConfig,
    config_dir: &Path,
) -> anyhow::Result<Arc<JobSearchService>> {
    let embedder = build_embedder(&config.embedding)?;

    let corpus_path = resolve_corpus_path(config_dir, &config.corpus_path);
    let corpus = Arc::new(InMemoryJobCorpus::from_jsonl(&corpus_path, embedder.as_deref()).await?);

    let advisor = DidYouMeanAdvisor::from_corpus(corpus.as_ref(), config.advisor.clone()).await?;
    info!(terms = advisor.dictionary().len(), "Did-you-mean dictionary built");

    let service = JobSearchService::new(
        corpus,
        embedder,
        Arc::new(advisor),
        config.search.clone(),
    )?
    .with_cache(&config.cache);
    Ok(Arc::new(service))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    // Load config
    let config_str = tokio::fs::read_to_string(&cli.config).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to read config file '{}': {}",
            cli.config.display(),
            e
        )
    })?;
    let config: JobsearchConfig = toml::from_str(&config_str)?;

    let config_dir = cli
        .config
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let service = build_service(&config, &config_dir).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            anyhow::ensure!(
                config.security.client_idle_secs > 0,
                "security.client_idle_secs must be greater than zero"
            );
            let rate_limiter = Arc::new(
                RateLimiter::new(
                    config.security.max_burst,
                    config.security.max_requests_per_second,
                )
                .with_idle_expiry(Duration::from_secs(config.security.client_idle_secs)),
            );

            let purge = rate_limiter.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(purge.idle_expiry());
                loop {
                    interval.tick().await;
                    let dropped = purge.purge_idle();
                    if dropped > 0 {
                        debug!(
                            dropped,
                            tracked = purge.tracked_clients(),
                            "Purged idle rate-limit buckets"
                        );
                    }
                }
            });

            let app = GatewayServer::build_with_rate_limit(service, Some(rate_limiter));

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Job search gateway listening on {}", addr);
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        }
        Commands::Search {
            query,
            page,
            limit,
            location,
            remote_only,
            date_posted,
            company,
            title,
            no_enhanced,
        } => {
            let request = SearchRequest {
                query,
                page,
                limit,
                filters: SearchFilters {
                    location,
                    remote_only: remote_only.then_some(true),
                    date_posted,
                    company,
                    title,
                },
                use_enhanced: no_enhanced.then_some(false),
            };
            let response = service.search(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Suggest { query } => {
            let suggestion = service.suggest(&query);
            println!("{}", serde_json::to_string_pretty(&suggestion)?);
        }
    }

    Ok(())
}
