use anyhow::{anyhow, Result};
use biaslens::clustering::{ClusterBuilder, ClusteringConfig};
use biaslens::db::Database;
use biaslens::environment::{get_env_var_or, get_env_var_parsed};
use biaslens::llm::{LlmAdapter, LlmCapability, LlmConfig};
use biaslens::logging::configure_logging;
use biaslens::vector::{EmbeddingConfig, EmbeddingService};
use biaslens::TARGET_CLUSTER;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use prettytable::{Cell, Row as PrettyRow, Table};
use serde_json::json;
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

#[derive(Parser)]
#[clap(name = "biaslens", about = "Cluster news coverage and measure its spread across the political spectrum")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run clustering once over the most recent articles
    Run,

    /// Run clustering on a fixed interval until interrupted
    Schedule {
        /// Minutes between runs (defaults to CLUSTER_INTERVAL_MINS or 30)
        #[clap(short, long)]
        interval_mins: Option<u64>,
    },

    /// List the most recent clusters
    List {
        /// Number of clusters to show
        #[clap(short, long, default_value = "20")]
        limit: i64,

        /// Number of clusters to skip
        #[clap(short, long, default_value = "0")]
        offset: i64,
    },

    /// Show a cluster with its articles and bias distribution
    Show {
        /// Cluster ID
        #[clap(required = true)]
        id: i64,
    },

    /// Ask the configured language model to assess an article's bias
    Analyze {
        /// Article ID
        #[clap(required = true)]
        id: i64,

        /// Also extract factual claims and entities
        #[clap(short, long)]
        facts: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let args = Cli::parse();

    let database_path = get_env_var_or("DATABASE_PATH", "biaslens.db");
    let db = Database::new(&database_path).await?;

    let result = match args.command {
        Commands::Run => run_once(&db).await,
        Commands::Schedule { interval_mins } => {
            let minutes = interval_mins
                .unwrap_or_else(|| get_env_var_parsed("CLUSTER_INTERVAL_MINS", 30u64))
                .max(1);
            schedule(&db, minutes).await
        }
        Commands::List { limit, offset } => list_clusters(&db, limit, offset).await,
        Commands::Show { id } => show_cluster(&db, id).await,
        Commands::Analyze { id, facts } => analyze_article(&db, id, facts).await,
    };

    db.close().await;
    result
}

/// Builds the cluster builder, loading the embedding model when semantic refinement is on
async fn cluster_builder(db: &Database) -> ClusterBuilder<Database, EmbeddingService> {
    let config = ClusteringConfig::from_env();
    info!(target: TARGET_CLUSTER,
        "Clustering config: min size {}, window {}, refinement {:?}",
        config.min_cluster_size, config.window_size, config.refinement
    );

    let embeddings = if config.refinement.is_semantic() {
        let embedding_config = EmbeddingConfig {
            model_name: config.embedding_model.clone(),
            ..EmbeddingConfig::from_env()
        };
        let mut service = EmbeddingService::new(embedding_config, db.clone());
        match service.init().await {
            Ok(()) => Some(service),
            Err(e) => {
                warn!(target: TARGET_CLUSTER, "Embedding model unavailable, clusters will not be refined: {:?}", e);
                None
            }
        }
    } else {
        None
    };

    ClusterBuilder::new(db.clone(), embeddings, config)
}

fn shutdown(builder: ClusterBuilder<Database, EmbeddingService>) {
    if let Some(mut embeddings) = builder.into_embeddings() {
        embeddings.close();
    }
}

async fn run_once(db: &Database) -> Result<()> {
    let builder = cluster_builder(db).await;
    let result = builder.run_clustering().await;
    shutdown(builder);

    let summary = result?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Runs are awaited inside the loop, so two runs never overlap in one process
async fn schedule(db: &Database, minutes: u64) -> Result<()> {
    let builder = cluster_builder(db).await;
    let mut ticker = interval(Duration::from_secs(minutes * 60));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(target: TARGET_CLUSTER, "Scheduling clustering every {} minutes", minutes);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match builder.run_clustering().await {
                    Ok(summary) => info!(target: TARGET_CLUSTER,
                        "Scheduled run: {} articles processed, {} clusters created",
                        summary.articles_processed, summary.clusters_created
                    ),
                    Err(e) => error!(target: TARGET_CLUSTER, "Scheduled clustering run failed: {:?}", e),
                }
            }
            _ = signal::ctrl_c() => {
                info!(target: TARGET_CLUSTER, "Received Ctrl-C, stopping scheduler");
                break;
            }
        }
    }

    shutdown(builder);
    Ok(())
}

async fn list_clusters(db: &Database, limit: i64, offset: i64) -> Result<()> {
    let clusters = db.list_clusters(limit, offset).await?;
    if clusters.is_empty() {
        println!("No clusters found");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![
        Cell::new("ID"),
        Cell::new("Created"),
        Cell::new("Articles"),
        Cell::new("Confidence"),
        Cell::new("Title"),
    ]));

    for cluster in clusters {
        let created = DateTime::parse_from_rfc3339(&cluster.created_at)
            .map(|dt| {
                dt.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or(cluster.created_at);

        table.add_row(PrettyRow::new(vec![
            Cell::new(&cluster.id.to_string()),
            Cell::new(&created),
            Cell::new(&cluster.article_count.to_string()),
            Cell::new(&format!("{:.2}", cluster.confidence_score)),
            Cell::new(&cluster.title),
        ]));
    }

    table.printstd();
    Ok(())
}

async fn show_cluster(db: &Database, id: i64) -> Result<()> {
    let detail = db
        .get_cluster_detail(id)
        .await?
        .ok_or_else(|| anyhow!("Cluster {} not found", id))?;

    println!("{}", serde_json::to_string_pretty(&detail)?);
    Ok(())
}

async fn analyze_article(db: &Database, id: i64, with_facts: bool) -> Result<()> {
    let llm_config = LlmConfig::from_env()?;
    let adapter = LlmAdapter::from_config(&llm_config)
        .ok_or_else(|| anyhow!("No LLM adapter configured, set LLM_ADAPTER to ollama, openai or lmstudio"))?;

    let article = db
        .get_article(id)
        .await?
        .ok_or_else(|| anyhow!("Article {} not found", id))?;

    let body = article
        .content
        .as_deref()
        .or(article.excerpt.as_deref())
        .unwrap_or("");
    let text = format!(
        "Title: {}\nSource: {}\n{}",
        article.title, article.source_name, body
    );

    let assessment = adapter.detect_bias(text.trim()).await?;
    let facts = if with_facts {
        Some(adapter.extract_facts(text.trim()).await?)
    } else {
        None
    };

    let report = json!({
        "article_id": article.id,
        "title": article.title,
        "source": article.source_name,
        "source_bias": article.source_bias,
        "assessed_bias": assessment.label(),
        "assessment": assessment,
        "facts": facts,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
