use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::ValueEnum;
use owo_colors::OwoColorize;
use ragctx_cache::TtlClass;
use ragctx_embeddings::FastembedProvider;
use ragctx_pipeline::ContextPipeline;
use ragctx_pipeline::ContextRequest;
use ragctx_pipeline::PipelineConfig;
use ragctx_retrieval::PostgrestConfig;
use ragctx_retrieval::PostgrestStore;
use ragctx_retrieval::SearchMode;
use std::sync::Arc;

#[derive(Debug, Parser)]
pub struct QueryArgs {
    /// Queries to assemble context for, answered in order
    #[arg(value_name = "QUERY", required = true)]
    pub queries: Vec<String>,

    /// Restrict retrieval to one source URL
    #[arg(short, long, value_name = "URL")]
    pub scope: Option<String>,

    /// Number of chunks to keep
    #[arg(short = 'n', long)]
    pub top_k: Option<usize>,

    /// Search strategy (defaults to the configured mode)
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Rerank candidates with a cross-encoder
    #[arg(long)]
    pub rerank: bool,

    /// Cache results with the long-lived TTL class
    #[arg(long)]
    pub indexed: bool,

    /// Skip the semantic cache
    #[arg(long)]
    pub no_cache: bool,

    /// Print the optimized context as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Vector,
    Keyword,
    Hybrid,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Vector => SearchMode::Vector,
            ModeArg::Keyword => SearchMode::Keyword,
            ModeArg::Hybrid => SearchMode::Hybrid,
        }
    }
}

impl QueryArgs {
    fn request(&self, query: &str) -> ContextRequest {
        let mut request = ContextRequest::new(query);
        if let Some(scope) = &self.scope {
            request = request.with_scope(scope.clone());
        }
        if let Some(top_k) = self.top_k {
            request = request.with_top_k(top_k);
        }
        if let Some(mode) = self.mode {
            request = request.with_mode(mode.into());
        }
        if self.indexed {
            request = request.with_ttl_class(TtlClass::Indexed);
        }
        if self.no_cache {
            request = request.without_cache();
        }
        request
    }
}

pub(crate) async fn run_query(args: QueryArgs, mut config: PipelineConfig) -> Result<()> {
    config.rerank.enabled |= args.rerank;

    let store = PostgrestStore::new(
        PostgrestConfig::from_env().context("Document store is not configured")?,
    )
    .context("Failed to create document store client")?;
    let embedder = FastembedProvider::with_config(config.embedding.clone())
        .await
        .context("Failed to load embedding model")?;

    let pipeline = ContextPipeline::new(config, Arc::new(store), Arc::new(embedder))
        .await
        .context("Failed to build context pipeline")?;

    for query in &args.queries {
        let context = pipeline.assemble(&args.request(query)).await;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&context)?);
            continue;
        }

        if context.is_empty() {
            println!("{} No context found for {}", "✗".bright_red(), query.bright_cyan());
            continue;
        }

        println!(
            "{} {} chunks, {} tokens ({:.1}% reduction) for {}\n",
            "✓".bright_green(),
            context.optimized_chunks.to_string().bright_cyan(),
            context.optimized_tokens.to_string().bright_cyan(),
            context.compression_ratio,
            query.bright_cyan()
        );
        println!("{}\n", context.content);
    }

    if pipeline.cache().is_enabled() && !args.json {
        let stats = pipeline.cache().stats();
        println!(
            "{} Cache: {} hits, {} misses, {} entries",
            "⚡".bright_yellow(),
            stats.hits,
            stats.misses,
            stats.size
        );
    }

    Ok(())
}
