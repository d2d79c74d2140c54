use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use config::FileConfig;
use doctree_core::{validate_tree, DocumentTreeBuilder, TreeConfig};
use doctree_inference::{service_from_env, InferenceMode};
use doctree_splitter::{
    DocumentScanner, HeuristicTokenCounter, HfTokenCounter, LocalDocument, SplitterConfig,
    TextSplitter, TokenCounter,
};
use doctree_store::{JsonFileStore, StorageBackend};
use flags::InferenceModeFlag;
use output::{print_json, BatchBuildOutput, BuildOutput, InspectOutput, ListOutput, SplitOutput};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

mod config;
mod flags;
mod output;

#[derive(Parser)]
#[command(name = "doctree")]
#[command(about = "Build hierarchical summary trees from documents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// TOML file with [tree] and [splitter] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override inference backend (defaults to DOCTREE_INFERENCE_MODE)
    #[arg(long, global = true, value_enum)]
    inference_mode: Option<InferenceModeFlag>,

    /// Directory of stored document trees
    #[arg(long, global = true, default_value = ".doctree/trees")]
    store_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into chunks without building a tree
    Split(SplitArgs),

    /// Split a file (or every matching file in a directory), build its tree and store it
    Build(BuildArgs),

    /// Load a stored tree and check its structure
    Inspect(InspectArgs),

    /// List stored documents
    List,
}

#[derive(Args)]
struct ChunkingArgs {
    /// Maximum tokens per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Tokens shared by consecutive chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// HuggingFace tokenizer.json used for token counts
    #[arg(long)]
    tokenizer: Option<PathBuf>,
}

#[derive(Args)]
struct SplitArgs {
    /// Document to split
    file: PathBuf,

    #[command(flatten)]
    chunking: ChunkingArgs,
}

#[derive(Args)]
struct BuildArgs {
    /// Document, or directory of documents, to build trees for
    path: PathBuf,

    /// With a directory: only files with these extensions (comma separated)
    #[arg(long = "ext", value_delimiter = ',')]
    extensions: Vec<String>,

    /// With a directory: skip this subdirectory (repeatable)
    #[arg(long = "exclude")]
    excluded: Vec<PathBuf>,

    #[command(flatten)]
    chunking: ChunkingArgs,

    /// Fold chunks upward through summaries (default: flat tree)
    #[arg(long)]
    summary: bool,

    /// Extract this many keywords per node
    #[arg(long)]
    keywords: Option<usize>,

    /// Token budget per fold branch
    #[arg(long)]
    branch_budget: Option<usize>,

    /// Concurrent inference calls
    #[arg(long)]
    pool_size: Option<usize>,

    /// Embedding dimension
    #[arg(long)]
    dimensions: Option<usize>,

    /// Texts per embedding request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Request sparse lexical weights with embeddings
    #[arg(long)]
    sparse: bool,

    /// Document id (defaults to the SHA-256 of the file; single files only)
    #[arg(long)]
    document_id: Option<String>,

    /// Build without storing the tree
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// Id of a stored document
    document_id: String,

    /// Include every node in the output
    #[arg(long)]
    nodes: bool,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let file_config = FileConfig::load(cli.config.as_deref()).await?;
    let mode = cli.inference_mode.map(InferenceModeFlag::as_domain);

    match cli.command {
        Commands::Split(args) => run_split(args, file_config.splitter).await?,
        Commands::Build(args) => run_build(args, file_config, mode, &cli.store_dir).await?,
        Commands::Inspect(args) => run_inspect(args, &cli.store_dir).await?,
        Commands::List => run_list(&cli.store_dir).await?,
    }

    Ok(())
}

fn splitter_for(args: &ChunkingArgs, mut config: SplitterConfig) -> Result<TextSplitter> {
    if let Some(size) = args.chunk_size {
        config.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        config.chunk_overlap = overlap;
    }
    TextSplitter::new(config, token_counter(args.tokenizer.as_deref())?)
        .context("Invalid splitter configuration")
}

fn token_counter(tokenizer: Option<&Path>) -> Result<Arc<dyn TokenCounter>> {
    match tokenizer {
        Some(path) => {
            let counter = HfTokenCounter::from_file(path)
                .with_context(|| format!("Failed to load tokenizer {}", path.display()))?;
            Ok(Arc::new(counter))
        }
        None => Ok(Arc::new(HeuristicTokenCounter)),
    }
}

async fn load_document(path: &Path) -> Result<LocalDocument> {
    LocalDocument::load(path)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))
}

async fn run_split(args: SplitArgs, splitter_config: SplitterConfig) -> Result<()> {
    let splitter = splitter_for(&args.chunking, splitter_config)?;
    let document = load_document(&args.file).await?;
    let chunks = splitter.split(&document.content);

    print_json(&SplitOutput {
        document_id: document.checksum,
        document_name: document.name,
        document_type: document.document_type,
        chunk_count: chunks.len(),
        chunks,
    })
}

fn tree_config_for(args: &BuildArgs, mut config: TreeConfig) -> Result<TreeConfig> {
    if args.summary {
        config.get_summary = true;
    }
    if let Some(keywords) = args.keywords {
        config.get_keywords = true;
        config.num_keywords = keywords;
    }
    if let Some(budget) = args.branch_budget {
        config.branch_token_budget = budget;
    }
    if let Some(pool_size) = args.pool_size {
        config.pool_size = pool_size;
    }
    if let Some(dimensions) = args.dimensions {
        config.embedding_dimensions = dimensions;
    }
    if let Some(batch_size) = args.batch_size {
        config.embedding_batch_size = batch_size;
    }
    if args.sparse {
        config.sparse_embeddings = true;
    }
    config.validate().context("Invalid tree configuration")?;
    Ok(config)
}

async fn run_build(
    args: BuildArgs,
    file_config: FileConfig,
    mode: Option<InferenceMode>,
    store_dir: &Path,
) -> Result<()> {
    let started = Instant::now();
    let tree_config = tree_config_for(&args, file_config.tree)?;
    let splitter = splitter_for(&args.chunking, file_config.splitter)?;
    let counter = token_counter(args.chunking.tokenizer.as_deref())?;

    let is_dir = tokio::fs::metadata(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?
        .is_dir();
    let files = if is_dir {
        if args.document_id.is_some() {
            bail!("--document-id applies to a single file, not a directory");
        }
        let scanner = DocumentScanner::new(&args.path)
            .with_extensions(&args.extensions)
            .excluding(&args.excluded);
        let files = tokio::task::spawn_blocking(move || scanner.scan()).await?;
        if files.is_empty() {
            bail!("No documents found under {}", args.path.display());
        }
        files
    } else {
        vec![args.path.clone()]
    };

    let mode = match mode {
        Some(mode) => mode,
        None => InferenceMode::from_env()?,
    };
    let service = service_from_env(Some(mode), tree_config.embedding_dimensions)
        .context("Failed to initialize inference backend")?;
    let builder = DocumentTreeBuilder::new(tree_config, service, counter)?;
    let store = (!args.dry_run).then(|| JsonFileStore::new(store_dir));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling tree build");
            on_interrupt.cancel();
        }
    });
    let built = async {
        let mut outputs = Vec::with_capacity(files.len());
        for file in &files {
            let job = BuildJob {
                path: file,
                document_id: args.document_id.clone(),
                mode,
                splitter: &splitter,
                builder: &builder,
                store: store.as_ref(),
                cancel: &cancel,
            };
            outputs.push(job.run().await?);
        }
        Ok::<_, anyhow::Error>(outputs)
    }
    .await;
    interrupt.abort();
    let mut outputs = built?;

    if is_dir {
        print_json(&BatchBuildOutput {
            root: args.path.display().to_string(),
            document_count: outputs.len(),
            documents: outputs,
            elapsed_ms: started.elapsed().as_millis(),
        })
    } else {
        let output = outputs.pop().context("Nothing was built")?;
        print_json(&output)
    }
}

/// One document of a `build` invocation.
struct BuildJob<'a> {
    path: &'a Path,
    document_id: Option<String>,
    mode: InferenceMode,
    splitter: &'a TextSplitter,
    builder: &'a DocumentTreeBuilder,
    store: Option<&'a JsonFileStore>,
    cancel: &'a CancellationToken,
}

impl BuildJob<'_> {
    async fn run(self) -> Result<BuildOutput> {
        let started = Instant::now();
        let document = load_document(self.path).await?;
        let document_id = self
            .document_id
            .unwrap_or_else(|| document.checksum.clone());
        let chunks = self.splitter.split(&document.content);
        log::info!(
            "Split {} into {} chunks",
            document.path.display(),
            chunks.len()
        );

        let nodes = self
            .builder
            .build_with_cancel(&document.name, &document_id, &chunks, self.cancel)
            .await
            .with_context(|| format!("Failed to build tree for {}", document.name))?;

        // A rebuild carries fresh guids, so the stored tree is swapped whole.
        let stored_at = match self.store {
            Some(store) => {
                store.replace_document(&nodes).await.with_context(|| {
                    format!("Failed to store tree in {}", store.root().display())
                })?;
                Some(store.document_path(&document_id).display().to_string())
            }
            None => None,
        };

        let report = validate_tree(&nodes);
        let root = nodes.first().context("Built tree has no root")?;
        Ok(BuildOutput {
            document_name: document.name.clone(),
            document_type: document.document_type.clone(),
            inference_mode: self.mode.id(),
            chunk_count: chunks.len(),
            node_count: report.node_count,
            depth: report.depth,
            tier_sizes: report.tier_sizes,
            root_summary: root.summary.clone(),
            root_keywords: root.keywords.clone(),
            stored_at,
            elapsed_ms: started.elapsed().as_millis(),
            document_id,
        })
    }
}

async fn run_inspect(args: InspectArgs, store_dir: &Path) -> Result<()> {
    let store = JsonFileStore::new(store_dir);
    let document = store
        .load_document(&args.document_id)
        .await
        .with_context(|| format!("Failed to load document {}", args.document_id))?;

    let report = validate_tree(&document.nodes);
    if !report.is_valid() {
        log::warn!(
            "Stored tree {} has {} structural issues",
            document.document_id,
            report.issues.len()
        );
    }
    let (root_summary, root_keywords) = document
        .root()
        .map(|root| (root.summary.clone(), root.keywords.clone()))
        .unwrap_or_default();

    print_json(&InspectOutput {
        document_id: document.document_id,
        document_name: document.document_name,
        report,
        root_summary,
        root_keywords,
        nodes: args.nodes.then_some(document.nodes),
    })
}

async fn run_list(store_dir: &Path) -> Result<()> {
    let store = JsonFileStore::new(store_dir);
    let documents = store
        .list_documents()
        .await
        .with_context(|| format!("Failed to list {}", store_dir.display()))?;
    print_json(&ListOutput { documents })
}
