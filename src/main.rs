use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use graphprep::edges::EdgeDictionary;
use graphprep::entity::EntityDictionary;
use graphprep::fetch::{fetch_dataset, FetchOptions, FetchOutcome};
use graphprep::karate::load_karate;
use graphprep::reindex::run_reindex;
use graphprep::triples::read_triples;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "graphprep")]
#[command(about = "Prepare graph-learning example datasets")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and extract the DRKG dataset archive
    Fetch(FetchArgs),
    /// Build entity and edge dictionaries from a triple TSV and emit edge lists
    IndexTriples(IndexTriplesArgs),
    /// Re-index the small citation dataset into dense integer ids
    Reindex(ReindexArgs),
    /// Load the labeled karate-club graph and print a summary
    Karate(KarateArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Data directory for the archive and extracted files
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Archive URL
    #[arg(long, default_value = graphprep::config::DRKG_URL)]
    url: String,

    /// Maximum download-and-unpack attempts
    #[arg(long, default_value_t = graphprep::config::DOWNLOAD_MAX_RETRIES)]
    max_retries: u32,
}

#[derive(Args)]
struct IndexTriplesArgs {
    /// Path to the triple TSV file (subject, predicate, object)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for edge lists and the entity dictionary
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct ReindexArgs {
    /// Directory containing the raw citation CSV tables
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory (recreated each run)
    #[arg(short, long, default_value = "processed")]
    output: PathBuf,
}

#[derive(Args)]
struct KarateArgs {
    /// Path to the node table (Id, Club columns)
    #[arg(long, default_value = "data/nodes.csv")]
    nodes: PathBuf,

    /// Path to the edge table (Src, Dst columns)
    #[arg(long, default_value = "data/edges.csv")]
    edges: PathBuf,
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    let mut opts = FetchOptions::new(args.data_dir);
    opts.url = args.url;
    opts.max_retries = args.max_retries;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("graphprep-fetch-worker")
        .enable_io()
        .enable_time()
        .build()?;

    let start = Instant::now();
    let outcome = rt.block_on(fetch_dataset(&opts))?;

    match outcome {
        FetchOutcome::AlreadyPresent => println!("Dataset already present, nothing to do."),
        FetchOutcome::Extracted => {
            println!("Dataset ready in {:.2}s", start.elapsed().as_secs_f64())
        }
    }
    Ok(())
}

fn run_index_triples(args: IndexTriplesArgs) -> Result<()> {
    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory: {:?}", args.output))?;

    let start_reading = Instant::now();
    let triples = read_triples(&args.input)?;
    let reading_duration = start_reading.elapsed();

    let start_indexing = Instant::now();
    let entities = EntityDictionary::build(&triples)?;
    let edges = EdgeDictionary::build(&triples, &entities)?;
    let indexing_duration = start_indexing.elapsed();
    info!(
        duration_secs = indexing_duration.as_secs_f64(),
        "Indexing complete"
    );

    entities.write_json(&args.output.join("entity_dictionary.json"))?;
    let written = edges.write_edge_lists(&args.output)?;

    println!();
    println!("=== Summary ===");
    println!("Reading time:   {:.2}s", reading_duration.as_secs_f64());
    println!("Indexing time:  {:.2}s", indexing_duration.as_secs_f64());
    println!();
    println!("Triples read:   {}", triples.len());
    println!("Entity types:   {}", entities.num_types());
    for (entity_type, count) in entities.type_counts() {
        println!("  {:<24} {}", entity_type, count);
    }
    println!("Edge types:     {}", edges.num_edge_types());
    println!("Edges grouped:  {}", edges.total_edges());
    println!("Files written:  {}", written.len() + 1);

    Ok(())
}

fn run_reindex_cmd(args: ReindexArgs) -> Result<()> {
    let start = Instant::now();
    let summary = run_reindex(&args.input, &args.output)?;

    println!();
    println!("=== Summary ===");
    println!("Re-index time:      {:.2}s", start.elapsed().as_secs_f64());
    println!();
    println!("Authors:            {}", summary.authors);
    println!("Institutions:       {}", summary.institutions);
    println!("Fields of study:    {}", summary.fields_of_study);
    println!("Write edges:        {}", summary.write_rows);
    println!("Affiliation edges:  {}", summary.affiliation_rows);
    println!("Topic edges:        {}", summary.topic_rows);
    println!("Citation edges:     {}", summary.citation_rows);

    Ok(())
}

fn run_karate(args: KarateArgs) -> Result<()> {
    let graph = load_karate(&args.nodes, &args.edges)?;
    let officers = graph.labels.iter().filter(|&&l| l == 1).count();

    println!();
    println!("=== Summary ===");
    println!("Nodes:    {}", graph.num_nodes());
    println!("Edges:    {}", graph.num_edges());
    println!("Officers: {}", officers);
    println!("Mr. Hi:   {}", graph.num_nodes() - officers);

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Fetch(args) => run_fetch(args),
        Commands::IndexTriples(args) => run_index_triples(args),
        Commands::Reindex(args) => run_reindex_cmd(args),
        Commands::Karate(args) => run_karate(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
