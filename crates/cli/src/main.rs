use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::fs::File;
use tokio::io::{BufReader, BufWriter};
use tracing::info;

use builder::{BuildConfig, SplitSink, TrainOutputs, build_split_subsets, build_training_set};
use corpus::{DataDir, OutDir, SplitData, predictions};
use oracle::EsOracle;

#[derive(Parser)]
#[command(name = "subset-builder")]
#[command(about = "Build filtered passage-ranking subsets with mined negative examples")]
struct Cli {
    /// Directory holding collection.tsv, queries/qrels files and preds
    #[arg(long, default_value = "./collectionandqueries")]
    data_dir: PathBuf,

    /// Output directory, created if missing
    #[arg(long, default_value = "./subset")]
    out_dir: PathBuf,

    /// Predictions file; defaults to `preds` inside the data directory
    #[arg(long)]
    predictions: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Single-split mode: dev prefix plus training triples with mined
    /// negatives (needs a reachable Elasticsearch)
    Train {
        /// Split whose queries/qrels provide the positives
        #[arg(long, default_value = "train")]
        split: String,
        #[arg(long, default_value = "localhost")]
        es_host: String,
        #[arg(long, default_value_t = 9200)]
        es_port: u16,
        #[arg(long, default_value = "ms_marco")]
        es_index: String,
        /// Shard count used if the index has to be created
        #[arg(long, default_value_t = 1)]
        shards: u32,
        /// Seed the negative-sampling RNG for reproducible triples
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Multi-split mode: replicate matched judgment/query pairs into
    /// every named split, no negatives
    Splits {
        #[arg(long, value_delimiter = ',', default_value = "train,dev.small")]
        splits: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let config = BuildConfig::default();

    let data = DataDir::new(&cli.data_dir);
    let out = OutDir::new(&cli.out_dir);
    tokio::fs::create_dir_all(out.root())
        .await
        .with_context(|| format!("failed to create output directory {}", out.root().display()))?;

    let preds_path = cli
        .predictions
        .clone()
        .unwrap_or_else(|| data.predictions());
    info!(path = %preds_path.display(), "loading predictions");
    let admitted = predictions::load_admitted_set(&preds_path, config.score_threshold).await?;
    info!(admitted = admitted.len(), "membership set built");

    match cli.command {
        Command::Train {
            split,
            es_host,
            es_port,
            es_index,
            shards,
            seed,
        } => {
            run_train(
                &data, &out, admitted, &config, &split, &es_host, es_port, &es_index, shards, seed,
            )
            .await
        }
        Command::Splits { splits } => run_splits(&data, &out, admitted, &config, &splits).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_train(
    data: &DataDir,
    out: &OutDir,
    admitted: std::collections::HashSet<String>,
    config: &BuildConfig,
    split: &str,
    es_host: &str,
    es_port: u16,
    es_index: &str,
    shards: u32,
    seed: Option<u64>,
) -> Result<()> {
    let split_data = SplitData::load(split, &data.queries(split), &data.qrels(split)).await?;

    let oracle = EsOracle::new(es_host, es_port, es_index)?;
    oracle.ensure_indexed(&data.collection(), shards).await?;

    let collection = open_collection(&data.collection()).await?;
    let mut outputs = TrainOutputs {
        collection: create_writer(&out.collection()).await?,
        dev_qrels: create_writer(&out.dev_qrels()).await?,
        dev_queries: create_writer(&out.dev_queries()).await?,
        triples: create_writer(&out.train_triples()).await?,
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let stats = build_training_set(
        collection,
        &split_data,
        &admitted,
        &oracle,
        &mut rng,
        &mut outputs,
        config,
    )
    .await?;

    info!(
        lines = stats.lines,
        admitted = stats.admitted,
        positives = stats.positives,
        dev_examples = stats.dev_examples,
        triples = stats.triples,
        "training set complete"
    );
    Ok(())
}

async fn run_splits(
    data: &DataDir,
    out: &OutDir,
    admitted: std::collections::HashSet<String>,
    config: &BuildConfig,
    names: &[String],
) -> Result<()> {
    let mut split_data = Vec::new();
    for name in names {
        split_data.push(SplitData::load(name, &data.queries(name), &data.qrels(name)).await?);
    }

    let mut sinks = Vec::new();
    for split in &split_data {
        sinks.push(SplitSink {
            data: split,
            qrels: create_writer(&out.qrels(&split.name)).await?,
            queries: create_writer(&out.queries(&split.name)).await?,
        });
    }

    let collection = open_collection(&data.collection()).await?;
    let mut out_collection = create_writer(&out.collection()).await?;

    let stats = build_split_subsets(
        collection,
        &admitted,
        &mut out_collection,
        &mut sinks,
        config,
    )
    .await?;

    info!(
        lines = stats.lines,
        admitted = stats.admitted,
        matched = stats.matched,
        "split subsets complete"
    );
    Ok(())
}

async fn open_collection(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("failed to open collection {}", path.display()))?;
    Ok(BufReader::new(file))
}

async fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}
