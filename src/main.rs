use afphylo::config::{EngineConfig, StatisticKind, DEFAULT_K};
use afphylo::kmer::Alphabet;
use afphylo::startup::{self, Settings};
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use std::process;

/// CLI tool computing alignment-free distance matrices from k-mer profiles
#[derive(Parser, Debug)]
#[command(name = "afphylo")]
#[command(about = "Pairwise D2 distances between sequences, written as a PHYLIP distance matrix", long_about = None)]
struct Args {
    /// Input FASTA file with the related sequences
    infile: PathBuf,

    /// Output PHYLIP distance matrix path
    outfile: PathBuf,

    /// K-mer length
    #[arg(short = 'k', long = "kmer", default_value_t = DEFAULT_K)]
    k: usize,

    /// Statistic: d2, normalised, neighbourhood, log-d2, log-normalised or log-neighbourhood
    #[arg(short = 's', long = "statistic", default_value_t = StatisticKind::default())]
    statistic: StatisticKind,

    /// Expand neighbourhoods over ACUG instead of ACTG
    #[arg(long = "rna")]
    rna: bool,

    /// Worker threads, 0 picks automatically and 1 stays sequential
    #[arg(short = 't', long = "threads", default_value_t = 0)]
    threads: usize,

    /// JSON background probabilities per sequence id, for the normalised statistics.
    /// If not specified, each sequence's own symbol composition is used
    #[arg(short = 'b', long = "background")]
    background: Option<PathBuf>,

    /// Write the similarity matrix of d2, normalised or neighbourhood instead of refusing it
    #[arg(long = "allow-similarity")]
    allow_similarity: bool,

    /// Also write the matrix as JSON to this path
    #[arg(long = "json")]
    json: Option<PathBuf>,

    /// Logging level, overridden by RUST_LOG
    #[arg(short = 'l', long = "log-level", default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .parse_default_env()
        .init();

    let alphabet = if args.rna { Alphabet::rna() } else { Alphabet::dna() };

    let settings = Settings {
        infile: args.infile,
        outfile: args.outfile,
        json: args.json,
        background: args.background,
        allow_similarity: args.allow_similarity,
        engine: EngineConfig {
            k: args.k,
            alphabet,
            statistic: args.statistic,
            threads: args.threads,
        },
    };

    if let Err(e) = startup::run(&settings) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
