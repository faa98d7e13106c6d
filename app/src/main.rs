mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tabknn::{DistanceKind, PreprocessingState};

#[derive(Parser)]
#[command(name = "tabknn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Weighted k-nearest-neighbour classification of tabular data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a dataset: columns, kinds, weights and classes
    Info {
        /// Dataset file (header line, then comma-separated rows)
        data: PathBuf,

        /// Print every row as well
        #[arg(long)]
        rows: bool,
    },

    /// Classify a single raw row against a dataset
    Classify {
        data: PathBuf,

        /// Feature values of the query, comma-separated, without a label
        #[arg(short, long, value_delimiter = ',', required = true)]
        query: Vec<String>,

        #[command(flatten)]
        model: ModelArgs,

        /// Seed for tie-breaking between equally close classes
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Split a dataset, classify the held-out rows and report accuracy
    Evaluate {
        #[arg(required_unless_present = "partitions")]
        data: Option<PathBuf>,

        /// Use two saved partitions instead of splitting DATA
        #[arg(long, num_args = 2, value_names = ["TRAIN", "TEST"], conflicts_with = "data")]
        partitions: Option<Vec<PathBuf>>,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        split: SplitArgs,

        /// Also print the confusion matrix
        #[arg(long)]
        confusion: bool,
    },

    /// Split a dataset and write both partitions
    Split {
        data: PathBuf,

        #[command(flatten)]
        split: SplitArgs,

        #[arg(long, value_enum, default_value_t = Scaling::Raw)]
        preprocess: Scaling,

        /// Output file for the training partition
        #[arg(long)]
        train: PathBuf,

        /// Output file for the test partition
        #[arg(long)]
        test: PathBuf,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Number of neighbours
    #[arg(short, default_value_t = 3)]
    k: usize,

    /// Distance metric (euclidean, manhattan or minkowski; anything else is euclidean)
    #[arg(short, long, default_value_t = DistanceKind::Euclidean)]
    metric: DistanceKind,

    #[arg(long, value_enum, default_value_t = Scaling::Raw)]
    preprocess: Scaling,

    /// One weight per column, label column included
    #[arg(short, long, value_delimiter = ',')]
    weights: Option<Vec<String>>,
}

#[derive(Args)]
struct SplitArgs {
    /// Share of rows that go to the training partition
    #[arg(short, long, default_value_t = 0.7)]
    fraction: f64,

    /// Draw the training rows at random with this seed instead of taking the first ones
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scaling {
    Raw,
    Normalize,
    Standardize,
}

impl From<Scaling> for PreprocessingState {
    fn from(scaling: Scaling) -> Self {
        match scaling {
            Scaling::Raw => PreprocessingState::Raw,
            Scaling::Normalize => PreprocessingState::Normalized,
            Scaling::Standardize => PreprocessingState::Standardized,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabknn=info,k_nn=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { data, rows } => commands::info(&data, rows),
        Commands::Classify {
            data,
            query,
            model,
            seed,
        } => commands::classify(&data, &query, &model, seed),
        Commands::Evaluate {
            data,
            partitions,
            model,
            split,
            confusion,
        } => commands::evaluate(data.as_deref(), partitions.as_deref(), &model, &split, confusion),
        Commands::Split {
            data,
            split,
            preprocess,
            train,
            test,
        } => commands::split(&data, &split, preprocess.into(), &train, &test),
    }
}
