use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::warn;

use tabknn::{
    Attribute, Dataset, DistanceKind, KnnClassifier, PreprocessingState, TrainingHarness,
};

use crate::{ModelArgs, SplitArgs};

fn read(path: &Path) -> Result<Dataset> {
    Dataset::load(path).with_context(|| format!("cannot read dataset {}", path.display()))
}

/// Loads a dataset and applies the weights and preprocessing asked for.
fn prepare(path: &Path, model: &ModelArgs) -> Result<Dataset> {
    let mut data = read(path)?;
    if let Some(weights) = &model.weights {
        data.set_weights_from_strs(weights)?;
    }
    data.preprocess(model.preprocess.into());
    Ok(data)
}

fn partition(data: &Dataset, split: &SplitArgs, metric: DistanceKind) -> Result<TrainingHarness> {
    let harness = match split.seed {
        Some(seed) => TrainingHarness::seeded(data, split.fraction, seed, metric)?,
        None => TrainingHarness::sequential(data, split.fraction, metric)?,
    };
    Ok(harness)
}

fn describe(attribute: &Attribute) -> String {
    match attribute {
        Attribute::Quantitative(column) => match (column.min(), column.max(), column.mean()) {
            (Ok(min), Ok(max), Some(mean)) => {
                format!("min {min:.3}  max {max:.3}  mean {mean:.3}  std {:.3}", column.std_dev())
            }
            _ => "no values".to_string(),
        },
        Attribute::Qualitative(column) => {
            format!("{} classes: {}", column.class_count(), column.classes().join(", "))
        }
    }
}

pub fn info(path: &Path, rows: bool) -> Result<()> {
    let data = read(path)?;
    println!("{:<12} {}", "File", path.display());
    println!("{:<12} {}", "Rows", data.num_cases());
    println!("{:<12} {}", "Columns", data.num_attributes());
    println!();
    println!("{:<20} {:<14} {:>6}  Summary", "Column", "Kind", "Weight");
    println!("{}", "─".repeat(60));
    for attribute in data.attributes() {
        println!(
            "{:<20} {:<14} {:>6}  {}",
            attribute.name(),
            format!("{:?}", attribute.kind()),
            attribute.weight(),
            describe(attribute)
        );
    }
    match data.classes() {
        Ok(classes) => println!("\nClasses: {}", classes.join(", ")),
        Err(_) => println!("\nNo label column"),
    }
    if rows {
        println!();
        print!("{data}");
    }
    Ok(())
}

pub fn classify(path: &Path, query: &[String], model: &ModelArgs, seed: Option<u64>) -> Result<()> {
    let data = prepare(path, model)?;
    let (reference, query) = data
        .prepare_query(query)
        .context("query does not fit the dataset's columns")?;
    let classifier = KnnClassifier::new(model.k, model.metric)?;
    let mut rng = match seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_os_rng(),
    };
    let label = classifier.classify(&reference, &query, &mut rng)?;
    println!("{label}");
    Ok(())
}

pub fn evaluate(
    data: Option<&Path>,
    partitions: Option<&[PathBuf]>,
    model: &ModelArgs,
    split: &SplitArgs,
    confusion: bool,
) -> Result<()> {
    let harness = match (data, partitions) {
        (_, Some([train, test])) => {
            if PreprocessingState::from(model.preprocess) != PreprocessingState::Raw {
                warn!("--preprocess is ignored with --partitions; partitions are used as saved");
            }
            let mut train = read(train)?;
            if let Some(weights) = &model.weights {
                train.set_weights_from_strs(weights)?;
            }
            TrainingHarness::from_partitions(train, read(test)?, model.metric)?
        }
        (Some(path), None) => partition(&prepare(path, model)?, split, model.metric)?,
        _ => bail!("give either a dataset or --partitions TRAIN TEST"),
    };

    let evaluation = harness.evaluate(model.k)?;
    println!(
        "k = {}, metric = {}, train = {}, test = {}",
        model.k,
        model.metric,
        harness.train().num_cases(),
        harness.test().num_cases()
    );
    println!("Accuracy: {evaluation}");
    if confusion {
        let matrix = harness.confusion_matrix(model.k)?;
        println!("\nConfusion matrix (rows: true class, columns: predicted)");
        print!("{matrix}");
    }
    Ok(())
}

pub fn split(
    path: &Path,
    split: &SplitArgs,
    preprocess: PreprocessingState,
    train: &Path,
    test: &Path,
) -> Result<()> {
    let mut data = read(path)?;
    data.preprocess(preprocess);
    let harness = partition(&data, split, DistanceKind::default())?;
    harness
        .save(train, test)
        .context("cannot write partitions")?;
    println!(
        "{} training rows -> {}\n{} test rows -> {}",
        harness.train().num_cases(),
        train.display(),
        harness.test().num_cases(),
        test.display()
    );
    Ok(())
}
