//! Train/test splitting and evaluation of the k-NN classifier.

mod confusion;

use std::fmt::{Display, Formatter};
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, info};

use k_nn::{KnnClassifier, KnnError};
use tabknn_helpers::{DataError, Dataset, DistanceKind};

pub use confusion::ConfusionMatrix;

#[derive(Debug, Error)]
pub enum TrainingError {
    /// The train fraction must lie in `[0, 1]`.
    #[error("train fraction {0} is outside [0, 1]")]
    InvalidFraction(f64),

    #[error("the test partition has no rows")]
    EmptyTestSet,

    /// A label that is not among the harness classes.
    #[error("unknown class `{0}`")]
    UnknownClass(String),

    #[error(transparent)]
    Knn(#[from] KnnError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Outcome of classifying every test row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
}

impl Evaluation {
    /// Percentage of correctly classified rows; zero when nothing was classified.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64 * 100.0
    }
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} = {:.2}%", self.correct, self.total, self.accuracy())
    }
}

/// A dataset split into a training and a test partition.
///
/// Both partitions keep the source's preprocessing state. `classes` is the union
/// of the labels of both partitions, training labels first.
#[derive(Debug, Clone)]
pub struct TrainingHarness {
    train: Dataset,
    test: Dataset,
    classes: Vec<String>,
    distance: DistanceKind,
    seed: Option<u64>,
}

const SPLIT_TOLERANCE: f64 = 1e-9;

fn train_count(rows: usize, fraction: f64) -> Result<usize, TrainingError> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(TrainingError::InvalidFraction(fraction));
    }
    let product = rows as f64 * fraction;
    // products such as 100 · 0.29 land a hair below the integer they denote
    let nearest = product.round();
    let count = if (product - nearest).abs() <= SPLIT_TOLERANCE * nearest.max(1.0) {
        nearest
    } else {
        product.floor()
    };
    Ok(count as usize)
}

/// Copies `train_rows` (in the given order) into one partition and every other
/// row (in ascending order) into the other.
fn partition(dataset: &Dataset, train_rows: &[usize]) -> Result<(Dataset, Dataset), DataError> {
    let mut in_train = vec![false; dataset.num_cases()];
    let mut train = dataset.empty_like();
    for &row in train_rows {
        in_train[row] = true;
        train.push_instance(&dataset.instance(row)?)?;
    }
    let mut test = dataset.empty_like();
    for row in (0..dataset.num_cases()).filter(|&row| !in_train[row]) {
        test.push_instance(&dataset.instance(row)?)?;
    }
    Ok((train, test))
}

fn union_classes(train: &Dataset, test: &Dataset) -> Result<Vec<String>, DataError> {
    let mut classes = train.classes()?;
    for class in test.classes()? {
        if !classes.contains(&class) {
            classes.push(class);
        }
    }
    Ok(classes)
}

impl TrainingHarness {
    /// Puts the first `floor(n · fraction)` rows in training and the rest in test.
    pub fn sequential(
        dataset: &Dataset,
        fraction: f64,
        distance: DistanceKind,
    ) -> Result<Self, TrainingError> {
        let count = train_count(dataset.num_cases(), fraction)?;
        let rows: Vec<usize> = (0..count).collect();
        let (train, test) = partition(dataset, &rows)?;
        Self::from_partitions(train, test, distance)
    }

    /// Draws `floor(n · fraction)` distinct training rows from a generator seeded
    /// with `seed`. The same seed, fraction and dataset always give the same split.
    pub fn seeded(
        dataset: &Dataset,
        fraction: f64,
        seed: u64,
        distance: DistanceKind,
    ) -> Result<Self, TrainingError> {
        let rows = dataset.num_cases();
        let count = train_count(rows, fraction)?;
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut taken = vec![false; rows];
        let mut drawn = Vec::with_capacity(count);
        while drawn.len() < count {
            let row = rng.random_range(0..rows);
            if !taken[row] {
                taken[row] = true;
                drawn.push(row);
            }
        }
        let (train, test) = partition(dataset, &drawn)?;
        let mut harness = Self::from_partitions(train, test, distance)?;
        harness.seed = Some(seed);
        Ok(harness)
    }

    /// Wraps two existing partitions.
    pub fn from_partitions(
        train: Dataset,
        test: Dataset,
        distance: DistanceKind,
    ) -> Result<Self, TrainingError> {
        let classes = union_classes(&train, &test)?;
        debug!(
            train = train.num_cases(),
            test = test.num_cases(),
            classes = classes.len(),
            "dataset partitioned"
        );
        Ok(Self {
            train,
            test,
            classes,
            distance,
            seed: None,
        })
    }

    pub fn train(&self) -> &Dataset {
        &self.train
    }

    pub fn test(&self) -> &Dataset {
        &self.test
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn distance(&self) -> DistanceKind {
        self.distance
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Tie-break generator for the convenience entry points.
    fn rng(&self) -> ChaCha20Rng {
        match self.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_os_rng(),
        }
    }

    /// Classifies each test row, label stripped, against the training partition.
    fn predictions<R: Rng + ?Sized>(
        &self,
        k: usize,
        rng: &mut R,
    ) -> Result<Vec<(String, String)>, TrainingError> {
        let classifier = KnnClassifier::new(k, self.distance)?;
        self.test
            .instances()
            .map(|row| {
                let mut query = row?;
                let actual = query.strip_label().ok_or(DataError::NoLabelColumn)?;
                let predicted = classifier.classify(&self.train, &query, &mut *rng)?;
                Ok((actual, predicted))
            })
            .collect()
    }

    pub fn evaluate_with_rng<R: Rng + ?Sized>(
        &self,
        k: usize,
        rng: &mut R,
    ) -> Result<Evaluation, TrainingError> {
        if self.test.is_empty() {
            return Err(TrainingError::EmptyTestSet);
        }
        let predictions = self.predictions(k, rng)?;
        let evaluation = Evaluation {
            correct: predictions.iter().filter(|(a, p)| a == p).count(),
            total: predictions.len(),
        };
        info!(k, distance = %self.distance, "predictive accuracy: {evaluation}");
        Ok(evaluation)
    }

    /// Accuracy of the classifier with `k` neighbours on the test partition.
    pub fn evaluate(&self, k: usize) -> Result<Evaluation, TrainingError> {
        self.evaluate_with_rng(k, &mut self.rng())
    }

    /// Counts of (actual, predicted) pairs over the test partition. An empty
    /// test partition gives an all-zero matrix.
    pub fn confusion_matrix_with_rng<R: Rng + ?Sized>(
        &self,
        k: usize,
        rng: &mut R,
    ) -> Result<ConfusionMatrix, TrainingError> {
        let mut matrix = ConfusionMatrix::new(self.classes.clone());
        for (actual, predicted) in self.predictions(k, rng)? {
            matrix.record(&actual, &predicted)?;
        }
        info!(classes = ?self.classes, "confusion matrix built");
        Ok(matrix)
    }

    pub fn confusion_matrix(&self, k: usize) -> Result<ConfusionMatrix, TrainingError> {
        self.confusion_matrix_with_rng(k, &mut self.rng())
    }

    /// Writes both partitions in the tabular text format.
    pub fn save(
        &self,
        train_path: impl AsRef<Path>,
        test_path: impl AsRef<Path>,
    ) -> Result<(), TrainingError> {
        self.train.save(train_path)?;
        self.test.save(test_path)?;
        Ok(())
    }

    /// Reads two partitions written by [`TrainingHarness::save`].
    pub fn load(
        train_path: impl AsRef<Path>,
        test_path: impl AsRef<Path>,
        distance: DistanceKind,
    ) -> Result<Self, TrainingError> {
        let train = Dataset::load(train_path)?;
        let test = Dataset::load(test_path)?;
        Self::from_partitions(train, test, distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use tabknn_helpers::{PreprocessingState, Qualitative, Quantitative};

    fn clusters() -> Dataset {
        Dataset::from_attributes(vec![
            Quantitative::with_values("x", vec![0.0, 0.2, 10.0, 0.1, 10.2, 9.9, 0.3, 10.1]).into(),
            Quantitative::with_values("y", vec![0.0, 0.1, 10.0, 0.2, 9.8, 10.1, 0.1, 10.3]).into(),
            Qualitative::with_values(
                "class",
                ["A", "A", "B", "A", "B", "B", "A", "B"].map(String::from).to_vec(),
            )
            .into(),
        ])
        .unwrap()
    }

    fn labels(data: &Dataset) -> Vec<String> {
        (0..data.num_cases()).map(|i| data.label(i).unwrap()).collect()
    }

    #[test]
    fn test_sequential_split() {
        let harness =
            TrainingHarness::sequential(&clusters(), 0.6, DistanceKind::Euclidean).unwrap();
        assert_eq!(harness.train().num_cases(), 4);
        assert_eq!(harness.test().num_cases(), 4);
        assert_eq!(labels(harness.train()), vec!["A", "A", "B", "A"]);
        assert_eq!(harness.classes(), &["A", "B"]);
        assert_eq!(harness.seed(), None);
    }

    #[test]
    fn test_seeded_split_is_reproducible() {
        let data = clusters();
        let a = TrainingHarness::seeded(&data, 0.5, 11, DistanceKind::Euclidean).unwrap();
        let b = TrainingHarness::seeded(&data, 0.5, 11, DistanceKind::Euclidean).unwrap();
        assert_eq!(a.train(), b.train());
        assert_eq!(a.test(), b.test());
        assert_eq!(a.train().num_cases() + a.test().num_cases(), data.num_cases());
        assert_eq!(a.train().num_cases(), 4);
    }

    #[test]
    fn test_seeded_test_rows_keep_source_order() {
        let data = clusters();
        let harness = TrainingHarness::seeded(&data, 0.25, 3, DistanceKind::Euclidean).unwrap();
        let xs: Vec<f64> = harness
            .test()
            .instances()
            .map(|r| r.unwrap().feature_vector().get(0).unwrap())
            .collect();
        let positions: Vec<usize> = xs
            .iter()
            .map(|x| {
                (0..data.num_cases())
                    .position(|i| data.instance(i).unwrap().feature_vector().get(0).unwrap() == *x)
                    .unwrap()
            })
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_partitions_keep_preprocessing() {
        let mut data = clusters();
        data.preprocess(PreprocessingState::Standardized);
        let harness = TrainingHarness::seeded(&data, 0.5, 1, DistanceKind::Manhattan).unwrap();
        assert_eq!(harness.train().preprocessing(), PreprocessingState::Standardized);
        assert_eq!(harness.test().preprocessing(), PreprocessingState::Standardized);
    }

    #[test]
    fn test_invalid_fraction() {
        for fraction in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                TrainingHarness::sequential(&clusters(), fraction, DistanceKind::Euclidean),
                Err(TrainingError::InvalidFraction(_))
            ));
        }
    }

    #[test]
    fn test_evaluate_separable_clusters() {
        let harness =
            TrainingHarness::seeded(&clusters(), 0.5, 5, DistanceKind::Euclidean).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let evaluation = harness.evaluate_with_rng(1, &mut rng).unwrap();
        assert_eq!(evaluation.total, 4);
        assert_eq!(evaluation, harness.evaluate(1).unwrap());
        assert_eq!(
            evaluation.to_string(),
            format!("{} / 4 = {:.2}%", evaluation.correct, evaluation.accuracy())
        );
    }

    #[test]
    fn test_confusion_matrix_rows_match_test_labels() {
        let harness =
            TrainingHarness::sequential(&clusters(), 0.5, DistanceKind::Euclidean).unwrap();
        let matrix = harness.confusion_matrix(3).unwrap();
        assert_eq!(matrix.total(), harness.test().num_cases());
        let test_labels = labels(harness.test());
        for (i, class) in harness.classes().iter().enumerate() {
            let expected = test_labels.iter().filter(|l| *l == class).count();
            assert_eq!(matrix.row_sum(i), Some(expected));
        }
    }

    #[test]
    fn test_empty_test_set() {
        let harness =
            TrainingHarness::sequential(&clusters(), 1.0, DistanceKind::Euclidean).unwrap();
        assert!(harness.test().is_empty());
        assert!(matches!(harness.evaluate(1), Err(TrainingError::EmptyTestSet)));

        let matrix = harness.confusion_matrix(1).unwrap();
        assert_eq!(matrix.classes(), harness.classes());
        assert_eq!(matrix.total(), 0);
        assert!(matrix.counts().iter().all(|&c| c == 0));
    }

    fn numbered(rows: usize) -> Dataset {
        Dataset::from_attributes(vec![
            Quantitative::with_values("x", (0..rows).map(|i| i as f64).collect::<Vec<f64>>()).into(),
            Qualitative::with_values(
                "class",
                (0..rows).map(|i| if i % 2 == 0 { "even" } else { "odd" }.to_string()).collect(),
            )
            .into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_split_size_is_exact_floor() {
        for (rows, fraction, expected) in [(100, 0.29, 29), (100, 0.57, 57), (10, 0.7, 7), (7, 0.5, 3)] {
            let data = numbered(rows);
            let sequential =
                TrainingHarness::sequential(&data, fraction, DistanceKind::Euclidean).unwrap();
            assert_eq!(sequential.train().num_cases(), expected);
            assert_eq!(sequential.test().num_cases(), rows - expected);

            let seeded =
                TrainingHarness::seeded(&data, fraction, 17, DistanceKind::Euclidean).unwrap();
            assert_eq!(seeded.train().num_cases(), expected);
            assert_eq!(seeded.test().num_cases(), rows - expected);
        }
    }

    #[test]
    fn test_accuracy_percentage() {
        let evaluation = Evaluation { correct: 2, total: 3 };
        assert_abs_diff_eq!(evaluation.accuracy(), 66.666_666_666, epsilon = 1e-6);
        assert_eq!(evaluation.to_string(), "2 / 3 = 66.67%");
        assert_abs_diff_eq!(Evaluation { correct: 0, total: 0 }.accuracy(), 0.0);
    }

    #[test]
    fn test_k_too_large_propagates() {
        let harness =
            TrainingHarness::sequential(&clusters(), 0.25, DistanceKind::Euclidean).unwrap();
        assert!(matches!(
            harness.evaluate(5),
            Err(TrainingError::Knn(KnnError::KTooLarge { k: 5, available: 2 }))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let (train_path, test_path) = (dir.path().join("train.csv"), dir.path().join("test.csv"));
        let harness =
            TrainingHarness::seeded(&clusters(), 0.5, 9, DistanceKind::Euclidean).unwrap();
        harness.save(&train_path, &test_path).unwrap();

        let loaded =
            TrainingHarness::load(&train_path, &test_path, DistanceKind::Euclidean).unwrap();
        assert_eq!(loaded.train().attributes(), harness.train().attributes());
        assert_eq!(loaded.test().num_cases(), harness.test().num_cases());
        let mut expected = harness.classes().to_vec();
        expected.sort();
        let mut classes = loaded.classes().to_vec();
        classes.sort();
        assert_eq!(classes, expected);
    }
}
