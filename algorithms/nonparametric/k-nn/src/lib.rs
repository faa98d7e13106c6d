use ndarray::Array1;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use tabknn_helpers::{
    DataError, Dataset, Distance, DistanceError, DistanceKind, Instance, NumericVector,
};

/// Errors that can occur when using the k-NN classifier.
#[derive(Debug, Error)]
pub enum KnnError {
    /// k cannot be zero for a k-NN classifier
    #[error("k cannot be zero for a k-NN classifier")]
    InvalidK,

    /// Cannot classify against an empty training set
    #[error("cannot classify against an empty training set")]
    EmptyTrainingSet,

    /// More neighbours requested than there are training rows
    #[error("k = {k} exceeds the {available} available training rows")]
    KTooLarge { k: usize, available: usize },

    /// A distance came out as NaN (likely due to NaN values in data)
    #[error("invalid distance (likely due to NaN values in data)")]
    InvalidDistance,

    #[error(transparent)]
    Distance(#[from] DistanceError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// A selected training row together with its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbour {
    pub index: usize,
    pub distance: f64,
    pub label: String,
}

/// A k-Nearest Neighbours (k-NN) classifier over tabular datasets.
///
/// The classifier holds only its configuration; the training data is passed in
/// on every call. The predicted class is the one whose selected neighbours have
/// the smallest *summed* distance to the query, so a single very close row can
/// outweigh several distant ones. Exact ties are broken at random.
///
/// # Type Parameters
///
/// * `D`: The distance metric, which must implement [`Distance<f64>`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
pub struct KnnClassifier<D = DistanceKind> {
    k: usize,
    distance: D,
}

impl<D: Distance<f64>> KnnClassifier<D> {
    /// Creates a new k-NN classifier.
    ///
    /// # Errors
    ///
    /// Returns `KnnError::InvalidK` if `k` is 0.
    pub fn new(k: usize, distance: D) -> Result<Self, KnnError> {
        if k == 0 {
            return Err(KnnError::InvalidK);
        }
        Ok(Self { k, distance })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn metric(&self) -> &D {
        &self.distance
    }

    /// Weighted distance from every training row to `query`, in row order.
    ///
    /// Only numeric features take part, weighted by the dataset's feature weights.
    pub fn distances(&self, train: &Dataset, query: &Instance) -> Result<Vec<f64>, KnnError> {
        let weights = Array1::from(train.feature_weights());
        let query = query.feature_vector();
        train
            .instances()
            .map(|row| {
                let reference = row?.feature_vector();
                let d = self
                    .distance
                    .distance(reference.view(), query.view(), weights.view())?;
                if d.is_nan() {
                    return Err(KnnError::InvalidDistance);
                }
                Ok(d)
            })
            .collect()
    }

    /// Indices of the `k` smallest distances, found in a single pass.
    ///
    /// The first `k` rows seed the candidates. Every later row replaces the
    /// first-found worst candidate when it is strictly closer.
    pub fn nearest(&self, distances: &[f64]) -> Result<Vec<usize>, KnnError> {
        if distances.is_empty() {
            return Err(KnnError::EmptyTrainingSet);
        }
        if self.k > distances.len() {
            return Err(KnnError::KTooLarge {
                k: self.k,
                available: distances.len(),
            });
        }
        let mut chosen: Vec<usize> = (0..self.k).collect();
        let mut candidates = NumericVector::from(&distances[..self.k]);
        for (row, &d) in distances.iter().enumerate().skip(self.k) {
            let slot = candidates.max_index().ok_or(KnnError::InvalidDistance)?;
            if candidates.get(slot)? > d {
                candidates.set(slot, d)?;
                chosen[slot] = row;
            }
        }
        Ok(chosen)
    }

    /// Predicts the label of `query` from the labelled rows of `train`.
    ///
    /// `rng` is only consulted when two or more classes tie exactly.
    ///
    /// # Errors
    ///
    /// Returns `KnnError::EmptyTrainingSet` if `train` has no rows,
    /// `KnnError::KTooLarge` if it has fewer than `k`, and
    /// `KnnError::InvalidDistance` if a distance is NaN.
    pub fn classify<R: Rng + ?Sized>(
        &self,
        train: &Dataset,
        query: &Instance,
        rng: &mut R,
    ) -> Result<String, KnnError> {
        if train.is_empty() {
            return Err(KnnError::EmptyTrainingSet);
        }
        let distances = self.distances(train, query)?;
        let neighbours = self
            .nearest(&distances)?
            .into_iter()
            .map(|index| {
                Ok(Neighbour {
                    index,
                    distance: distances[index],
                    label: train.label(index)?,
                })
            })
            .collect::<Result<Vec<_>, KnnError>>()?;
        let label = vote(&neighbours, rng)?;
        debug!(k = self.k, %query, %label, "query classified");
        Ok(label)
    }
}

/// Sums the neighbours' distances per label and returns the label with the
/// smallest total. Labels tied on that total are drawn from uniformly.
pub fn vote<R: Rng + ?Sized>(neighbours: &[Neighbour], rng: &mut R) -> Result<String, KnnError> {
    // first-seen order keeps seeded tie-breaks reproducible
    let mut totals: Vec<(&str, f64)> = Vec::new();
    for neighbour in neighbours {
        match totals.iter_mut().find(|(label, _)| *label == neighbour.label) {
            Some((_, total)) => *total += neighbour.distance,
            None => totals.push((neighbour.label.as_str(), neighbour.distance)),
        }
    }

    let best = totals
        .iter()
        .map(|&(_, total)| total)
        .fold(f64::INFINITY, f64::min);
    let tied: Vec<&str> = totals
        .iter()
        .filter(|&&(_, total)| total == best)
        .map(|&(label, _)| label)
        .collect();

    let winner = match tied.as_slice() {
        [] => return Err(KnnError::EmptyTrainingSet),
        [only] => *only,
        _ => {
            let pick = tied[rng.random_range(0..tied.len())];
            debug!(candidates = ?tied, %pick, "tie broken at random");
            pick
        }
    };
    Ok(winner.to_string())
}
