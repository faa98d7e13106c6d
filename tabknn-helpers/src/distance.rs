use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use ndarray::{s, ArrayView1};
use thiserror::Error;

use crate::Float;

/// Order used by [`DistanceKind::Minkowski`].
pub const MINKOWSKI_ORDER: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistanceError {
    /// The reference, query and weight vectors do not line up.
    #[error(
        "vector sizes do not match: reference = {reference}, query = {query}, weights = {weights}"
    )]
    ShapeMismatch {
        reference: usize,
        query: usize,
        weights: usize,
    },

    /// Minkowski order that cannot be represented or is not positive.
    #[error("invalid Minkowski order {0}")]
    InvalidOrder(i32),
}

/// A weighted distance between a stored (reference) vector and a query vector.
///
/// Every implementation iterates over the query's dimensions. The reference and
/// the weights may each carry one extra trailing slot (a label position) which
/// is ignored; any other shape is a [`DistanceError::ShapeMismatch`].
pub trait Distance<F: Float> {
    fn distance(
        &self,
        reference: ArrayView1<F>,
        query: ArrayView1<F>,
        weights: ArrayView1<F>,
    ) -> Result<F, DistanceError>;
}

/// `Σ |(aᵢ − bᵢ)·wᵢ|`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Manhattan;

/// `(Σ |(aᵢ − bᵢ)·wᵢ|ᵖ)^(1/p)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Minkowski {
    order: i32,
}

/// `sqrt(Σ ((aᵢ − bᵢ)·wᵢ)²)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl Minkowski {
    pub fn new(order: i32) -> Self {
        Self { order }
    }

    pub fn order(&self) -> i32 {
        self.order
    }
}

impl Default for Minkowski {
    fn default() -> Self {
        Self::new(MINKOWSKI_ORDER)
    }
}

fn check_shape(reference: usize, query: usize, weights: usize) -> Result<(), DistanceError> {
    let fits = |len: usize| len == query || len == query + 1;
    if fits(reference) && fits(weights) {
        Ok(())
    } else {
        Err(DistanceError::ShapeMismatch {
            reference,
            query,
            weights,
        })
    }
}

/// Sums `term((aᵢ − bᵢ)·wᵢ)` over the query's dimensions.
fn weighted_sum<F: Float>(
    reference: ArrayView1<F>,
    query: ArrayView1<F>,
    weights: ArrayView1<F>,
    term: impl Fn(F) -> F,
) -> Result<F, DistanceError> {
    check_shape(reference.len(), query.len(), weights.len())?;
    let n = query.len();
    Ok(reference
        .slice(s![..n])
        .iter()
        .zip(query.iter())
        .zip(weights.slice(s![..n]).iter())
        .map(|((&a, &b), &w)| term((a - b) * w))
        .sum())
}

impl<F: Float> Distance<F> for Manhattan {
    fn distance(
        &self,
        reference: ArrayView1<F>,
        query: ArrayView1<F>,
        weights: ArrayView1<F>,
    ) -> Result<F, DistanceError> {
        weighted_sum(reference, query, weights, num_traits::Float::abs)
    }
}

impl<F: Float> Distance<F> for Minkowski {
    fn distance(
        &self,
        reference: ArrayView1<F>,
        query: ArrayView1<F>,
        weights: ArrayView1<F>,
    ) -> Result<F, DistanceError> {
        if self.order < 1 {
            return Err(DistanceError::InvalidOrder(self.order));
        }
        let p = F::from_i32(self.order).ok_or(DistanceError::InvalidOrder(self.order))?;
        let sum = weighted_sum(reference, query, weights, |d| {
            num_traits::Float::abs(d).powi(self.order)
        })?;
        Ok(sum.powf(F::one() / p))
    }
}

impl<F: Float> Distance<F> for Euclidean {
    fn distance(
        &self,
        reference: ArrayView1<F>,
        query: ArrayView1<F>,
        weights: ArrayView1<F>,
    ) -> Result<F, DistanceError> {
        let sum = weighted_sum(reference, query, weights, |d| d * d)?;
        Ok(sum.sqrt())
    }
}

/// Plain Euclidean distance where `reference` carries a trailing label slot.
///
/// `reference.len()` must be exactly `query.len() + 1`; equal-length vectors are
/// rejected.
pub fn euclidean_unweighted<F: Float>(
    reference: ArrayView1<F>,
    query: ArrayView1<F>,
) -> Result<F, DistanceError> {
    if reference.len() != query.len() + 1 {
        return Err(DistanceError::ShapeMismatch {
            reference: reference.len(),
            query: query.len(),
            weights: 0,
        });
    }
    let sum: F = reference
        .slice(s![..query.len()])
        .iter()
        .zip(query)
        .map(|(&a, &b)| (a - b) * (a - b))
        .sum();
    Ok(sum.sqrt())
}

/// Metric selector used by the classifier and the training harness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
pub enum DistanceKind {
    #[default]
    Euclidean,
    Manhattan,
    /// Fixed order [`MINKOWSKI_ORDER`].
    Minkowski,
}

impl DistanceKind {
    /// Case-insensitive lookup; anything unrecognised is Euclidean.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "manhattan" | "l1" => DistanceKind::Manhattan,
            "minkowski" | "l3" => DistanceKind::Minkowski,
            _ => DistanceKind::Euclidean,
        }
    }
}

impl FromStr for DistanceKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl Display for DistanceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceKind::Euclidean => write!(f, "euclidean"),
            DistanceKind::Manhattan => write!(f, "manhattan"),
            DistanceKind::Minkowski => write!(f, "minkowski"),
        }
    }
}

impl<F: Float> Distance<F> for DistanceKind {
    fn distance(
        &self,
        reference: ArrayView1<F>,
        query: ArrayView1<F>,
        weights: ArrayView1<F>,
    ) -> Result<F, DistanceError> {
        match self {
            DistanceKind::Euclidean => Euclidean.distance(reference, query, weights),
            DistanceKind::Manhattan => Manhattan.distance(reference, query, weights),
            DistanceKind::Minkowski => Minkowski::default().distance(reference, query, weights),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use proptest::prelude::*;

    #[test]
    fn test_manhattan() {
        let d = Manhattan
            .distance(array![1.0, 2.0].view(), array![4.0, 6.0].view(), array![1.0, 1.0].view())
            .unwrap();
        assert_abs_diff_eq!(d, 7.0);
    }

    #[test]
    fn test_minkowski_order_three() {
        let d = Minkowski::default()
            .distance(array![1.0, 2.0].view(), array![4.0, 6.0].view(), array![1.0, 1.0].view())
            .unwrap();
        let expected = (27.0f64 + 64.0).powf(1.0 / 3.0);
        assert_abs_diff_eq!(d, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_weighted_euclidean_ignores_label_slot() {
        let d = Euclidean
            .distance(
                array![1.0, 2.0, 3.0].view(),
                array![4.0, 6.0].view(),
                array![1.0, 0.5, 2.0].view(),
            )
            .unwrap();
        assert_abs_diff_eq!(d, 3.605551275463989, epsilon = 1e-9);
    }

    #[test]
    fn test_unweighted_euclidean_requires_label_slot() {
        let d = euclidean_unweighted(array![1.0, 2.0, 3.0].view(), array![4.0, 6.0].view())
            .unwrap();
        assert_abs_diff_eq!(d, 5.0);

        let err = euclidean_unweighted(array![1.0, 2.0].view(), array![4.0, 6.0].view());
        assert!(matches!(err, Err(DistanceError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_shape_mismatch() {
        let err = Manhattan.distance(
            array![1.0, 2.0, 3.0, 4.0].view(),
            array![4.0, 6.0].view(),
            array![1.0, 1.0].view(),
        );
        assert_eq!(
            err,
            Err(DistanceError::ShapeMismatch {
                reference: 4,
                query: 2,
                weights: 2
            })
        );
        let err = Euclidean.distance(
            array![1.0, 2.0].view(),
            array![4.0, 6.0].view(),
            array![1.0].view(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_views_borrowed_from_different_owners() {
        fn measure<D: Distance<f64>>(metric: &D, query: ArrayView1<f64>) -> f64 {
            let reference = array![1.0, 2.0, 0.0];
            let weights = Array1::from_elem(2, 1.0);
            metric
                .distance(reference.view(), query, weights.view())
                .unwrap()
        }
        let query = array![4.0, 6.0];
        assert_abs_diff_eq!(measure(&Euclidean, query.view()), 5.0);
        assert_abs_diff_eq!(measure(&Manhattan, query.view()), 7.0);
        assert_abs_diff_eq!(
            measure(&Minkowski::default(), query.view()),
            91.0f64.powf(1.0 / 3.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_kind_lookup() {
        assert_eq!(DistanceKind::from_name("MANHATTAN"), DistanceKind::Manhattan);
        assert_eq!("minkowski".parse::<DistanceKind>().unwrap(), DistanceKind::Minkowski);
        assert_eq!(DistanceKind::from_name("euclidiana"), DistanceKind::Euclidean);
        assert_eq!(DistanceKind::from_name("whatever"), DistanceKind::Euclidean);
        assert_eq!(DistanceKind::default(), DistanceKind::Euclidean);
    }

    #[test]
    fn test_kind_dispatch() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        let w = array![1.0, 1.0];
        let l2 = DistanceKind::Euclidean.distance(a.view(), b.view(), w.view()).unwrap();
        let l1 = DistanceKind::Manhattan.distance(a.view(), b.view(), w.view()).unwrap();
        assert_abs_diff_eq!(l2, 5.0);
        assert_abs_diff_eq!(l1, 7.0);
    }

    #[test]
    fn test_invalid_minkowski_order() {
        let err = Minkowski::new(0).distance(
            array![1.0f64].view(),
            array![2.0].view(),
            array![1.0].view(),
        );
        assert_eq!(err, Err(DistanceError::InvalidOrder(0)));
    }

    fn vectors() -> impl Strategy<Value = (Vec<f64>, Vec<f64>, Vec<f64>)> {
        (1usize..8).prop_flat_map(|n| {
            (
                prop::collection::vec(-100.0f64..100.0, n),
                prop::collection::vec(-100.0f64..100.0, n),
                prop::collection::vec(0.1f64..2.0, n),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_metrics_non_negative((a, b, w) in vectors()) {
            let (a, b, w) = (Array1::from(a), Array1::from(b), Array1::from(w));
            for kind in [DistanceKind::Euclidean, DistanceKind::Manhattan, DistanceKind::Minkowski] {
                let d = kind.distance(a.view(), b.view(), w.view()).unwrap();
                prop_assert!(d >= 0.0);
            }
        }

        #[test]
        fn prop_metrics_zero_on_identical((a, _b, w) in vectors()) {
            let (a, w) = (Array1::from(a), Array1::from(w));
            for kind in [DistanceKind::Euclidean, DistanceKind::Manhattan, DistanceKind::Minkowski] {
                let d = kind.distance(a.view(), a.view(), w.view()).unwrap();
                prop_assert_eq!(d, 0.0);
            }
        }
    }
}
