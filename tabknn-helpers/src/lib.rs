//! Shared building blocks for the tabular k-NN toolkit.
//!
//! Holds the heterogeneous data model (attributes, datasets, instances), the
//! numeric vector the quantitative columns are stored in, the weighted
//! distance metrics and the preprocessing strategies.

use ndarray::{NdFloat, ScalarOperand};

use num_traits::{AsPrimitive, FromPrimitive, NumCast, Signed};
use rand::distr::uniform::SampleUniform;

use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

mod attribute;
mod dataset;
mod distance;
mod error;
mod instance;
mod io;
mod preprocessing;
mod vector;

pub use attribute::{Attribute, AttributeKind, Qualitative, Quantitative};
pub use dataset::{Dataset, Snapshot};
pub use distance::{
    euclidean_unweighted, Distance, DistanceError, DistanceKind, Euclidean, Manhattan, Minkowski,
    MINKOWSKI_ORDER,
};
pub use error::DataError;
pub use instance::{Instance, Value};
pub use preprocessing::{
    Normalization, PreprocessingState, Preprocessor, RawData, Standardization, QUERY_PLACEHOLDER,
};
pub use vector::NumericVector;

pub trait Float:
    NdFloat
    + FromPrimitive
    + Default
    + Signed
    + Sum
    + AsPrimitive<usize>
    + for<'a> AddAssign<&'a Self>
    + for<'a> MulAssign<&'a Self>
    + for<'a> SubAssign<&'a Self>
    + for<'a> DivAssign<&'a Self>
    + num_traits::MulAdd<Output = Self>
    + SampleUniform
    + ScalarOperand
    + std::marker::Unpin
{
    fn cast<T: NumCast>(x: T) -> Option<Self> {
        NumCast::from(x)
    }
}

impl Float for f32 {}

impl Float for f64 {}
