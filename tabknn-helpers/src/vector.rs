use std::fmt::{Display, Formatter};

use ndarray::ArrayView1;
use tracing::warn;

use crate::DataError;

/// A growable sequence of `f64` values.
///
/// Backs the quantitative attributes and carries per-query distances. Element
/// access is bounds-checked; an [`ArrayView1`] over the same storage is
/// available through [`NumericVector::view`] for the distance metrics.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
pub struct NumericVector {
    values: Vec<f64>,
}

impl NumericVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        ArrayView1::from(self.values.as_slice())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.values.iter()
    }

    pub fn get(&self, index: usize) -> Result<f64, DataError> {
        DataError::check_index(index, self.len())?;
        Ok(self.values[index])
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<(), DataError> {
        DataError::check_index(index, self.len())?;
        self.values[index] = value;
        Ok(())
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn remove(&mut self, index: usize) -> Result<f64, DataError> {
        DataError::check_index(index, self.len())?;
        Ok(self.values.remove(index))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn concat(&mut self, other: &NumericVector) {
        self.values.extend_from_slice(&other.values);
    }

    pub fn contains(&self, value: f64) -> bool {
        self.values.contains(&value)
    }

    /// Largest value, `None` when empty.
    pub fn max(&self) -> Option<f64> {
        self.max_index().map(|i| self.values[i])
    }

    pub fn min(&self) -> Option<f64> {
        self.min_index().map(|i| self.values[i])
    }

    /// Position of the first maximum. NaN entries never win.
    pub fn max_index(&self) -> Option<usize> {
        self.first_position(|candidate, best| candidate > best)
    }

    /// Position of the first minimum. NaN entries never win.
    pub fn min_index(&self) -> Option<usize> {
        self.first_position(|candidate, best| candidate < best)
    }

    /// Elementwise `self += other`.
    pub fn add_assign(&mut self, other: &NumericVector) -> Result<(), DataError> {
        self.check_same_len(other, "vector addition")?;
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
        Ok(())
    }

    /// Returns a new vector with `value` added to every element.
    pub fn add_scalar(&self, value: f64) -> NumericVector {
        self.values.iter().map(|v| v + value).collect()
    }

    pub fn scale(&mut self, factor: f64) {
        self.values.iter_mut().for_each(|v| *v *= factor);
    }

    pub fn dot(&self, other: &NumericVector) -> Result<f64, DataError> {
        self.check_same_len(other, "dot product")?;
        Ok(self.view().dot(&other.view()))
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.dot_self().sqrt()
    }

    /// Arithmetic mean, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        self.view().mean()
    }

    /// Rescales into `[0, 1]` via `(x - min) / (max - min)`.
    ///
    /// A zero range leaves the values untouched and returns `false`.
    pub fn normalize(&mut self) -> bool {
        let (Some(min), Some(max)) = (self.min(), self.max()) else {
            return false;
        };
        let range = max - min;
        if range == 0.0 {
            warn!(min, "zero range, normalization skipped");
            return false;
        }
        self.values.iter_mut().for_each(|v| *v = (*v - min) / range);
        true
    }

    fn first_position(&self, beats: impl Fn(f64, f64) -> bool) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &v) in self.values.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            if best.is_none_or(|b| beats(v, self.values[b])) {
                best = Some(i);
            }
        }
        best
    }

    fn dot_self(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    fn check_same_len(&self, other: &NumericVector, context: &'static str) -> Result<(), DataError> {
        if self.len() != other.len() {
            return Err(DataError::ShapeMismatch {
                context,
                expected: self.len(),
                found: other.len(),
            });
        }
        Ok(())
    }
}

impl From<Vec<f64>> for NumericVector {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

impl From<&[f64]> for NumericVector {
    fn from(values: &[f64]) -> Self {
        Self {
            values: values.to_vec(),
        }
    }
}

impl FromIterator<f64> for NumericVector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a NumericVector {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl Display for NumericVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v:?}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bounds_checked_access() {
        let mut v = NumericVector::from(vec![1.0, 2.0]);
        assert_eq!(v.get(1).unwrap(), 2.0);
        assert!(matches!(
            v.get(2),
            Err(DataError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(v.set(5, 1.0).is_err());
        assert_eq!(v.remove(0).unwrap(), 1.0);
        assert_eq!(v.as_slice(), &[2.0]);
    }

    #[test]
    fn test_extrema_report_first_position() {
        let v = NumericVector::from(vec![3.0, 7.0, 1.0, 7.0, 1.0]);
        assert_eq!(v.max(), Some(7.0));
        assert_eq!(v.max_index(), Some(1));
        assert_eq!(v.min(), Some(1.0));
        assert_eq!(v.min_index(), Some(2));
        assert_eq!(NumericVector::new().max_index(), None);
    }

    #[test]
    fn test_extrema_skip_nan() {
        let v = NumericVector::from(vec![f64::NAN, 2.0, 5.0]);
        assert_eq!(v.max_index(), Some(2));
        assert_eq!(v.min_index(), Some(1));
    }

    #[test]
    fn test_arithmetic() {
        let mut a = NumericVector::from(vec![1.0, 2.0, 3.0]);
        let b = NumericVector::from(vec![4.0, 5.0, 6.0]);
        assert_eq!(a.dot(&b).unwrap(), 32.0);
        a.add_assign(&b).unwrap();
        assert_eq!(a.as_slice(), &[5.0, 7.0, 9.0]);
        assert_eq!(b.add_scalar(1.0).as_slice(), &[5.0, 6.0, 7.0]);
        a.scale(2.0);
        assert_eq!(a.as_slice(), &[10.0, 14.0, 18.0]);
        assert_abs_diff_eq!(NumericVector::from(vec![3.0, 4.0]).norm(), 5.0);
        assert_eq!(b.mean(), Some(5.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let a = NumericVector::from(vec![1.0, 2.0]);
        let b = NumericVector::from(vec![1.0]);
        assert!(matches!(a.dot(&b), Err(DataError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_normalize() {
        let mut v = NumericVector::from(vec![2.0, 4.0, 6.0]);
        assert!(v.normalize());
        assert_eq!(v.as_slice(), &[0.0, 0.5, 1.0]);

        let mut flat = NumericVector::from(vec![3.0, 3.0]);
        assert!(!flat.normalize());
        assert_eq!(flat.as_slice(), &[3.0, 3.0]);
    }

    #[test]
    fn test_display() {
        let v = NumericVector::from(vec![1.0, 2.5]);
        assert_eq!(v.to_string(), "[1.0, 2.5]");
    }
}
