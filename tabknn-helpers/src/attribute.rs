use std::fmt::{Display, Formatter};

use ndarray_stats::QuantileExt;
use tracing::warn;

use crate::{DataError, NumericVector, Value};

const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Quantitative,
    Qualitative,
}

/// A numeric column.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
pub struct Quantitative {
    name: String,
    weight: f64,
    values: NumericVector,
}

impl Quantitative {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_values(name, NumericVector::new())
    }

    pub fn with_values(name: impl Into<String>, values: impl Into<NumericVector>) -> Self {
        Self {
            name: name.into(),
            weight: DEFAULT_WEIGHT,
            values: values.into(),
        }
    }

    pub fn values(&self) -> &NumericVector {
        &self.values
    }

    pub fn set_values(&mut self, values: NumericVector) {
        self.values = values;
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn min(&self) -> Result<f64, DataError> {
        Ok(*self.values.view().min()?)
    }

    pub fn max(&self) -> Result<f64, DataError> {
        Ok(*self.values.view().max()?)
    }

    /// `None` for an empty column.
    pub fn mean(&self) -> Option<f64> {
        self.values.mean()
    }

    /// Population standard deviation; zero for an empty column.
    pub fn std_dev(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.view().std(0.0)
    }

    /// Applies `(x - mean) / std_dev` in place.
    ///
    /// Returns `false` and leaves the values untouched when the deviation is zero.
    pub fn standardize(&mut self) -> bool {
        let Some(mean) = self.mean() else {
            return false;
        };
        let std_dev = self.std_dev();
        if std_dev == 0.0 {
            warn!(attribute = %self.name, "zero deviation, standardization skipped");
            return false;
        }
        self.values = self.values.iter().map(|v| (v - mean) / std_dev).collect();
        true
    }

    /// Rescales the column into `[0, 1]`; a constant column is left untouched.
    pub fn normalize(&mut self) -> bool {
        self.values.normalize()
    }
}

/// A categorical column.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
pub struct Qualitative {
    name: String,
    weight: f64,
    values: Vec<String>,
}

impl Qualitative {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_values(name, Vec::new())
    }

    pub fn with_values(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            weight: DEFAULT_WEIGHT,
            values,
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn push(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    /// Distinct values in order of first appearance.
    pub fn classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = Vec::new();
        for value in &self.values {
            if !classes.contains(value) {
                classes.push(value.clone());
            }
        }
        classes
    }

    pub fn class_count(&self) -> usize {
        self.classes().len()
    }

    /// Relative frequency of each class, in [`Qualitative::classes`] order.
    pub fn frequencies(&self) -> Vec<f64> {
        let total = self.values.len() as f64;
        self.classes()
            .iter()
            .map(|class| self.values.iter().filter(|v| *v == class).count() as f64 / total)
            .collect()
    }
}

/// One column of a [`crate::Dataset`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
pub enum Attribute {
    Quantitative(Quantitative),
    Qualitative(Qualitative),
}

impl Attribute {
    pub fn name(&self) -> &str {
        match self {
            Attribute::Quantitative(a) => &a.name,
            Attribute::Qualitative(a) => &a.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Attribute::Quantitative(a) => a.name = name,
            Attribute::Qualitative(a) => a.name = name,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Attribute::Quantitative(a) => a.weight,
            Attribute::Qualitative(a) => a.weight,
        }
    }

    pub fn set_weight(&mut self, weight: f64) {
        match self {
            Attribute::Quantitative(a) => a.weight = weight,
            Attribute::Qualitative(a) => a.weight = weight,
        }
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            Attribute::Quantitative(_) => AttributeKind::Quantitative,
            Attribute::Qualitative(_) => AttributeKind::Qualitative,
        }
    }

    pub fn is_quantitative(&self) -> bool {
        self.kind() == AttributeKind::Quantitative
    }

    pub fn as_quantitative(&self) -> Option<&Quantitative> {
        match self {
            Attribute::Quantitative(a) => Some(a),
            Attribute::Qualitative(_) => None,
        }
    }

    pub fn as_quantitative_mut(&mut self) -> Option<&mut Quantitative> {
        match self {
            Attribute::Quantitative(a) => Some(a),
            Attribute::Qualitative(_) => None,
        }
    }

    pub fn as_qualitative(&self) -> Option<&Qualitative> {
        match self {
            Attribute::Qualitative(a) => Some(a),
            Attribute::Quantitative(_) => None,
        }
    }

    /// Row count.
    pub fn len(&self) -> usize {
        match self {
            Attribute::Quantitative(a) => a.values.len(),
            Attribute::Qualitative(a) => a.values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self, index: usize) -> Result<Value, DataError> {
        match self {
            Attribute::Quantitative(a) => a.values.get(index).map(Value::Number),
            Attribute::Qualitative(a) => a
                .values
                .get(index)
                .map(|s| Value::Text(s.clone()))
                .ok_or(DataError::IndexOutOfRange {
                    index,
                    len: a.values.len(),
                }),
        }
    }

    /// Converts `value` into the representation this column stores.
    ///
    /// Numbers become text in a qualitative column; text is parsed in a
    /// quantitative one and rejected if it is not numeric.
    pub fn coerce(&self, value: &Value) -> Result<Value, DataError> {
        match (self, value) {
            (Attribute::Quantitative(_), Value::Number(_)) => Ok(value.clone()),
            (Attribute::Quantitative(a), Value::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| DataError::TypeMismatch {
                    attribute: a.name.clone(),
                    value: s.clone(),
                }),
            (Attribute::Qualitative(_), Value::Text(_)) => Ok(value.clone()),
            (Attribute::Qualitative(_), Value::Number(_)) => Ok(Value::Text(value.to_string())),
        }
    }

    pub fn push(&mut self, value: &Value) -> Result<(), DataError> {
        let value = self.coerce(value)?;
        match (self, value) {
            (Attribute::Quantitative(a), Value::Number(n)) => a.values.push(n),
            (Attribute::Qualitative(a), Value::Text(s)) => a.values.push(s),
            (attribute, value) => {
                return Err(DataError::TypeMismatch {
                    attribute: attribute.name().to_string(),
                    value: value.to_string(),
                })
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<(), DataError> {
        match self {
            Attribute::Quantitative(a) => a.values.remove(index).map(|_| ()),
            Attribute::Qualitative(a) => {
                DataError::check_index(index, a.values.len())?;
                a.values.remove(index);
                Ok(())
            }
        }
    }

    pub fn clear(&mut self) {
        match self {
            Attribute::Quantitative(a) => a.values.clear(),
            Attribute::Qualitative(a) => a.values.clear(),
        }
    }

    /// Same name, kind and weight, no values.
    pub fn empty_like(&self) -> Attribute {
        let mut empty = self.clone();
        empty.clear();
        empty
    }

    /// `name: weight`
    pub fn summary(&self) -> String {
        format!("{}: {}", self.name(), self.weight())
    }
}

impl From<Quantitative> for Attribute {
    fn from(a: Quantitative) -> Self {
        Attribute::Quantitative(a)
    }
}

impl From<Qualitative> for Attribute {
    fn from(a: Qualitative) -> Self {
        Attribute::Qualitative(a)
    }
}

impl Display for Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribute::Quantitative(a) => write!(f, "{}", a.values),
            Attribute::Qualitative(a) => write!(f, "[{}]", a.values.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ages() -> Quantitative {
        Quantitative::with_values("age", vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
    }

    #[test]
    fn test_quantitative_statistics() {
        let a = ages();
        assert_eq!(a.min().unwrap(), 2.0);
        assert_eq!(a.max().unwrap(), 9.0);
        assert_eq!(a.mean(), Some(5.0));
        assert_abs_diff_eq!(a.std_dev(), 2.0);
    }

    #[test]
    fn test_empty_quantitative_statistics() {
        let a = Quantitative::new("empty");
        assert!(matches!(a.min(), Err(DataError::Extremum(_))));
        assert_eq!(a.mean(), None);
        assert_eq!(a.std_dev(), 0.0);
    }

    #[test]
    fn test_standardize() {
        let mut a = ages();
        assert!(a.standardize());
        assert_abs_diff_eq!(a.mean().unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a.std_dev(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_standardize_constant_column_is_noop() {
        let mut a = Quantitative::with_values("flat", vec![3.0, 3.0, 3.0]);
        assert!(!a.standardize());
        assert_eq!(a.values().as_slice(), &[3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_qualitative_classes_and_frequencies() {
        let colours = Qualitative::with_values(
            "colour",
            ["red", "green", "red", "blue"].map(String::from).to_vec(),
        );
        assert_eq!(colours.classes(), vec!["red", "green", "blue"]);
        assert_eq!(colours.class_count(), 3);
        assert_eq!(colours.frequencies(), vec![0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_push_coerces_by_kind() {
        let mut numeric: Attribute = Quantitative::new("x").into();
        numeric.push(&Value::from("2.5")).unwrap();
        assert!(matches!(
            numeric.push(&Value::from("abc")),
            Err(DataError::TypeMismatch { .. })
        ));
        assert_eq!(numeric.len(), 1);

        let mut label: Attribute = Qualitative::new("class").into();
        label.push(&Value::Number(1.0)).unwrap();
        assert_eq!(label.value(0).unwrap(), Value::Text("1.0".into()));
    }

    #[test]
    fn test_weight_and_empty_like() {
        let mut a: Attribute = ages().into();
        assert_eq!(a.weight(), 1.0);
        a.set_weight(0.25);
        let empty = a.empty_like();
        assert!(empty.is_empty());
        assert_eq!(empty.weight(), 0.25);
        assert_eq!(empty.name(), "age");
        assert_eq!(empty.kind(), AttributeKind::Quantitative);
        assert_eq!(a.summary(), "age: 0.25");
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut a: Attribute = Qualitative::new("c").into();
        assert!(matches!(
            a.remove(0),
            Err(DataError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }
}
