use std::fmt::{Display, Formatter};

use crate::NumericVector;

/// A single cell of a row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric if the token parses as a float, text otherwise.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(token.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n:?}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// One row of a dataset: feature values plus an optional class label.
///
/// The label is held apart from the features, so [`Instance::feature_vector`]
/// never has to guess which trailing slot to skip.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
pub struct Instance {
    features: Vec<Value>,
    label: Option<String>,
}

impl Instance {
    pub fn new(features: Vec<Value>, label: Option<String>) -> Self {
        Self { features, label }
    }

    pub fn labeled(features: Vec<Value>, label: impl Into<String>) -> Self {
        Self::new(features, Some(label.into()))
    }

    pub fn unlabeled(features: Vec<Value>) -> Self {
        Self::new(features, None)
    }

    /// Builds an instance from numeric features only.
    pub fn from_numbers(features: &[f64], label: Option<&str>) -> Self {
        Self::new(
            features.iter().copied().map(Value::Number).collect(),
            label.map(str::to_string),
        )
    }

    /// Parses a comma-separated row. With `labeled`, the last token becomes the label.
    pub fn from_delimited(line: &str, labeled: bool) -> Self {
        let mut tokens: Vec<&str> = line.split(',').map(str::trim).collect();
        let label = if labeled {
            tokens.pop().map(str::to_string)
        } else {
            None
        };
        Self::new(tokens.into_iter().map(Value::parse).collect(), label)
    }

    pub fn features(&self) -> &[Value] {
        &self.features
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Features followed by the label, as stored in a dataset row.
    pub fn values(&self) -> Vec<Value> {
        let mut values = self.features.clone();
        if let Some(label) = &self.label {
            values.push(Value::Text(label.clone()));
        }
        values
    }

    /// Number of cells, label included.
    pub fn len(&self) -> usize {
        self.features.len() + usize::from(self.label.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The numeric features in order. Text features and the label are skipped.
    pub fn feature_vector(&self) -> NumericVector {
        self.features.iter().filter_map(Value::as_number).collect()
    }

    pub fn strip_label(&mut self) -> Option<String> {
        self.label.take()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Rescales the numeric features of this row into `[0, 1]`.
    pub fn normalize(&mut self) -> bool {
        let mut numbers = self.feature_vector();
        if !numbers.normalize() {
            return false;
        }
        self.replace_numbers(&numbers);
        true
    }

    /// Centres the numeric features of this row on their mean and divides by
    /// their population standard deviation. A constant row is left as is.
    pub fn standardize(&mut self) -> bool {
        let numbers = self.feature_vector();
        let Some(mean) = numbers.mean() else {
            return false;
        };
        let std_dev = numbers.view().std(0.0);
        if std_dev == 0.0 {
            return false;
        }
        let scaled: NumericVector = numbers.iter().map(|v| (v - mean) / std_dev).collect();
        self.replace_numbers(&scaled);
        true
    }

    fn replace_numbers(&mut self, numbers: &NumericVector) {
        let mut replacements = numbers.iter();
        for value in &mut self.features {
            if let Value::Number(n) = value {
                if let Some(&replacement) = replacements.next() {
                    *n = replacement;
                }
            }
        }
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.values().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}
