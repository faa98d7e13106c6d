use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tracing::{debug, info};

use crate::{Attribute, DataError, Instance, PreprocessingState, Value};

/// An immutable copy of a dataset's columns taken at a point in time.
///
/// Cloning a snapshot is cheap; restoring from one deep-copies the columns back.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    attributes: Arc<[Attribute]>,
}

impl Snapshot {
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Rebuilds a raw dataset holding the snapshot's columns.
    pub fn to_dataset(&self) -> Dataset {
        Dataset {
            attributes: self.attributes.to_vec(),
            preprocessing: PreprocessingState::Raw,
            original: None,
        }
    }
}

/// A table of equally long columns.
///
/// The last column is, by convention, the qualitative class label. A dataset is
/// owned by a single caller at a time; mutations are not synchronised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    attributes: Vec<Attribute>,
    preprocessing: PreprocessingState,
    original: Option<Snapshot>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dataset from columns, which must all have the same length.
    pub fn from_attributes(attributes: Vec<Attribute>) -> Result<Self, DataError> {
        if let Some(first) = attributes.first() {
            let rows = first.len();
            if let Some(bad) = attributes.iter().find(|a| a.len() != rows) {
                return Err(DataError::ShapeMismatch {
                    context: "attribute length",
                    expected: rows,
                    found: bad.len(),
                });
            }
        }
        Ok(Self {
            attributes,
            ..Self::default()
        })
    }

    /// Same columns (names, kinds, weights) without any rows.
    pub fn empty_like(&self) -> Self {
        Self {
            attributes: self.attributes.iter().map(Attribute::empty_like).collect(),
            preprocessing: self.preprocessing,
            original: None,
        }
    }

    /// Number of rows.
    pub fn num_cases(&self) -> usize {
        self.attributes.first().map_or(0, Attribute::len)
    }

    /// Number of columns, label included.
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_cases() == 0
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut [Attribute] {
        &mut self.attributes
    }

    pub fn set_attributes(&mut self, attributes: Vec<Attribute>) -> Result<(), DataError> {
        let checked = Self::from_attributes(attributes)?;
        self.attributes = checked.attributes;
        Ok(())
    }

    pub fn attribute(&self, index: usize) -> Result<&Attribute, DataError> {
        self.attributes.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.attributes.len(),
        })
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(Attribute::name).collect()
    }

    /// Index of the label column: the last column when it is qualitative.
    pub fn label_index(&self) -> Option<usize> {
        match self.attributes.last() {
            Some(Attribute::Qualitative(_)) => Some(self.attributes.len() - 1),
            _ => None,
        }
    }

    /// Row `index` as an [`Instance`], label split off when there is a label column.
    pub fn instance(&self, index: usize) -> Result<Instance, DataError> {
        DataError::check_index(index, self.num_cases())?;
        let label_index = self.label_index();
        let mut features = Vec::with_capacity(self.attributes.len());
        let mut label = None;
        for (column, attribute) in self.attributes.iter().enumerate() {
            let value = attribute.value(index)?;
            if Some(column) == label_index {
                label = Some(value.to_string());
            } else {
                features.push(value);
            }
        }
        Ok(Instance::new(features, label))
    }

    pub fn instances(&self) -> impl Iterator<Item = Result<Instance, DataError>> + '_ {
        (0..self.num_cases()).map(|i| self.instance(i))
    }

    /// Label of row `index`.
    pub fn label(&self, index: usize) -> Result<String, DataError> {
        let column = self.label_index().ok_or(DataError::NoLabelColumn)?;
        Ok(self.attributes[column].value(index)?.to_string())
    }

    /// Appends a row. Every column is validated before any is touched, so a
    /// failing append leaves the dataset unchanged.
    pub fn push_instance(&mut self, instance: &Instance) -> Result<(), DataError> {
        self.push_values(&instance.values())
    }

    /// Appends a row given as text tokens, one per column.
    pub fn push_row<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<(), DataError> {
        let values: Vec<Value> = tokens
            .iter()
            .map(|t| Value::Text(t.as_ref().trim().to_string()))
            .collect();
        self.push_values(&values)
    }

    fn push_values(&mut self, values: &[Value]) -> Result<(), DataError> {
        if values.len() != self.attributes.len() {
            return Err(DataError::ShapeMismatch {
                context: "row length",
                expected: self.attributes.len(),
                found: values.len(),
            });
        }
        let coerced = self
            .attributes
            .iter()
            .zip(values)
            .map(|(attribute, value)| attribute.coerce(value))
            .collect::<Result<Vec<_>, _>>()?;
        for (attribute, value) in self.attributes.iter_mut().zip(&coerced) {
            attribute.push(value)?;
        }
        Ok(())
    }

    pub fn delete_row(&mut self, index: usize) -> Result<(), DataError> {
        DataError::check_index(index, self.num_cases())?;
        for attribute in &mut self.attributes {
            attribute.remove(index)?;
        }
        Ok(())
    }

    pub fn weights(&self) -> Vec<f64> {
        self.attributes.iter().map(Attribute::weight).collect()
    }

    /// Weights of the quantitative, non-label columns, aligned with
    /// [`Instance::feature_vector`].
    pub fn feature_weights(&self) -> Vec<f64> {
        let label_index = self.label_index();
        self.attributes
            .iter()
            .enumerate()
            .filter(|(i, a)| Some(*i) != label_index && a.is_quantitative())
            .map(|(_, a)| a.weight())
            .collect()
    }

    /// Assigns one weight per column.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<(), DataError> {
        if weights.len() != self.attributes.len() {
            return Err(DataError::ShapeMismatch {
                context: "weights",
                expected: self.attributes.len(),
                found: weights.len(),
            });
        }
        for (attribute, &w) in self.attributes.iter_mut().zip(weights) {
            attribute.set_weight(w);
        }
        Ok(())
    }

    /// Parses and assigns one weight per column.
    pub fn set_weights_from_strs<S: AsRef<str>>(&mut self, weights: &[S]) -> Result<(), DataError> {
        let parsed = weights
            .iter()
            .map(|w| {
                let w = w.as_ref().trim();
                w.parse::<f64>()
                    .map_err(|_| DataError::InvalidWeight(w.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.set_weights(&parsed)
    }

    pub fn set_weight(&mut self, index: usize, weight: f64) -> Result<(), DataError> {
        let len = self.attributes.len();
        let attribute = self
            .attributes
            .get_mut(index)
            .ok_or(DataError::IndexOutOfRange { index, len })?;
        attribute.set_weight(weight);
        Ok(())
    }

    pub fn set_all_weights(&mut self, weight: f64) {
        self.attributes
            .iter_mut()
            .for_each(|a| a.set_weight(weight));
    }

    /// `[name: weight, ...]`
    pub fn weights_summary(&self) -> String {
        let parts: Vec<String> = self.attributes.iter().map(Attribute::summary).collect();
        format!("[{}]", parts.join(", "))
    }

    /// Distinct labels of the label column, in order of first appearance.
    pub fn classes(&self) -> Result<Vec<String>, DataError> {
        match self.attributes.last() {
            Some(Attribute::Qualitative(labels)) => Ok(labels.classes()),
            _ => Err(DataError::NoLabelColumn),
        }
    }

    pub fn preprocessing(&self) -> PreprocessingState {
        self.preprocessing
    }

    pub fn set_preprocessing(&mut self, state: PreprocessingState) {
        self.preprocessing = state;
    }

    /// Applies `state`'s transform to every quantitative column and records it.
    ///
    /// The current columns are kept as the original on first use.
    pub fn preprocess(&mut self, state: PreprocessingState) {
        self.mark_original();
        state.preprocessor().process(self);
        self.preprocessing = state;
        debug!(%state, rows = self.num_cases(), "dataset preprocessed");
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            attributes: Arc::from(self.attributes.as_slice()),
        }
    }

    /// Replaces the columns with a copy of the snapshot's.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.attributes = snapshot.attributes.to_vec();
    }

    /// Records the current columns as the original, unless one is already kept.
    pub fn mark_original(&mut self) -> bool {
        if self.original.is_some() {
            return false;
        }
        self.original = Some(self.snapshot());
        true
    }

    pub fn original(&self) -> Option<&Snapshot> {
        self.original.as_ref()
    }

    /// Brings back the columns recorded by [`Dataset::mark_original`].
    pub fn restore_original(&mut self) -> bool {
        match self.original.clone() {
            Some(snapshot) => {
                self.restore(&snapshot);
                self.preprocessing = PreprocessingState::Raw;
                info!("original dataset values restored");
                true
            }
            None => {
                info!("no original dataset recorded");
                false
            }
        }
    }
}

impl Display for Dataset {
    /// Renders the tabular text format: a header line, then one line per row.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.attribute_names().join(","))?;
        for row in 0..self.num_cases() {
            let mut cells = Vec::with_capacity(self.attributes.len());
            for attribute in &self.attributes {
                let value = attribute.value(row).map_err(|_| std::fmt::Error)?;
                cells.push(value.to_string());
            }
            writeln!(f, "{}", cells.join(","))?;
        }
        Ok(())
    }
}
