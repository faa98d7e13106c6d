use std::fmt::{Display, Formatter};

use tracing::debug;

use crate::{Attribute, DataError, Dataset, Instance};

/// Label written into the temporary row appended by [`Dataset::prepare_query`].
pub const QUERY_PLACEHOLDER: &str = "?";

/// Which transform has been applied to a dataset's quantitative columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
pub enum PreprocessingState {
    #[default]
    Raw,
    Normalized,
    Standardized,
}

impl PreprocessingState {
    pub fn preprocessor(self) -> &'static dyn Preprocessor {
        match self {
            PreprocessingState::Raw => &RawData,
            PreprocessingState::Normalized => &Normalization,
            PreprocessingState::Standardized => &Standardization,
        }
    }
}

impl Display for PreprocessingState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingState::Raw => write!(f, "raw"),
            PreprocessingState::Normalized => write!(f, "normalized"),
            PreprocessingState::Standardized => write!(f, "standardized"),
        }
    }
}

/// A transform over every quantitative column of a dataset.
///
/// Qualitative columns are never touched. The processed columns are returned
/// borrowed from the dataset, which is modified in place.
pub trait Preprocessor {
    fn process<'a>(&self, dataset: &'a mut Dataset) -> &'a [Attribute];
}

/// Leaves the data as loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawData;

/// Min-max rescaling into `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalization;

/// Z-score standardisation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standardization;

impl Preprocessor for RawData {
    fn process<'a>(&self, dataset: &'a mut Dataset) -> &'a [Attribute] {
        dataset.attributes()
    }
}

impl Preprocessor for Normalization {
    fn process<'a>(&self, dataset: &'a mut Dataset) -> &'a [Attribute] {
        for column in dataset.attributes_mut() {
            if let Some(column) = column.as_quantitative_mut() {
                column.normalize();
            }
        }
        dataset.attributes()
    }
}

impl Preprocessor for Standardization {
    fn process<'a>(&self, dataset: &'a mut Dataset) -> &'a [Attribute] {
        for column in dataset.attributes_mut() {
            if let Some(column) = column.as_quantitative_mut() {
                column.standardize();
            }
        }
        dataset.attributes()
    }
}

impl Dataset {
    /// Puts a raw query row through the same transform this dataset went through.
    ///
    /// The original (raw) columns are copied and the query appended to them, with
    /// a placeholder label if it has none. The recorded preprocessing is re-applied
    /// and the processed row read back and removed again. Returns the processed
    /// reference data to classify against and the unlabeled query. Without a
    /// recorded original, the current columns are taken to be raw.
    pub fn prepare_query<S: AsRef<str>>(
        &self,
        tokens: &[S],
    ) -> Result<(Dataset, Instance), DataError> {
        let mut reference = match self.original() {
            Some(original) => original.to_dataset(),
            None => Dataset::from_attributes(self.attributes().to_vec())?,
        };
        reference.set_weights(&self.weights())?;

        let mut row: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
        if self.label_index().is_some() && row.len() + 1 == self.num_attributes() {
            row.push(QUERY_PLACEHOLDER);
        }
        reference.push_row(&row)?;

        let state = self.preprocessing();
        state.preprocessor().process(&mut reference);
        reference.set_preprocessing(state);

        let last = reference.num_cases() - 1;
        let mut query = reference.instance(last)?;
        reference.delete_row(last)?;
        query.strip_label();
        debug!(%state, %query, "query prepared");
        Ok((reference, query))
    }
}
