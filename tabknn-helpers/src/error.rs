use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the data layer: vectors, attributes, datasets and their files.
#[derive(Debug, Error)]
pub enum DataError {
    /// Two sequences that must line up have different lengths.
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    /// A row, column or element index past the end.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A value of the wrong kind was offered to a column.
    #[error("attribute `{attribute}` cannot hold value `{value}`")]
    TypeMismatch { attribute: String, value: String },

    /// The operation needs a qualitative label column as the last attribute.
    #[error("the last attribute is not a qualitative label column")]
    NoLabelColumn,

    /// A weight given as text did not parse.
    #[error("invalid weight `{0}`")]
    InvalidWeight(String),

    /// Min/max over an empty or NaN-polluted attribute.
    #[error("cannot compute extremum: {0}")]
    Extremum(#[from] ndarray_stats::errors::MinMaxError),

    #[error("file is empty: {0}")]
    EmptyFile(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tabular data: {0}")]
    Csv(#[from] csv::Error),
}

impl DataError {
    pub(crate) fn check_index(index: usize, len: usize) -> Result<(), DataError> {
        if index < len {
            Ok(())
        } else {
            Err(DataError::IndexOutOfRange { index, len })
        }
    }
}
