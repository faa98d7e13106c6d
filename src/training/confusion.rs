use std::fmt::{Display, Formatter};

use ndarray::Array2;

use super::TrainingError;

/// Counts of test rows by true class (row) and predicted class (column).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde_crate::Serialize, serde_crate::Deserialize),
    serde(crate = "serde_crate")
)]
pub struct ConfusionMatrix {
    classes: Vec<String>,
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    pub fn new(classes: Vec<String>) -> Self {
        let n = classes.len();
        Self {
            classes,
            counts: Array2::zeros((n, n)),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    fn position(&self, class: &str) -> Result<usize, TrainingError> {
        self.classes
            .iter()
            .position(|c| c == class)
            .ok_or_else(|| TrainingError::UnknownClass(class.to_string()))
    }

    /// Counts one test row.
    pub fn record(&mut self, actual: &str, predicted: &str) -> Result<(), TrainingError> {
        let cell = (self.position(actual)?, self.position(predicted)?);
        self.counts[cell] += 1;
        Ok(())
    }

    pub fn get(&self, actual: usize, predicted: usize) -> Option<usize> {
        self.counts.get((actual, predicted)).copied()
    }

    /// Number of test rows whose true class is `actual`.
    pub fn row_sum(&self, actual: usize) -> Option<usize> {
        (actual < self.classes.len()).then(|| self.counts.row(actual).sum())
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    /// Rows on the diagonal, i.e. correctly classified.
    pub fn correct(&self) -> usize {
        self.counts.diag().sum()
    }
}

impl Display for ConfusionMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let width = self
            .classes
            .iter()
            .map(String::len)
            .chain(self.counts.iter().map(|c| c.to_string().len()))
            .max()
            .unwrap_or(1);
        write!(f, "{:>width$}", "")?;
        for class in &self.classes {
            write!(f, " {class:>width$}")?;
        }
        writeln!(f)?;
        for (class, row) in self.classes.iter().zip(self.counts.rows()) {
            write!(f, "{class:>width$}")?;
            for count in row {
                write!(f, " {count:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
