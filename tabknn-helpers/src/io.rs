use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::info;

use crate::{Attribute, DataError, Dataset, Qualitative, Quantitative};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DataError + '_ {
    move |source| DataError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Column kinds come from the first data row: a cell that parses as a float makes
/// its column quantitative.
fn infer_attributes(headers: &StringRecord, first: &StringRecord) -> Vec<Attribute> {
    headers
        .iter()
        .zip(first.iter())
        .map(|(name, cell)| match cell.parse::<f64>() {
            Ok(_) => Attribute::from(Quantitative::new(name)),
            Err(_) => Attribute::from(Qualitative::new(name)),
        })
        .collect()
}

fn parse<R: Read>(source: R, path: &Path) -> Result<Dataset, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(source);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(DataError::EmptyFile(path.to_path_buf()));
    }

    let mut records = reader.records();
    let Some(first) = records.next().transpose()? else {
        let columns = headers
            .iter()
            .map(|name| Attribute::from(Qualitative::new(name)))
            .collect();
        return Dataset::from_attributes(columns);
    };

    let mut dataset = Dataset::from_attributes(infer_attributes(&headers, &first))?;
    dataset.push_row(&first.iter().collect::<Vec<_>>())?;
    for record in records {
        let record = record?;
        dataset.push_row(&record.iter().collect::<Vec<_>>())?;
    }
    Ok(dataset)
}

impl Dataset {
    /// Reads a dataset in the tabular text format.
    ///
    /// The first line names the columns, every later line is one row. The loaded
    /// columns are recorded as the original.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(io_error(path))?;
        let mut dataset = parse(file, path)?;
        dataset.mark_original();
        info!(
            path = %path.display(),
            rows = dataset.num_cases(),
            columns = dataset.num_attributes(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Writes the current columns in the tabular text format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(io_error(path))?;
        let mut writer = WriterBuilder::new().from_writer(file);
        writer.write_record(self.attribute_names())?;
        for row in 0..self.num_cases() {
            let cells = self
                .attributes()
                .iter()
                .map(|a| a.value(row).map(|v| v.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            writer.write_record(&cells)?;
        }
        writer.flush().map_err(io_error(path))?;
        info!(path = %path.display(), rows = self.num_cases(), "dataset saved");
        Ok(())
    }
}
