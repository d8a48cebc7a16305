use crate::table::{Table, TableError};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    delimiter: u8,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Reads a delimited file whose first line names the columns.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Table, LoadError> {
        let path = path.as_ref();
        log::info!("loading {}", path.display());
        let file = File::open(path)?;
        self.load_from_reader(file)
    }

    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<Table, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let names = reader
            .headers()
            .map_err(LoadError::from_csv)?
            .iter()
            .map(|h| h.to_owned())
            .collect::<Vec<_>>();
        let mut columns = vec![Vec::new(); names.len()];

        for record in reader.records() {
            let record = record.map_err(LoadError::from_csv)?;
            let line = record.position().map_or(0, |p| p.line());
            for ((column, value), name) in columns.iter_mut().zip(record.iter()).zip(&names) {
                column.push(parse_cell(value, name, line)?);
            }
        }

        if columns.first().map_or(true, |c| c.is_empty()) {
            return Err(LoadError::Format {
                line: 1,
                message: "no data rows".to_owned(),
            });
        }

        let rows_len = columns[0].len();
        let table = Table::new(names, columns).map_err(|e| match e {
            TableError::DuplicateColumn(name) => LoadError::Format {
                line: 1,
                message: format!("duplicate column {:?}", name),
            },
            e => LoadError::Format {
                line: 1,
                message: e.to_string(),
            },
        })?;
        log::info!(
            "loaded {} rows x {} columns",
            rows_len,
            table.columns_len()
        );
        Ok(table)
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Shorthand for [`LoadOptions::load`] with a comma delimiter.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Table, LoadError> {
    LoadOptions::default().load(path)
}

fn parse_cell(value: &str, column: &str, line: u64) -> Result<f64, LoadError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(LoadError::Format {
            line,
            message: format!("column {:?}: {:?} is not a finite number", column, value),
        }),
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input at line {line}: {message}")]
    Format { line: u64, message: String },
}

impl LoadError {
    fn from_csv(e: csv::Error) -> Self {
        let line = e.position().map_or(0, |p| p.line());
        match e.into_kind() {
            csv::ErrorKind::Io(e) => Self::Io(e),
            csv::ErrorKind::UnequalLengths {
                expected_len, len, ..
            } => Self::Format {
                line,
                message: format!("expected {} fields, found {}", expected_len, len),
            },
            kind => Self::Format {
                line,
                message: format!("{:?}", kind),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn load_well_formed_csv() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "A,B,C,target")?;
        writeln!(file, "1,0,2.5,1")?;
        writeln!(file, "0,1,-3,0")?;
        writeln!(file, "1,1, 4 ,1")?;

        let table = load_csv(file.path())?;
        assert_eq!(table.rows_len(), 3);
        assert_eq!(table.columns_len(), 4);
        assert_eq!(table.names(), &["A", "B", "C", "target"]);
        assert_eq!(table.column("C"), Some(&[2.5, -3.0, 4.0][..]));
        Ok(())
    }

    #[test]
    fn custom_delimiter() -> anyhow::Result<()> {
        let input = "a;b\n1;2\n3;4\n";
        let table = LoadOptions::new()
            .delimiter(b';')
            .load_from_reader(input.as_bytes())?;
        assert_eq!(table.column("b"), Some(&[2.0, 4.0][..]));
        Ok(())
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_csv(dir.path().join("missing.csv"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn ragged_rows_are_format_error() {
        let input = "a,b,c\n1,2,3\n4,5\n";
        let result = LoadOptions::new().load_from_reader(input.as_bytes());
        assert!(matches!(result, Err(LoadError::Format { line: 3, .. })));
    }

    #[test]
    fn non_numeric_cell_is_format_error() {
        let input = "a,b\n1,x\n";
        let result = LoadOptions::new().load_from_reader(input.as_bytes());
        assert!(matches!(result, Err(LoadError::Format { line: 2, .. })));
    }

    #[test]
    fn header_only_is_format_error() {
        let input = "a,b\n";
        let result = LoadOptions::new().load_from_reader(input.as_bytes());
        assert!(matches!(result, Err(LoadError::Format { .. })));
    }

    #[test]
    fn duplicate_header_is_format_error() {
        let input = "a,a\n1,2\n";
        let result = LoadOptions::new().load_from_reader(input.as_bytes());
        assert!(matches!(result, Err(LoadError::Format { line: 1, .. })));
    }
}
