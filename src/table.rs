use std::collections::HashSet;
use thiserror::Error;

/// Named numeric columns sharing one row count.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Table {
    pub fn new(names: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self, TableError> {
        check_columns(&names, &columns)?;
        Ok(Self { names, columns })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.position(name).map(|i| &self.columns[i][..])
    }

    pub fn columns_len(&self) -> usize {
        self.columns.len()
    }

    pub fn rows_len(&self) -> usize {
        self.columns[0].len()
    }

    /// Separates `target` from the remaining columns.
    ///
    /// The returned matrix keeps the original column order.
    pub fn split_target(self, target: &str) -> Result<(Vec<f64>, FeatureMatrix), TableError> {
        let index = self
            .position(target)
            .ok_or_else(|| TableError::MissingColumn(target.to_owned()))?;
        if self.columns.len() == 1 {
            return Err(TableError::NoFeatures);
        }

        let Self {
            mut names,
            mut columns,
        } = self;
        names.remove(index);
        let target = columns.remove(index);
        Ok((target, FeatureMatrix { names, columns }))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Model input space: one column per feature, stored column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self, TableError> {
        check_columns(&names, &columns)?;
        Ok(Self { names, columns })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn features_len(&self) -> usize {
        self.columns.len()
    }

    pub fn rows_len(&self) -> usize {
        self.columns[0].len()
    }

    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn row(&self, index: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[index]).collect()
    }

    pub fn rows(&self) -> impl '_ + Iterator<Item = Vec<f64>> {
        (0..self.rows_len()).map(move |i| self.row(i))
    }
}

fn check_columns(names: &[String], columns: &[Vec<f64>]) -> Result<(), TableError> {
    if columns.is_empty() || columns[0].is_empty() {
        return Err(TableError::EmptyTable);
    }

    if names.len() != columns.len() {
        return Err(TableError::NameCountMismatch {
            names: names.len(),
            columns: columns.len(),
        });
    }

    let rows_len = columns[0].len();
    if columns.iter().skip(1).any(|c| c.len() != rows_len) {
        return Err(TableError::RowSizeMismatch);
    }

    let mut seen = HashSet::new();
    if let Some(name) = names.iter().find(|n| !seen.insert(n.as_str())) {
        return Err(TableError::DuplicateColumn(name.clone()));
    }
    Ok(())
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("table must have at least one column and one row")]
    EmptyTable,

    #[error("some of columns have a different row count from others")]
    RowSizeMismatch,

    #[error("{names} column names given for {columns} columns")]
    NameCountMismatch { names: usize, columns: usize },

    #[error("duplicate column name {0:?}")]
    DuplicateColumn(String),

    #[error("no such column: {0:?}")]
    MissingColumn(String),

    #[error("no feature columns remain after removing the target")]
    NoFeatures,
}
