use serde::{Deserialize, Serialize};
use std::fmt;

/// A single spreadsheet cell as delivered by the upload pipeline.
///
/// Serialized untagged so a dataset reads naturally as JSON:
/// `[["A","B"],[1,"text"],[null,2.5]]`. Any other JSON value (booleans,
/// arrays, objects) is kept as [`CellValue::Other`] and never reads as a
/// number, so only its row is dropped at projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
    Other(serde_json::Value),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Empty => Ok(()),
            CellValue::Other(value) => write!(f, "{}", value),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// Tabular data: row 0 is the header, rows 1..N hold the values.
///
/// Columns are positional. A name is resolved to an index against the header
/// each time a projection runs, so the dataset itself never caches lookups.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Builds a dataset from a header and value rows.
    ///
    /// # Examples
    /// ```
    /// use scatter3d::dataset::{CellValue, Dataset};
    ///
    /// let data = Dataset::from_parts(
    ///     &["A", "B", "C"],
    ///     vec![vec![1.into(), 2.into(), 3.into()]],
    /// );
    /// assert_eq!(data.column_index("B"), Some(1));
    /// assert_eq!(data.data_rows().len(), 1);
    /// ```
    pub fn from_parts(header: &[&str], rows: Vec<Vec<CellValue>>) -> Self {
        let mut all = Vec::with_capacity(rows.len() + 1);
        all.push(header.iter().map(|h| CellValue::from(*h)).collect());
        all.extend(rows);
        Self { rows: all }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> &[CellValue] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Header cells rendered as strings, in column order.
    pub fn header_names(&self) -> Vec<String> {
        self.header().iter().map(ToString::to_string).collect()
    }

    /// Everything after the header row.
    pub fn data_rows(&self) -> &[Vec<CellValue>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Resolves a column name to its position by exact match on the header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.header().iter().position(|cell| match cell {
            CellValue::Text(s) => s == name,
            CellValue::Number(_) => cell.to_string() == name,
            CellValue::Empty | CellValue::Other(_) => false,
        })
    }
}

impl From<Vec<Vec<CellValue>>> for Dataset {
    fn from(rows: Vec<Vec<CellValue>>) -> Self {
        Self::new(rows)
    }
}
