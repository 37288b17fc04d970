use crate::dataset::{CellValue, Dataset};
use log::debug;
use std::error::Error;
use std::fs;
use std::path::Path;

/// Load a dataset from a CSV file
///
/// The first line becomes the header row. Fields may be quoted, with doubled
/// quotes standing for a literal quote.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
///
/// # Returns
/// * `Result<Dataset, Box<dyn Error>>` - The loaded dataset or an error
///
/// # Examples
/// ```no_run
/// use scatter3d::loader::from_csv;
///
/// match from_csv("data.csv") {
///     Ok(data) => println!("Loaded {} data rows", data.data_rows().len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Dataset, Box<dyn Error>> {
    let text = fs::read_to_string(filepath)?;
    parse_csv(&text)
}

/// Parse CSV text into a dataset
///
/// Header fields are kept as text. In data rows, fields that parse as finite
/// numbers become [`CellValue::Number`], blank fields [`CellValue::Empty`] and
/// everything else [`CellValue::Text`]. Trailing blank lines are ignored.
pub fn parse_csv(text: &str) -> Result<Dataset, Box<dyn Error>> {
    let lines: Vec<&str> = text.lines().collect();
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(0, |i| i + 1);

    if end == 0 {
        return Err("CSV file is empty".into());
    }

    let mut rows = Vec::with_capacity(end);
    for (r, line) in lines[..end].iter().enumerate() {
        let fields = parse_csv_row(line)?;
        let row: Vec<CellValue> = fields
            .into_iter()
            .map(|field| if r == 0 { header_cell(field) } else { data_cell(field) })
            .collect();
        rows.push(row);
    }

    debug!("parsed CSV with {} data rows", rows.len() - 1);
    Ok(Dataset::new(rows))
}

/// Load a dataset from JSON: an array of rows, header first
pub fn from_json(filepath: impl AsRef<Path>) -> Result<Dataset, Box<dyn Error>> {
    let text = fs::read_to_string(filepath)?;
    let dataset: Dataset = serde_json::from_str(&text)?;
    if dataset.is_empty() {
        return Err("JSON dataset is empty".into());
    }
    Ok(dataset)
}

fn header_cell(field: String) -> CellValue {
    let name = field.trim();
    if name.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(name.to_string())
    }
}

fn data_cell(field: String) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(field),
    }
}

// Parse a CSV row into a vector of strings
fn parse_csv_row(line: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            _ => current_field.push(c),
        }
    }

    if in_quotes {
        return Err(format!("Unterminated quoted field in line: {}", line).into());
    }
    result.push(current_field);

    Ok(result)
}

/// Detect file type and load appropriate format
///
/// # Arguments
/// * `filepath` - Path to a `.csv` or `.json` file
///
/// # Returns
/// * `Result<Dataset, Box<dyn Error>>` - The loaded dataset or an error
pub fn load_dataset(filepath: impl AsRef<Path>) -> Result<Dataset, Box<dyn Error>> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => from_csv(path),
        Some("json") => from_json(path),
        Some(ext) => Err(format!("Unsupported file extension: {}", ext).into()),
        None => Err("File has no extension".into()),
    }
}
