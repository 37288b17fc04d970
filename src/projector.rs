use crate::color::Rgb;
use crate::dataset::{CellValue, Dataset};
use crate::options::PointStyle;
use glam::Vec3;
use lazy_static::lazy_static;
use log::debug;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    // Longest numeric prefix after leading whitespace, the way a lenient
    // float parse reads "12.5kg" as 12.5.
    static ref NUMERIC_PREFIX: Regex =
        Regex::new(r"^\s*([+-]?(?:Infinity|(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?))")
            .unwrap();
}

/// The three column names mapped onto x, y and z.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSelection {
    pub x: String,
    pub y: String,
    pub z: String,
}

impl AxisSelection {
    pub fn new(x: impl Into<String>, y: impl Into<String>, z: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: z.into(),
        }
    }

    /// First three header columns, the selection an upload starts with.
    ///
    /// Returns `None` when the header has fewer than three columns.
    pub fn from_header(dataset: &Dataset) -> Option<Self> {
        let names = dataset.header_names();
        match names.as_slice() {
            [x, y, z, ..] => Some(Self::new(x.clone(), y.clone(), z.clone())),
            _ => None,
        }
    }

    /// True when any of the three names is blank.
    pub fn is_incomplete(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Column indices for x, y and z, or `None` if any name does not resolve.
    pub fn resolve(&self, dataset: &Dataset) -> Option<[usize; 3]> {
        Some([
            dataset.column_index(&self.x)?,
            dataset.column_index(&self.y)?,
            dataset.column_index(&self.z)?,
        ])
    }
}

/// A dataset row placed in 3D space with its display attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedPoint {
    pub position: Vec3,
    pub size: f32,
    pub color: Rgb,
}

/// Projects `dataset` onto points using the stock [`PointStyle`].
///
/// # Examples
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use scatter3d::dataset::{CellValue, Dataset};
/// use scatter3d::projector::{AxisSelection, project};
///
/// let data = Dataset::from_parts(
///     &["A", "B", "C"],
///     vec![
///         vec![1.into(), 2.into(), 3.into()],
///         vec![4.into(), 5.into(), "bad".into()],
///         vec![7.into(), 8.into(), 9.into()],
///     ],
/// );
/// let points = project(&data, &AxisSelection::new("A", "B", "C"), &mut StdRng::seed_from_u64(7));
/// assert_eq!(points.len(), 2);
/// ```
pub fn project<R: Rng + ?Sized>(
    dataset: &Dataset,
    axes: &AxisSelection,
    rng: &mut R,
) -> Vec<ProjectedPoint> {
    project_with(dataset, axes, &PointStyle::default(), rng)
}

/// Projects `dataset` onto points, drawing sizes and hues from `rng`.
///
/// Unresolved axes produce an empty result. Rows with a non-numeric, missing
/// or non-finite value on any selected column are skipped.
pub fn project_with<R: Rng + ?Sized>(
    dataset: &Dataset,
    axes: &AxisSelection,
    style: &PointStyle,
    rng: &mut R,
) -> Vec<ProjectedPoint> {
    let Some([xi, yi, zi]) = axes.resolve(dataset) else {
        debug!(
            "axes {:?}/{:?}/{:?} do not resolve against header, nothing to project",
            axes.x, axes.y, axes.z
        );
        return Vec::new();
    };

    let rows = dataset.data_rows();
    let mut points = Vec::with_capacity(rows.len());

    for row in rows {
        let (Some(x), Some(y), Some(z)) = (
            row.get(xi).and_then(parse_number),
            row.get(yi).and_then(parse_number),
            row.get(zi).and_then(parse_number),
        ) else {
            continue;
        };

        let base = if style.size_max > style.size_min {
            rng.gen_range(style.size_min..style.size_max)
        } else {
            style.size_min
        };
        let hue = rng.gen_range(0.0..360.0f32);

        points.push(ProjectedPoint {
            position: Vec3::new(x as f32, y as f32, z as f32),
            size: base * style.size_scale,
            color: Rgb::from_hsl(hue, style.saturation, style.lightness),
        });
    }

    debug!(
        "projected {} of {} rows onto {}/{}/{}",
        points.len(),
        rows.len(),
        axes.x,
        axes.y,
        axes.z
    );
    points
}

/// Reads a cell as a finite number.
///
/// Text is parsed leniently: leading whitespace is skipped and the longest
/// numeric prefix wins, so `" 3.5 m"` is 3.5 while `"m 3.5"` is nothing.
pub fn parse_number(cell: &CellValue) -> Option<f64> {
    let value = match cell {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            let caps = NUMERIC_PREFIX.captures(s)?;
            caps.get(1)?.as_str().parse::<f64>().ok()?
        }
        CellValue::Empty | CellValue::Other(_) => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn parses_plain_and_prefixed_numbers() {
        assert_eq!(parse_number(&text("42")), Some(42.0));
        assert_eq!(parse_number(&text("  -3.5")), Some(-3.5));
        assert_eq!(parse_number(&text("12.5kg")), Some(12.5));
        assert_eq!(parse_number(&text(".5")), Some(0.5));
        assert_eq!(parse_number(&text("1e3")), Some(1000.0));
        assert_eq!(parse_number(&text("1e")), Some(1.0));
        assert_eq!(parse_number(&CellValue::Number(7.25)), Some(7.25));
    }

    #[test]
    fn rejects_text_missing_and_non_finite() {
        assert_eq!(parse_number(&text("bad")), None);
        assert_eq!(parse_number(&text("")), None);
        assert_eq!(parse_number(&text("kg 12")), None);
        assert_eq!(parse_number(&text("Infinity")), None);
        assert_eq!(parse_number(&CellValue::Empty), None);
        assert_eq!(parse_number(&CellValue::Other(serde_json::Value::Bool(true))), None);
        assert_eq!(parse_number(&CellValue::Number(f64::NAN)), None);
        assert_eq!(parse_number(&CellValue::Number(f64::INFINITY)), None);
    }
}
