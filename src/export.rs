use crate::error::Result;
use image::{ImageOutputFormat, RgbImage};
use log::info;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// File name hosts save snapshots under.
pub const SNAPSHOT_FILENAME: &str = "3d_scatter_plot.png";

/// Encodes an RGB image as PNG bytes.
///
/// # Arguments
/// * `image` - The pixels to encode
///
/// # Returns
/// * `Result<Vec<u8>>` - The PNG file contents
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(bytes)
}

/// Writes snapshot bytes to disk.
///
/// A directory `target` receives [`SNAPSHOT_FILENAME`]; anything else is used
/// as the file path. Returns the path written.
///
/// # Examples
/// ```no_run
/// use scatter3d::export::save_snapshot;
///
/// let png: Vec<u8> = Vec::new();
/// let path = save_snapshot(&png, ".").unwrap();
/// assert!(path.ends_with("3d_scatter_plot.png"));
/// ```
pub fn save_snapshot(bytes: &[u8], target: impl AsRef<Path>) -> Result<PathBuf> {
    let target = target.as_ref();
    let path = if target.is_dir() {
        target.join(SNAPSHOT_FILENAME)
    } else {
        target.to_path_buf()
    };
    fs::write(&path, bytes)?;
    info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_png_signature() {
        let png = encode_png(&RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]))).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
