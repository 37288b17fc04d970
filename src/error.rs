use thiserror::Error;

/// Errors raised by the scene engine.
///
/// Degenerate input (unknown axis, empty dataset, unparsable rows) is never an
/// error; it simply renders nothing. Only failures with no degraded mode end up
/// here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The graphics context refused to hand out a renderer.
    #[error("graphics context unavailable: {0}")]
    ContextUnavailable(String),

    /// Rasterising a frame failed.
    #[error("render failed: {0}")]
    Render(String),

    /// Encoding the drawing buffer as PNG failed.
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
