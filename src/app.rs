use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::dataset::Dataset;
use crate::engine::{SceneEngine, SceneInput};
use crate::error::EngineError;
use crate::export::SNAPSHOT_FILENAME;
use crate::options::SceneOptions;
use crate::projector::AxisSelection;
use crate::renderer::SoftwareContext;
use crate::shape::Shape;
use crate::surface::DisplaySurface;

pub struct AppState {
    options: SceneOptions,
    max_frames: u32,
}

impl AppState {
    /// Frames a single request may ask for unless configured otherwise.
    pub const DEFAULT_MAX_FRAMES: u32 = 600;

    pub fn new(options: SceneOptions) -> Self {
        Self {
            options,
            max_frames: Self::DEFAULT_MAX_FRAMES,
        }
    }

    pub fn with_max_frames(mut self, max_frames: u32) -> Self {
        self.max_frames = max_frames;
        self
    }
}

#[derive(Deserialize)]
pub struct ScatterRequest {
    pub data: Dataset,
    /// Defaults to the first three header columns.
    pub axes: Option<AxisSelection>,
    /// Unknown names draw spheres.
    #[serde(default)]
    pub shape: String,
    pub width: Option<u32>,
    pub frames: Option<u32>,
    pub seed: Option<u64>,
}

#[derive(Serialize)]
struct HeadersResponse {
    headers: Vec<String>,
    axes: Option<AxisSelection>,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/scatter3d", post(render_scatter))
        .route("/api/headers", post(dataset_headers))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(addr: &str, options: SceneOptions) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(AppState::new(options)));

    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Renders the request's dataset and returns the snapshot as a PNG download.
///
/// Answers `400` when more frames are requested than the server allows,
/// `204 No Content` when the input gives nothing to draw and `500` when no
/// renderer could be created.
pub async fn render_scatter(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScatterRequest>,
) -> Response {
    if let Some(frames) = request.frames.filter(|&f| f > state.max_frames) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("{} frames requested, at most {} allowed", frames, state.max_frames),
        );
    }

    let options = state.options.clone();
    let rendered = tokio::task::spawn_blocking(move || render_png(options, request)).await;

    match rendered {
        Ok(Ok(Some(png))) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "image/png".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", SNAPSHOT_FILENAME),
                ),
            ],
            png,
        )
            .into_response(),
        Ok(Ok(None)) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(e)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("render task failed: {}", e),
        ),
    }
}

fn render_png(options: SceneOptions, request: ScatterRequest) -> Result<Option<Vec<u8>>, EngineError> {
    let Some(axes) = request
        .axes
        .or_else(|| AxisSelection::from_header(&request.data))
    else {
        return Ok(None);
    };

    let width = request.width.unwrap_or(options.surface.fallback_width);
    let mut engine = SceneEngine::new(Box::new(SoftwareContext::new()), options);
    if let Some(seed) = request.seed {
        engine = engine.with_rng(StdRng::seed_from_u64(seed));
    }

    let surface = DisplaySurface::new(width);
    let input = SceneInput::new(request.data, axes, Shape::from_name(&request.shape));
    engine.mount(input, Some(&surface))?;

    for _ in 0..request.frames.unwrap_or(1) {
        engine.tick()?;
    }
    let png = engine.capture_image();
    engine.dispose();
    Ok(png)
}

async fn dataset_headers(Json(data): Json<Dataset>) -> impl IntoResponse {
    Json(HeadersResponse {
        headers: data.header_names(),
        axes: AxisSelection::from_header(&data),
    })
}

fn error_response(status: StatusCode, message: String) -> Response {
    warn!("scatter3d request failed: {}", message);
    (
        status,
        Json(ErrorResponse {
            status: "error".to_string(),
            message,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CellValue;

    fn state() -> State<Arc<AppState>> {
        State(Arc::new(AppState::new(SceneOptions::default())))
    }

    fn request(axes: Option<AxisSelection>) -> ScatterRequest {
        ScatterRequest {
            data: Dataset::from_parts(
                &["A", "B", "C"],
                vec![
                    vec![CellValue::from(1), CellValue::from(2), CellValue::from(3)],
                    vec![CellValue::from(7), CellValue::from(8), CellValue::from(9)],
                ],
            ),
            axes,
            shape: "cube".to_string(),
            width: Some(320),
            frames: Some(2),
            seed: Some(3),
        }
    }

    #[tokio::test]
    async fn renders_png_download() {
        let response = render_scatter(state(), Json(request(None))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"3d_scatter_plot.png\""
        );
    }

    #[tokio::test]
    async fn unknown_axes_give_no_content() {
        let axes = AxisSelection::new("A", "B", "missing");
        let response = render_scatter(state(), Json(request(Some(axes)))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn oversized_surface_is_a_server_error() {
        let mut req = request(None);
        req.width = Some(SoftwareContext::DEFAULT_MAX_DIMENSION + 1);
        let response = render_scatter(state(), Json(req)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn too_many_frames_is_a_bad_request() {
        let mut req = request(None);
        req.frames = Some(u32::MAX);
        let response = render_scatter(state(), Json(req)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let limited = State(Arc::new(AppState::new(SceneOptions::default()).with_max_frames(3)));
        let mut req = request(None);
        req.frames = Some(4);
        let response = render_scatter(limited.clone(), Json(req)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut req = request(None);
        req.frames = Some(3);
        let response = render_scatter(limited, Json(req)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
