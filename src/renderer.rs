//! Renderer seam and the software rasteriser.
//!
//! The engine only talks to [`GraphicsContext`] and [`Renderer`]. The bundled
//! [`SoftwareContext`] hands out [`SoftwareRenderer`]s, which draw a [`Scene`]
//! into an RGB buffer with plotters: painter's-order flat-shaded triangles,
//! alpha-blended edges and additive glow halos.

use crate::camera::{PerspectiveCamera, ScreenPoint};
use crate::color::Rgb;
use crate::error::{EngineError, Result};
use crate::scene::{Light, Scene};
use glam::Vec3;
use image::RgbImage;
use log::{debug, trace};
use plotters::coord::Shift;
use plotters::prelude::*;
#[cfg(feature = "fonts")]
use plotters::style::text_anchor::{HPos, Pos, VPos};

// Share of incoming light applied to the albedo, and the self-lit share.
const AMBIENT_WEIGHT: f32 = 0.35;
const DIFFUSE_WEIGHT: f32 = 0.3;
const EMISSIVE_WEIGHT: f32 = 0.45;

/// What a renderer is asked for at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    /// Keep pixels after a frame is presented so they can be read back.
    pub preserve_drawing_buffer: bool,
}

/// Source of renderers. Acquisition may fail; there is no fallback.
pub trait GraphicsContext: Send {
    fn create_renderer(&mut self, config: &RendererConfig) -> Result<Box<dyn Renderer>>;
}

/// Draws scenes into a pixel buffer of a given size.
pub trait Renderer: Send {
    /// Reallocates the drawing buffer. Sizes the renderer cannot hold are
    /// refused and the current size is kept.
    fn set_size(&mut self, width: u32, height: u32) -> Result<()>;

    fn size(&self) -> (u32, u32);

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()>;

    /// Current drawing buffer, or `None` once disposed.
    fn read_pixels(&self) -> Option<RgbImage>;

    /// Frees the drawing buffer. Calling it again is a no-op.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;

    fn frames_rendered(&self) -> u64;
}

/// In-process graphics context backed by [`SoftwareRenderer`].
///
/// Refuses renderers larger than `max_dimension` on either side, the same
/// way a GPU context refuses textures beyond its limit.
#[derive(Debug, Clone)]
pub struct SoftwareContext {
    max_dimension: u32,
}

impl SoftwareContext {
    pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

    pub fn new() -> Self {
        Self {
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl Default for SoftwareContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsContext for SoftwareContext {
    fn create_renderer(&mut self, config: &RendererConfig) -> Result<Box<dyn Renderer>> {
        check_dimensions(config.width, config.height, self.max_dimension)?;
        Ok(Box::new(SoftwareRenderer::new(config).with_max_dimension(self.max_dimension)))
    }
}

fn check_dimensions(width: u32, height: u32, max_dimension: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(EngineError::ContextUnavailable(format!(
            "cannot create a {}x{} drawing buffer",
            width, height
        )));
    }
    if width > max_dimension || height > max_dimension {
        return Err(EngineError::ContextUnavailable(format!(
            "{}x{} exceeds the maximum drawing buffer size of {}",
            width, height, max_dimension
        )));
    }
    Ok(())
}

/// CPU renderer drawing into a packed RGB8 buffer.
pub struct SoftwareRenderer {
    width: u32,
    height: u32,
    max_dimension: u32,
    buffer: Vec<u8>,
    preserve_drawing_buffer: bool,
    disposed: bool,
    frames: u64,
}

impl SoftwareRenderer {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            max_dimension: SoftwareContext::DEFAULT_MAX_DIMENSION,
            buffer: vec![0; buffer_len(config.width, config.height)],
            preserve_drawing_buffer: config.preserve_drawing_buffer,
            disposed: false,
            frames: 0,
        }
    }

    /// Largest width or height [`Renderer::set_size`] accepts.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
        let (width, height) = (self.width, self.height);
        let desc = scene.description();
        let frame = FrameLayout::collect(scene, camera, width, height);

        {
            let root = BitMapBackend::with_buffer(&mut self.buffer, (width, height))
                .into_drawing_area();
            root.fill(&to_plotters(desc.background)).map_err(render_err)?;

            for (a, b, color) in &frame.helpers {
                root.draw(&PathElement::new(vec![*a, *b], to_plotters(*color)))
                    .map_err(render_err)?;
            }
            root.present().map_err(render_err)?;
        }

        for glow in &frame.glows {
            additive_glow(&mut self.buffer, width, height, glow);
        }

        {
            let root = BitMapBackend::with_buffer(&mut self.buffer, (width, height))
                .into_drawing_area();

            for item in &frame.items {
                match item {
                    DrawItem::Triangle { points, color, .. } => {
                        root.draw(&Polygon::new(points.to_vec(), to_plotters(*color).filled()))
                            .map_err(render_err)?;
                    }
                    DrawItem::Line { a, b, color, opacity, .. } => {
                        let style = to_plotters(*color).mix(*opacity as f64).stroke_width(2);
                        root.draw(&PathElement::new(vec![*a, *b], style))
                            .map_err(render_err)?;
                    }
                    DrawItem::Label { at, text, color, px, .. } => {
                        draw_label(&root, text, *at, *color, *px)?;
                    }
                }
            }
            root.present().map_err(render_err)?;
        }

        trace!(
            "frame {}: {} helper lines, {} glows, {} depth-sorted items",
            self.frames,
            frame.helpers.len(),
            frame.glows.len(),
            frame.items.len()
        );
        Ok(())
    }
}

impl Renderer for SoftwareRenderer {
    fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        if self.disposed || (width == self.width && height == self.height) {
            return Ok(());
        }
        check_dimensions(width, height, self.max_dimension)?;
        self.width = width;
        self.height = height;
        self.buffer = vec![0; buffer_len(width, height)];
        debug!("software renderer resized to {}x{}", width, height);
        Ok(())
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
        if self.disposed {
            debug!("render skipped, renderer already disposed");
            return Ok(());
        }
        self.draw(scene, camera)?;
        self.frames += 1;
        if !self.preserve_drawing_buffer {
            // Presented frames are handed off and the buffer starts cleared.
            self.buffer.fill(0);
        }
        Ok(())
    }

    fn read_pixels(&self) -> Option<RgbImage> {
        if self.disposed {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.buffer.clone())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.buffer = Vec::new();
        debug!("software renderer disposed after {} frames", self.frames);
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn frames_rendered(&self) -> u64 {
        self.frames
    }
}

/// Draws axis label text centred on `at`.
#[cfg(feature = "fonts")]
fn draw_label<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    text: &str,
    at: Px,
    color: Rgb,
    px: f32,
) -> Result<()> {
    let style = ("sans-serif", px as f64)
        .into_font()
        .color(&to_plotters(color))
        .pos(Pos::new(HPos::Center, VPos::Center));
    // A missing system font costs the label, not the frame.
    if let Err(e) = root.draw(&Text::new(text, at, style)) {
        log::warn!("axis label '{}' not drawn: {}", text, e);
    }
    Ok(())
}

/// Without a font backend the label is outlined where its text would sit.
#[cfg(not(feature = "fonts"))]
fn draw_label<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    text: &str,
    at: Px,
    color: Rgb,
    px: f32,
) -> Result<()> {
    let half_w = (px * 0.3 * text.chars().count().max(1) as f32).round() as i32;
    let half_h = (px / 2.0).round() as i32;
    let (x, y) = at;
    root.draw(&Rectangle::new(
        [(x - half_w, y - half_h), (x + half_w, y + half_h)],
        to_plotters(color).stroke_width(1),
    ))
    .map_err(render_err)
}

fn buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

fn render_err<E: std::fmt::Display>(e: E) -> EngineError {
    EngineError::Render(e.to_string())
}

fn to_plotters(color: Rgb) -> RGBColor {
    let [r, g, b] = color.to_rgb8();
    RGBColor(r, g, b)
}

type Px = (i32, i32);

enum DrawItem {
    Triangle {
        points: [Px; 3],
        color: Rgb,
        depth: f32,
    },
    Line {
        a: Px,
        b: Px,
        color: Rgb,
        opacity: f32,
        depth: f32,
    },
    Label {
        at: Px,
        text: String,
        color: Rgb,
        px: f32,
        depth: f32,
    },
}

impl DrawItem {
    fn depth(&self) -> f32 {
        match self {
            DrawItem::Triangle { depth, .. }
            | DrawItem::Line { depth, .. }
            | DrawItem::Label { depth, .. } => *depth,
        }
    }
}

struct Glow {
    x: f32,
    y: f32,
    radius: f32,
    color: Rgb,
}

/// Screen-space content of one frame.
struct FrameLayout {
    helpers: Vec<(Px, Px, Rgb)>,
    glows: Vec<Glow>,
    /// Far to near.
    items: Vec<DrawItem>,
}

impl FrameLayout {
    fn collect(scene: &Scene, camera: &PerspectiveCamera, width: u32, height: u32) -> Self {
        let desc = scene.description();
        let view = Viewport {
            camera,
            width,
            height,
            pixels_per_unit: height as f32 / (2.0 * (camera.fov_y / 2.0).tan()),
        };

        let mut helpers = Vec::new();
        let helper_lines = desc.grid.lines().into_iter().chain(desc.axes.lines());
        for (a, b, color) in helper_lines {
            if let Some((pa, pb)) = view.segment(scene.to_world(a), scene.to_world(b)) {
                let depth = (pa.depth + pb.depth) / 2.0;
                helpers.push((px(pa), px(pb), desc.fog.apply(color, depth)));
            }
        }

        let lighting = Lighting::from_lights(&desc.lights);
        let mut items = Vec::new();
        let mut glows = Vec::new();

        for (index, node) in desc.points.iter().enumerate() {
            let center = scene.to_world(node.position);
            let Some(c) = view.point(center) else {
                continue;
            };

            glows.push(Glow {
                x: c.x,
                y: c.y,
                radius: node.glow.scale / 2.0 * view.pixels_per_unit / c.depth,
                color: desc.fog.apply(node.glow.color, c.depth),
            });

            let model = scene.mesh_transform(index);
            for [a, b, cc] in desc.geometry.triangles() {
                let (a, b, cc) = (
                    model.transform_point3(a),
                    model.transform_point3(b),
                    model.transform_point3(cc),
                );
                let normal = (b - a).cross(cc - a).normalize_or_zero();
                if normal.dot(camera.position - a) <= 0.0 {
                    continue;
                }
                let (Some(pa), Some(pb), Some(pc)) = (view.point(a), view.point(b), view.point(cc))
                else {
                    continue;
                };
                let depth = (pa.depth + pb.depth + pc.depth) / 3.0;
                let color = desc.fog.apply(lighting.shade(node.color, normal), depth);
                items.push(DrawItem::Triangle {
                    points: [px(pa), px(pb), px(pc)],
                    color,
                    depth,
                });
            }
        }

        let style = desc.edge_style;
        for edge in &desc.edges {
            let a = scene.to_world(desc.points[edge.a].position);
            let b = scene.to_world(desc.points[edge.b].position);
            if let Some((pa, pb)) = view.segment(a, b) {
                let depth = (pa.depth + pb.depth) / 2.0;
                items.push(DrawItem::Line {
                    a: px(pa),
                    b: px(pb),
                    color: desc.fog.apply(style.color, depth),
                    opacity: style.opacity,
                    depth,
                });
            }
        }

        for label in &desc.labels {
            if let Some(p) = view.point(scene.to_world(label.position)) {
                items.push(DrawItem::Label {
                    at: px(p),
                    text: label.text.clone(),
                    color: label.color,
                    px: (label.scale[1] * view.pixels_per_unit / p.depth).max(6.0),
                    depth: p.depth,
                });
            }
        }

        items.sort_by(|a, b| b.depth().total_cmp(&a.depth()));

        Self {
            helpers,
            glows,
            items,
        }
    }
}

struct Viewport<'a> {
    camera: &'a PerspectiveCamera,
    width: u32,
    height: u32,
    pixels_per_unit: f32,
}

impl Viewport<'_> {
    // Far off-screen coordinates are dropped rather than handed to the
    // backend as saturated integers.
    fn point(&self, world: Vec3) -> Option<ScreenPoint> {
        let p = self.camera.project(world, self.width, self.height)?;
        let limit = 4.0 * self.width.max(self.height) as f32;
        (p.x.abs() <= limit && p.y.abs() <= limit).then_some(p)
    }

    /// Projects a segment, pulling an endpoint behind the camera forward to
    /// the near plane.
    fn segment(&self, a: Vec3, b: Vec3) -> Option<(ScreenPoint, ScreenPoint)> {
        let view = self.camera.view_matrix();
        let near = self.camera.near * 1.01;
        let da = -view.transform_point3(a).z;
        let db = -view.transform_point3(b).z;
        if da < near && db < near {
            return None;
        }
        let clip = |p: Vec3, dp: f32, q: Vec3, dq: f32| {
            if dp >= near {
                p
            } else {
                p + (q - p) * ((near - dp) / (dq - dp))
            }
        };
        let a2 = clip(a, da, b, db);
        let b2 = clip(b, db, a, da);
        Some((self.point(a2)?, self.point(b2)?))
    }
}

fn px(p: ScreenPoint) -> Px {
    (p.x.round() as i32, p.y.round() as i32)
}

struct Lighting {
    ambient: Rgb,
    directional: Vec<(Vec3, Rgb)>,
}

impl Lighting {
    fn from_lights(lights: &[Light]) -> Self {
        let mut ambient = Rgb::BLACK;
        let mut directional = Vec::new();
        for light in lights {
            match *light {
                Light::Ambient { color, intensity } => {
                    ambient = ambient.add(color.scale(intensity));
                }
                Light::Directional {
                    color,
                    intensity,
                    position,
                } => {
                    directional.push((position.normalize_or_zero(), color.scale(intensity)));
                }
            }
        }
        Self {
            ambient,
            directional,
        }
    }

    fn shade(&self, albedo: Rgb, normal: Vec3) -> Rgb {
        let mut light = self.ambient.scale(AMBIENT_WEIGHT);
        for (dir, color) in &self.directional {
            let lambert = normal.dot(*dir).max(0.0);
            light = light.add(color.scale(lambert * DIFFUSE_WEIGHT));
        }
        albedo
            .modulate(light)
            .add(albedo.scale(EMISSIVE_WEIGHT))
            .clamped()
    }
}

/// Radial halo: solid to 20% of the radius, a tenth at 40%, gone at the rim.
fn glow_falloff(t: f32) -> f32 {
    if t <= 0.2 {
        1.0
    } else if t <= 0.4 {
        1.0 + (0.1 - 1.0) * (t - 0.2) / 0.2
    } else if t < 1.0 {
        0.1 * (1.0 - t) / 0.6
    } else {
        0.0
    }
}

fn additive_glow(buffer: &mut [u8], width: u32, height: u32, glow: &Glow) {
    if glow.radius < 0.5 {
        return;
    }
    let [cr, cg, cb] = glow.color.to_rgb8();
    let x0 = (glow.x - glow.radius).floor().max(0.0) as u32;
    let y0 = (glow.y - glow.radius).floor().max(0.0) as u32;
    let x1 = ((glow.x + glow.radius).ceil().max(0.0) as u32).min(width);
    let y1 = ((glow.y + glow.radius).ceil().max(0.0) as u32).min(height);

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - glow.x;
            let dy = y as f32 + 0.5 - glow.y;
            let a = glow_falloff((dx * dx + dy * dy).sqrt() / glow.radius);
            if a <= 0.0 {
                continue;
            }
            let i = (y as usize * width as usize + x as usize) * 3;
            buffer[i] = buffer[i].saturating_add((cr as f32 * a) as u8);
            buffer[i + 1] = buffer[i + 1].saturating_add((cg as f32 * a) as u8);
            buffer[i + 2] = buffer[i + 2].saturating_add((cb as f32 * a) as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glow_falloff_profile() {
        assert_eq!(glow_falloff(0.0), 1.0);
        assert_eq!(glow_falloff(0.2), 1.0);
        assert!((glow_falloff(0.4) - 0.1).abs() < 1e-6);
        assert_eq!(glow_falloff(1.0), 0.0);
        assert!(glow_falloff(0.7) < 0.1 && glow_falloff(0.7) > 0.0);
    }

    #[test]
    fn additive_glow_brightens_and_saturates() {
        let mut buffer = vec![250u8; 9 * 9 * 3];
        let glow = Glow {
            x: 4.5,
            y: 4.5,
            radius: 4.0,
            color: Rgb::WHITE,
        };
        additive_glow(&mut buffer, 9, 9, &glow);
        let centre = (4 * 9 + 4) * 3;
        assert_eq!(buffer[centre], 255);
        assert_eq!(buffer[0], 250, "corner is outside the halo");
    }

    #[test]
    fn context_rejects_oversized_buffers() {
        let mut ctx = SoftwareContext::with_max_dimension(512);
        let config = RendererConfig {
            width: 1024,
            height: 600,
            preserve_drawing_buffer: true,
        };
        assert!(matches!(
            ctx.create_renderer(&config),
            Err(EngineError::ContextUnavailable(_))
        ));
    }

    #[test]
    fn resize_beyond_the_context_limit_keeps_the_buffer() {
        let mut ctx = SoftwareContext::with_max_dimension(1024);
        let config = RendererConfig {
            width: 800,
            height: 600,
            preserve_drawing_buffer: true,
        };
        let mut renderer = ctx.create_renderer(&config).unwrap();

        assert!(renderer.set_size(2000, 600).is_err());
        assert_eq!(renderer.size(), (800, 600));
        assert!(renderer.set_size(0, 600).is_err());

        renderer.set_size(1024, 600).unwrap();
        assert_eq!(renderer.size(), (1024, 600));
    }
}
