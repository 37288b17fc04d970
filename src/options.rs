use crate::color::Rgb;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;

/// Every tunable constant of the point-cloud view.
///
/// `Default` reproduces the stock look (dark violet background, cyan labels
/// and edges, 600px tall surface). Each section is `#[serde(default)]`, so a
/// JSON file only needs to name what it overrides:
///
/// ```
/// use scatter3d::options::SceneOptions;
///
/// let opts: SceneOptions =
///     serde_json::from_str(r#"{ "proximity_threshold": 40.0, "edge": { "opacity": 0.3 } }"#)
///         .unwrap();
/// assert_eq!(opts.proximity_threshold, 40.0);
/// assert_eq!(opts.edge.opacity, 0.3);
/// assert_eq!(opts.surface.height, 600);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneOptions {
    pub point: PointStyle,
    /// Pairs closer than this (strictly) get an edge.
    pub proximity_threshold: f32,
    pub surface: SurfaceOptions,
    pub background: Rgb,
    pub fog_density: f32,
    pub camera: CameraOptions,
    pub controls: ControlOptions,
    pub lights: LightOptions,
    pub axes_length: f32,
    pub grid: GridOptions,
    pub labels: LabelOptions,
    pub glow: GlowOptions,
    pub edge: EdgeOptions,
    pub geometry: GeometryOptions,
    pub spin: SpinOptions,
    /// Keep the drawing buffer after presenting. Snapshots read blank without it.
    pub preserve_drawing_buffer: bool,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            point: PointStyle::default(),
            proximity_threshold: 25.0,
            surface: SurfaceOptions::default(),
            background: Rgb::from_hex(0x05020a),
            fog_density: 0.002,
            camera: CameraOptions::default(),
            controls: ControlOptions::default(),
            lights: LightOptions::default(),
            axes_length: 70.0,
            grid: GridOptions::default(),
            labels: LabelOptions::default(),
            glow: GlowOptions::default(),
            edge: EdgeOptions::default(),
            geometry: GeometryOptions::default(),
            spin: SpinOptions::default(),
            preserve_drawing_buffer: true,
        }
    }
}

impl SceneOptions {
    /// Loads options from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let text = std::fs::read_to_string(path)?;
        let options = serde_json::from_str(&text)?;
        Ok(options)
    }
}

/// Randomised per-point presentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointStyle {
    pub size_min: f32,
    pub size_max: f32,
    pub size_scale: f32,
    pub saturation: f32,
    pub lightness: f32,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            size_min: 1.5,
            size_max: 3.5,
            size_scale: 3.0,
            saturation: 1.0,
            lightness: 0.6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceOptions {
    /// Renderer height never follows the surface.
    pub height: u32,
    /// Used when the surface reports a zero width at construction.
    pub fallback_width: u32,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            height: 600,
            fallback_width: 800,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov_degrees: 65.0,
            near: 0.1,
            far: 1500.0,
            position: [90.0, 90.0, 90.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlOptions {
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub zoom_speed: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            damping_factor: 0.15,
            min_distance: 15.0,
            max_distance: 400.0,
            zoom_speed: 1.5,
            rotate_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightOptions {
    pub directional_color: Rgb,
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
    pub ambient_color: Rgb,
    pub ambient_intensity: f32,
}

impl Default for LightOptions {
    fn default() -> Self {
        Self {
            directional_color: Rgb::WHITE,
            directional_intensity: 2.5,
            directional_position: [80.0, 140.0, 80.0],
            ambient_color: Rgb::from_hex(0x8888ff),
            ambient_intensity: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    pub size: f32,
    pub divisions: u32,
    pub center_color: Rgb,
    pub line_color: Rgb,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            size: 120.0,
            divisions: 12,
            center_color: Rgb::from_hex(0x4444ff),
            line_color: Rgb::from_hex(0x222288),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelOptions {
    /// Distance from the origin along each axis.
    pub offset: f32,
    pub scale: [f32; 2],
    pub color: Rgb,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            offset: 75.0,
            scale: [25.0, 12.5],
            color: Rgb::from_hex(0x00ffff),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlowOptions {
    /// Glow sprite side length as a multiple of the point size.
    pub size_factor: f32,
}

impl Default for GlowOptions {
    fn default() -> Self {
        Self { size_factor: 5.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeOptions {
    pub color: Rgb,
    pub opacity: f32,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            color: Rgb::from_hex(0x00ffff),
            opacity: 0.7,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryOptions {
    pub sphere_radius: f32,
    pub sphere_segments: u32,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            sphere_radius: 0.8,
            sphere_segments: 32,
        }
    }
}

/// Radians added per frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinOptions {
    pub mesh_x: f32,
    pub mesh_y: f32,
    pub scene_y: f32,
}

impl Default for SpinOptions {
    fn default() -> Self {
        Self {
            mesh_x: 0.015,
            mesh_y: 0.02,
            scene_y: 0.002,
        }
    }
}
