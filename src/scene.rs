//! Scene assembly.
//!
//! [`SceneBuilder`] turns projected points into an immutable
//! [`SceneDescription`]: lights, helpers, labels, one mesh and glow per point
//! and the proximity edges. [`Scene`] wraps a description with the little
//! state that changes per frame (mesh spin and scene turn), which is all a
//! renderer needs to draw.

use crate::color::Rgb;
use crate::options::{CameraOptions, SceneOptions, SpinOptions};
use crate::projector::{AxisSelection, ProjectedPoint};
use crate::shape::{Geometry, Shape};
use glam::{EulerRot, Mat4, Quat, Vec3};
use log::debug;
use std::sync::Arc;

/// Exponential-squared distance fog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Rgb,
    pub density: f32,
}

impl Fog {
    /// How much of the fog color replaces an object's color at `distance`.
    pub fn factor(&self, distance: f32) -> f32 {
        let d = self.density * distance;
        (1.0 - (-d * d).exp()).clamp(0.0, 1.0)
    }

    pub fn apply(&self, color: Rgb, distance: f32) -> Rgb {
        color.mix(self.color, self.factor(distance))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Parallel rays shining from `position` toward the origin.
    Directional {
        color: Rgb,
        intensity: f32,
        position: Vec3,
    },
    Ambient {
        color: Rgb,
        intensity: f32,
    },
}

/// Three colored lines from the origin along +x, +y and +z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesHelper {
    pub length: f32,
}

impl AxesHelper {
    pub fn lines(&self) -> [(Vec3, Vec3, Rgb); 3] {
        [
            (Vec3::ZERO, Vec3::X * self.length, Rgb::from_hex(0xff0000)),
            (Vec3::ZERO, Vec3::Y * self.length, Rgb::from_hex(0x00ff00)),
            (Vec3::ZERO, Vec3::Z * self.length, Rgb::from_hex(0x0000ff)),
        ]
    }
}

/// Square grid on the y = 0 plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHelper {
    pub size: f32,
    pub divisions: u32,
    pub center_color: Rgb,
    pub line_color: Rgb,
}

impl GridHelper {
    pub fn lines(&self) -> Vec<(Vec3, Vec3, Rgb)> {
        let divisions = self.divisions.max(1);
        let half = self.size / 2.0;
        let step = self.size / divisions as f32;
        let center = divisions / 2;

        let mut lines = Vec::with_capacity((divisions as usize + 1) * 2);
        for i in 0..=divisions {
            let k = -half + i as f32 * step;
            let color = if i == center && divisions % 2 == 0 {
                self.center_color
            } else {
                self.line_color
            };
            lines.push((Vec3::new(-half, 0.0, k), Vec3::new(half, 0.0, k), color));
            lines.push((Vec3::new(k, 0.0, -half), Vec3::new(k, 0.0, half), color));
        }
        lines
    }
}

/// Billboard text naming one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisLabel {
    pub text: String,
    pub position: Vec3,
    /// World-space width and height of the sprite.
    pub scale: [f32; 2],
    pub color: Rgb,
}

/// Additive halo drawn behind a point mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowSprite {
    pub color: Rgb,
    /// World-space side length.
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointNode {
    pub position: Vec3,
    pub size: f32,
    pub color: Rgb,
    pub glow: GlowSprite,
}

/// A line between two points, by index into [`SceneDescription::points`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: Rgb,
    pub opacity: f32,
    pub additive: bool,
}

/// Everything one view consists of, fixed at build time.
#[derive(Debug, Clone)]
pub struct SceneDescription {
    pub background: Rgb,
    pub fog: Fog,
    pub camera: CameraOptions,
    pub lights: Vec<Light>,
    pub axes: AxesHelper,
    pub grid: GridHelper,
    pub labels: Vec<AxisLabel>,
    pub shape: Shape,
    pub geometry: Arc<Geometry>,
    pub points: Vec<PointNode>,
    pub edges: Vec<Edge>,
    pub edge_style: LineStyle,
    pub spin: SpinOptions,
}

/// Assembles a [`SceneDescription`] from projected points.
///
/// # Examples
/// ```
/// use glam::Vec3;
/// use scatter3d::color::Rgb;
/// use scatter3d::options::SceneOptions;
/// use scatter3d::projector::{AxisSelection, ProjectedPoint};
/// use scatter3d::scene::SceneBuilder;
/// use scatter3d::shape::Shape;
///
/// let options = SceneOptions::default();
/// let axes = AxisSelection::new("A", "B", "C");
/// let points = vec![
///     ProjectedPoint { position: Vec3::ZERO, size: 6.0, color: Rgb::WHITE },
///     ProjectedPoint { position: Vec3::new(10.0, 0.0, 0.0), size: 6.0, color: Rgb::WHITE },
/// ];
/// let scene = SceneBuilder::new(&options, &axes, Shape::Cube).build(&points);
/// assert_eq!(scene.points.len(), 2);
/// assert_eq!(scene.edges.len(), 1);
/// assert_eq!(scene.labels.len(), 3);
/// ```
pub struct SceneBuilder<'a> {
    options: &'a SceneOptions,
    axes: &'a AxisSelection,
    shape: Shape,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(options: &'a SceneOptions, axes: &'a AxisSelection, shape: Shape) -> Self {
        Self {
            options,
            axes,
            shape,
        }
    }

    pub fn build(&self, points: &[ProjectedPoint]) -> SceneDescription {
        let opts = self.options;

        let nodes: Vec<PointNode> = points
            .iter()
            .map(|p| PointNode {
                position: p.position,
                size: p.size,
                color: p.color,
                glow: GlowSprite {
                    color: p.color,
                    scale: p.size * opts.glow.size_factor,
                },
            })
            .collect();

        let positions: Vec<Vec3> = nodes.iter().map(|n| n.position).collect();
        let edges = proximity_edges(&positions, opts.proximity_threshold);

        let geometry = Arc::new(
            self.shape
                .geometry(opts.geometry.sphere_radius, opts.geometry.sphere_segments),
        );

        debug!(
            "built scene: {} {} meshes, {} edges, {} triangles per mesh",
            nodes.len(),
            self.shape,
            edges.len(),
            geometry.triangle_count()
        );

        SceneDescription {
            background: opts.background,
            fog: Fog {
                color: opts.background,
                density: opts.fog_density,
            },
            camera: opts.camera.clone(),
            lights: vec![
                Light::Directional {
                    color: opts.lights.directional_color,
                    intensity: opts.lights.directional_intensity,
                    position: Vec3::from_array(opts.lights.directional_position),
                },
                Light::Ambient {
                    color: opts.lights.ambient_color,
                    intensity: opts.lights.ambient_intensity,
                },
            ],
            axes: AxesHelper {
                length: opts.axes_length,
            },
            grid: GridHelper {
                size: opts.grid.size,
                divisions: opts.grid.divisions,
                center_color: opts.grid.center_color,
                line_color: opts.grid.line_color,
            },
            labels: self.labels(),
            shape: self.shape,
            geometry,
            points: nodes,
            edges,
            edge_style: LineStyle {
                color: opts.edge.color,
                opacity: opts.edge.opacity,
                additive: true,
            },
            spin: opts.spin.clone(),
        }
    }

    fn labels(&self) -> Vec<AxisLabel> {
        let label = &self.options.labels;
        let named = |name: &str, fallback: &str| {
            if name.is_empty() {
                fallback.to_string()
            } else {
                name.to_string()
            }
        };
        [
            (named(&self.axes.x, "X"), Vec3::X),
            (named(&self.axes.y, "Y"), Vec3::Y),
            (named(&self.axes.z, "Z"), Vec3::Z),
        ]
        .into_iter()
        .map(|(text, dir)| AxisLabel {
            text,
            position: dir * label.offset,
            scale: label.scale,
            color: label.color,
        })
        .collect()
    }
}

/// Every pair `(i, j)`, `i < j`, closer than `threshold`.
///
/// All pairs are compared, so cost grows with the square of the point count.
/// The comparison is strict: a pair exactly `threshold` apart is not linked.
pub fn proximity_edges(positions: &[Vec3], threshold: f32) -> Vec<Edge> {
    let mut edges = Vec::new();
    for (a, pa) in positions.iter().enumerate() {
        for (offset, pb) in positions[a + 1..].iter().enumerate() {
            if pa.distance(*pb) < threshold {
                edges.push(Edge {
                    a,
                    b: a + 1 + offset,
                });
            }
        }
    }
    edges
}

/// A description plus its animation state.
#[derive(Debug, Clone)]
pub struct Scene {
    description: SceneDescription,
    /// Per-mesh euler angles (x, y) in radians.
    mesh_rotations: Vec<(f32, f32)>,
    rotation_y: f32,
    frames: u64,
}

impl Scene {
    pub fn from_description(description: SceneDescription) -> Self {
        let mesh_rotations = vec![(0.0, 0.0); description.points.len()];
        Self {
            description,
            mesh_rotations,
            rotation_y: 0.0,
            frames: 0,
        }
    }

    pub fn description(&self) -> &SceneDescription {
        &self.description
    }

    pub fn point_count(&self) -> usize {
        self.description.points.len()
    }

    pub fn edge_count(&self) -> usize {
        self.description.edges.len()
    }

    /// Frames advanced since construction.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    pub fn mesh_rotation(&self, index: usize) -> Option<(f32, f32)> {
        self.mesh_rotations.get(index).copied()
    }

    /// One animation step: spin every mesh on x and y, turn the whole scene.
    pub fn advance(&mut self) {
        let spin = &self.description.spin;
        for (rx, ry) in &mut self.mesh_rotations {
            *rx += spin.mesh_x;
            *ry += spin.mesh_y;
        }
        self.rotation_y += spin.scene_y;
        self.frames += 1;
    }

    /// Transform applied to every object in the scene.
    pub fn root_transform(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation_y)
    }

    /// Model matrix of point mesh `index`, including the scene turn.
    pub fn mesh_transform(&self, index: usize) -> Mat4 {
        let node = &self.description.points[index];
        let (rx, ry) = self.mesh_rotations[index];
        let rotation = Quat::from_euler(EulerRot::XYZ, rx, ry, 0.0);
        self.root_transform()
            * Mat4::from_scale_rotation_translation(Vec3::splat(node.size), rotation, node.position)
    }

    /// World-space position of a scene-local point.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.root_transform().transform_point3(local)
    }
}
