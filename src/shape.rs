//! Point shapes and their unit meshes.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Mesh used for every point of a scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Sphere,
    Cube,
    Tetrahedron,
    Octahedron,
    Icosahedron,
}

impl Shape {
    pub const ALL: [Shape; 5] = [
        Shape::Sphere,
        Shape::Cube,
        Shape::Tetrahedron,
        Shape::Octahedron,
        Shape::Icosahedron,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Shape::Sphere => "sphere",
            Shape::Cube => "cube",
            Shape::Tetrahedron => "tetrahedron",
            Shape::Octahedron => "octahedron",
            Shape::Icosahedron => "icosahedron",
        }
    }

    /// Lenient lookup used by hosts: unknown names draw spheres.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    /// Unit mesh for this shape. Only the sphere uses `sphere_radius` and
    /// `sphere_segments`; the polyhedra are unit sized.
    pub fn geometry(self, sphere_radius: f32, sphere_segments: u32) -> Geometry {
        match self {
            Shape::Sphere => Geometry::sphere(sphere_radius, sphere_segments, sphere_segments),
            Shape::Cube => Geometry::cube(1.0),
            Shape::Tetrahedron => Geometry::tetrahedron(1.0),
            Shape::Octahedron => Geometry::octahedron(1.0),
            Shape::Icosahedron => Geometry::icosahedron(1.0),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownShape(pub String);

impl fmt::Display for UnknownShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown shape '{}' (expected sphere, cube, tetrahedron, octahedron or icosahedron)",
            self.0
        )
    }
}

impl std::error::Error for UnknownShape {}

impl FromStr for Shape {
    type Err = UnknownShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sphere" => Ok(Shape::Sphere),
            "cube" => Ok(Shape::Cube),
            "tetrahedron" => Ok(Shape::Tetrahedron),
            "octahedron" => Ok(Shape::Octahedron),
            "icosahedron" => Ok(Shape::Icosahedron),
            _ => Err(UnknownShape(s.to_string())),
        }
    }
}

/// Indexed triangle mesh centred on the origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Triangles are re-wound so every face normal points away from the
    /// origin. All shapes here are convex and centred, which makes that safe
    /// and lets the renderer cull back faces without per-shape tables.
    fn from_data(vertices: Vec<Vec3>, mut indices: Vec<u32>) -> Self {
        for tri in indices.chunks_exact_mut(3) {
            let [a, b, c] = [
                vertices[tri[0] as usize],
                vertices[tri[1] as usize],
                vertices[tri[2] as usize],
            ];
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            if normal.dot(centroid) < 0.0 {
                tri.swap(1, 2);
            }
        }
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }

    /// UV sphere; pole rows emit one triangle per quad.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for iy in 0..=height_segments {
            let phi = iy as f32 / height_segments as f32 * PI;
            for ix in 0..=width_segments {
                let theta = ix as f32 / width_segments as f32 * 2.0 * PI;
                vertices.push(Vec3::new(
                    -radius * phi.sin() * theta.cos(),
                    radius * phi.cos(),
                    radius * phi.sin() * theta.sin(),
                ));
            }
        }

        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * (width_segments + 1) + ix;
                let b = a + width_segments + 1;
                let c = b + 1;
                let d = a + 1;

                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self::from_data(vertices, indices)
    }

    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        let indices = vec![
            0, 1, 2, 0, 2, 3, // -z
            4, 6, 5, 4, 7, 6, // +z
            0, 4, 5, 0, 5, 1, // -y
            3, 2, 6, 3, 6, 7, // +y
            0, 3, 7, 0, 7, 4, // -x
            1, 5, 6, 1, 6, 2, // +x
        ];
        Self::from_data(vertices, indices)
    }

    pub fn tetrahedron(radius: f32) -> Self {
        let vertices = [[1.0, 1.0, 1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, -1.0], [1.0, -1.0, -1.0]];
        let indices = vec![2, 1, 0, 0, 3, 2, 1, 3, 0, 2, 3, 1];
        Self::polyhedron(&vertices, indices, radius)
    }

    pub fn octahedron(radius: f32) -> Self {
        let vertices = [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ];
        let indices = vec![
            0, 2, 4, 0, 4, 3, 0, 3, 5, 0, 5, 2, 1, 2, 5, 1, 5, 3, 1, 3, 4, 1, 4, 2,
        ];
        Self::polyhedron(&vertices, indices, radius)
    }

    pub fn icosahedron(radius: f32) -> Self {
        let t = (1.0 + 5.0f32.sqrt()) / 2.0;
        let vertices = [
            [-1.0, t, 0.0],
            [1.0, t, 0.0],
            [-1.0, -t, 0.0],
            [1.0, -t, 0.0],
            [0.0, -1.0, t],
            [0.0, 1.0, t],
            [0.0, -1.0, -t],
            [0.0, 1.0, -t],
            [t, 0.0, -1.0],
            [t, 0.0, 1.0],
            [-t, 0.0, -1.0],
            [-t, 0.0, 1.0],
        ];
        let indices = vec![
            0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11, 1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7,
            6, 7, 1, 8, 3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9, 4, 9, 5, 2, 4, 11, 6, 2, 10,
            8, 6, 7, 9, 8, 1,
        ];
        Self::polyhedron(&vertices, indices, radius)
    }

    // Projects the seed vertices onto a sphere of `radius`.
    fn polyhedron(seed: &[[f32; 3]], indices: Vec<u32>, radius: f32) -> Self {
        let vertices = seed
            .iter()
            .map(|v| Vec3::from_array(*v).normalize() * radius)
            .collect();
        Self::from_data(vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_counts() {
        assert_eq!(Geometry::cube(1.0).triangle_count(), 12);
        assert_eq!(Geometry::tetrahedron(1.0).triangle_count(), 4);
        assert_eq!(Geometry::octahedron(1.0).triangle_count(), 8);
        assert_eq!(Geometry::icosahedron(1.0).triangle_count(), 20);
        // 32 x 32 sphere drops one triangle per quad on each pole row
        assert_eq!(Geometry::sphere(0.8, 32, 32).triangle_count(), 32 * 32 * 2 - 2 * 32);
    }

    #[test]
    fn faces_point_outward() {
        for shape in Shape::ALL {
            let geometry = shape.geometry(0.8, 12);
            for [a, b, c] in geometry.triangles() {
                let normal = (b - a).cross(c - a);
                let centroid = (a + b + c) / 3.0;
                assert!(normal.dot(centroid) >= -1e-6, "{} has an inward face", shape);
            }
        }
    }

    #[test]
    fn polyhedra_sit_on_their_radius() {
        for v in Geometry::icosahedron(1.0).vertices {
            assert!((v.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn shape_names_round_trip_and_fallback() {
        for shape in Shape::ALL {
            assert_eq!(shape.name().parse::<Shape>(), Ok(shape));
        }
        assert_eq!(Shape::from_name("dodecahedron"), Shape::Sphere);
        assert!("dodecahedron".parse::<Shape>().is_err());
    }
}
