/*!
# scatter3d

Interactive 3D scatter plots of spreadsheet data, rendered in Rust.

## Overview

A dataset (a header row followed by data rows) and three column names are
turned into a point cloud: every row with numeric values in the chosen
columns becomes a glowing mesh at (x, y, z), and points closer than a fixed
distance are linked by lines. The scene spins slowly, can be orbited, zoomed
and panned, follows the width of its display surface, and can be captured as
a PNG at any time.

## Architecture

### Data Projector
- Resolves the three axis names against the header row
- Drops rows with a missing or non-numeric value on any selected axis
- Gives each point a random size and a random fully saturated hue

### Scene Engine
- Builds the scene: fog, camera, lights, grid and axis helpers, axis labels,
  one mesh and glow per point, proximity edges
- Runs the frame loop: mesh spin, scene turn, damped orbit controls, render
- Follows surface width changes without restarting the loop
- Tears everything down in a fixed order and rebuilds on any input change
- Captures the current frame as PNG through a [`engine::SnapshotHandle`]

### Rendering
- Software rasteriser on plotters' bitmap backend
- Painter's algorithm with back-face culling, flat Lambert shading and
  exponential-squared fog
- Additive glow halos and translucent edges

## Modules

- **dataset**: Rows, cells and header lookup
- **loader**: CSV and JSON dataset loading
- **projector**: Rows to 3D points
- **color**: RGB and HSL color math
- **shape**: Point shapes and their meshes
- **scene**: Scene description, builder and animation state
- **camera**: Perspective camera and orbit controls
- **renderer**: Graphics context seam and the software renderer
- **surface**: Display surface handle with width observation
- **engine**: Scene lifecycle, frame loop and snapshots
- **export**: PNG encoding and saving
- **options**: Tunable constants with JSON loading
- **error**: Engine error type
- **app**: HTTP host (feature `web`)

## Usage

```text
scatter3d data.csv x y z --shape cube --frames 120 --out plot.png
```
*/

pub mod camera;
pub mod color;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod export;
pub mod loader;
pub mod options;
pub mod projector;
pub mod renderer;
pub mod scene;
pub mod shape;
pub mod surface;

#[cfg(feature = "web")]
pub mod app;

pub use dataset::{CellValue, Dataset};
pub use engine::{EngineState, SceneEngine, SceneInput, SnapshotHandle};
pub use error::EngineError;
pub use options::SceneOptions;
pub use projector::{AxisSelection, ProjectedPoint};
pub use shape::Shape;
