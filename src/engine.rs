//! The scene engine: lifecycle, frame loop, resize handling and snapshots.
//!
//! A [`SceneEngine`] moves through
//! `Uninitialized -> Constructed -> Animating -> Disposed`. [`SceneEngine::mount`]
//! builds a scene when its input is complete and a surface is available, then
//! starts the frame loop straight away. Mounting different input tears the
//! current scene down and builds a new one; mounting the same input does
//! nothing.
//!
//! All mutable state sits behind one mutex so a frame, a resize and a
//! snapshot never interleave.

use crate::camera::{ControlInput, OrbitControls, PerspectiveCamera};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::export::encode_png;
use crate::options::SceneOptions;
use crate::projector::{AxisSelection, project_with};
use crate::renderer::{GraphicsContext, Renderer, RendererConfig};
use crate::scene::{Scene, SceneBuilder};
use crate::shape::Shape;
use crate::surface::DisplaySurface;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Constructed,
    Animating,
    Disposed,
}

/// Outcome of one [`SceneEngine::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Rendered,
    /// No scene is animating; nothing was drawn.
    Idle,
}

/// Teardown steps, in the order [`SceneEngine::dispose`] performs them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeardownStep {
    StopLoop,
    ReleaseControls,
    ReleaseRenderer,
    DetachSurface,
    StopObserving,
}

/// Everything a scene is built from. Any change triggers a rebuild.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneInput {
    pub dataset: Dataset,
    pub axes: AxisSelection,
    pub shape: Shape,
}

impl SceneInput {
    pub fn new(dataset: Dataset, axes: AxisSelection, shape: Shape) -> Self {
        Self {
            dataset,
            axes,
            shape,
        }
    }
}

// Resources owned by a constructed scene.
struct Runtime {
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    renderer: Box<dyn Renderer>,
    surface: DisplaySurface,
    resize: Option<watch::Receiver<u32>>,
    pending_frame: Option<u64>,
}

struct EngineCore {
    context: Box<dyn GraphicsContext>,
    options: SceneOptions,
    rng: Box<dyn RngCore + Send>,
    state: EngineState,
    input: Option<SceneInput>,
    runtime: Option<Runtime>,
    next_frame_id: u64,
    builds: u64,
    last_teardown: Vec<TeardownStep>,
}

impl EngineCore {
    fn is_live(&self) -> bool {
        matches!(self.state, EngineState::Constructed | EngineState::Animating)
    }

    fn mount(&mut self, input: SceneInput, surface: Option<&DisplaySurface>) -> Result<()> {
        if self.is_live() && self.input.as_ref() == Some(&input) {
            debug!("scene input unchanged, keeping current scene");
            return Ok(());
        }

        if self.is_live() {
            self.dispose();
        }
        if self.state == EngineState::Disposed {
            self.state = EngineState::Uninitialized;
        }
        self.input = Some(input);

        let Some(surface) = surface else {
            debug!("no display surface, scene not constructed");
            return Ok(());
        };
        self.construct(surface)
    }

    fn construct(&mut self, surface: &DisplaySurface) -> Result<()> {
        let Some(input) = self.input.as_ref() else {
            return Ok(());
        };
        if input.dataset.is_empty() || input.axes.is_incomplete() {
            debug!("dataset or axis selection empty, nothing to render");
            return Ok(());
        }
        if input.axes.resolve(&input.dataset).is_none() {
            warn!(
                "axes {}/{}/{} not all present in the header, nothing to render",
                input.axes.x, input.axes.y, input.axes.z
            );
            return Ok(());
        }

        let opts = &self.options;
        let height = opts.surface.height;
        let width = match surface.width() {
            0 => opts.surface.fallback_width,
            w => w,
        };

        let renderer = self.context.create_renderer(&RendererConfig {
            width,
            height,
            preserve_drawing_buffer: opts.preserve_drawing_buffer,
        })?;

        let points = project_with(&input.dataset, &input.axes, &opts.point, &mut self.rng);
        let description = SceneBuilder::new(opts, &input.axes, input.shape).build(&points);
        let camera = PerspectiveCamera::new(&opts.camera, width as f32 / height as f32);
        let controls = OrbitControls::new(&camera, opts.controls.clone());

        surface.attach();
        let resize = surface.observe();

        let scene = Scene::from_description(description);
        self.builds += 1;
        info!(
            "scene {} constructed: {} points, {} edges, {}x{}",
            self.builds,
            scene.point_count(),
            scene.edge_count(),
            width,
            height
        );

        self.runtime = Some(Runtime {
            scene,
            camera,
            controls,
            renderer,
            surface: surface.clone(),
            resize: Some(resize),
            pending_frame: None,
        });
        self.state = EngineState::Constructed;
        self.start_loop();
        Ok(())
    }

    fn start_loop(&mut self) {
        let id = self.request_frame();
        if let Some(runtime) = self.runtime.as_mut() {
            runtime.pending_frame = Some(id);
            self.state = EngineState::Animating;
            debug!("frame loop started at frame {}", id);
        }
    }

    fn request_frame(&mut self) -> u64 {
        self.next_frame_id += 1;
        self.next_frame_id
    }

    fn tick(&mut self) -> Result<FrameStatus> {
        if self.state != EngineState::Animating {
            return Ok(FrameStatus::Idle);
        }
        let next = self.request_frame();
        let Some(runtime) = self.runtime.as_mut() else {
            return Ok(FrameStatus::Idle);
        };
        if runtime.pending_frame.take().is_none() {
            return Ok(FrameStatus::Idle);
        }

        runtime.scene.advance();
        runtime.controls.update(&mut runtime.camera);
        runtime.renderer.render(&runtime.scene, &runtime.camera)?;
        runtime.pending_frame = Some(next);
        Ok(FrameStatus::Rendered)
    }

    fn poll_resize(&mut self) -> bool {
        let Some(runtime) = self.runtime.as_mut() else {
            return false;
        };
        let Some(resize) = runtime.resize.as_mut() else {
            return false;
        };
        if !resize.has_changed().unwrap_or(false) {
            return false;
        }
        let width = *resize.borrow_and_update();
        self.resize(width)
    }

    fn resize(&mut self, width: u32) -> bool {
        let height = self.options.surface.height;
        let Some(runtime) = self.runtime.as_mut() else {
            return false;
        };
        if width == 0 {
            warn!("surface reported zero width, keeping {:?}", runtime.renderer.size());
            return false;
        }
        if runtime.renderer.size() == (width, height) {
            return false;
        }
        if let Err(e) = runtime.renderer.set_size(width, height) {
            warn!("resize to {} wide refused, keeping {:?}: {}", width, runtime.renderer.size(), e);
            return false;
        }
        runtime.camera.set_aspect(width as f32 / height as f32);
        debug!("resized to {}x{}", width, height);
        true
    }

    fn handle_input(&mut self, input: ControlInput) {
        let height = self.options.surface.height;
        if let Some(runtime) = self.runtime.as_mut() {
            runtime.controls.handle_input(input, &runtime.camera, height);
        }
    }

    fn dispose(&mut self) {
        let Some(mut runtime) = self.runtime.take() else {
            if self.state != EngineState::Disposed {
                debug!("dispose on an engine without a scene");
                self.state = EngineState::Disposed;
            }
            return;
        };

        let mut steps = Vec::with_capacity(5);

        runtime.pending_frame = None;
        steps.push(TeardownStep::StopLoop);

        runtime.controls.dispose();
        steps.push(TeardownStep::ReleaseControls);

        runtime.renderer.dispose();
        steps.push(TeardownStep::ReleaseRenderer);

        runtime.surface.detach();
        steps.push(TeardownStep::DetachSurface);

        runtime.resize = None;
        steps.push(TeardownStep::StopObserving);

        debug!("scene {} disposed: {:?}", self.builds, steps);
        self.last_teardown = steps;
        self.state = EngineState::Disposed;
    }

    fn capture_image(&mut self) -> Option<Vec<u8>> {
        let runtime = self.runtime.as_mut()?;
        if let Err(e) = runtime.renderer.render(&runtime.scene, &runtime.camera) {
            warn!("snapshot render failed: {}", e);
            return None;
        }
        let pixels = runtime.renderer.read_pixels()?;
        match encode_png(&pixels) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("snapshot encoding failed: {}", e);
                None
            }
        }
    }
}

/// Builds, animates and tears down one 3D scatter scene at a time.
///
/// # Examples
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use scatter3d::dataset::Dataset;
/// use scatter3d::engine::{EngineState, SceneEngine, SceneInput};
/// use scatter3d::options::SceneOptions;
/// use scatter3d::projector::AxisSelection;
/// use scatter3d::renderer::SoftwareContext;
/// use scatter3d::shape::Shape;
/// use scatter3d::surface::DisplaySurface;
///
/// let data = Dataset::from_parts(
///     &["a", "b", "c"],
///     vec![vec![1.into(), 2.into(), 3.into()], vec![4.into(), 5.into(), 6.into()]],
/// );
/// let engine = SceneEngine::new(Box::new(SoftwareContext::new()), SceneOptions::default())
///     .with_rng(StdRng::seed_from_u64(1));
/// let surface = DisplaySurface::new(320);
///
/// let input = SceneInput::new(data, AxisSelection::new("a", "b", "c"), Shape::Cube);
/// engine.mount(input, Some(&surface)).unwrap();
/// assert_eq!(engine.state(), EngineState::Animating);
///
/// engine.tick().unwrap();
/// let png = engine.capture_image().unwrap();
/// assert_eq!(&png[1..4], b"PNG");
///
/// engine.dispose();
/// assert!(engine.capture_image().is_none());
/// ```
pub struct SceneEngine {
    core: Arc<Mutex<EngineCore>>,
}

impl SceneEngine {
    pub fn new(context: Box<dyn GraphicsContext>, options: SceneOptions) -> Self {
        Self {
            core: Arc::new(Mutex::new(EngineCore {
                context,
                options,
                rng: Box::new(StdRng::from_entropy()),
                state: EngineState::Uninitialized,
                input: None,
                runtime: None,
                next_frame_id: 0,
                builds: 0,
                last_teardown: Vec::new(),
            })),
        }
    }

    /// Replaces the randomness source used for point sizes and colors.
    pub fn with_rng(self, rng: impl RngCore + Send + 'static) -> Self {
        self.lock().rng = Box::new(rng);
        self
    }

    fn lock(&self) -> MutexGuard<'_, EngineCore> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Supplies the engine's input and surface.
    ///
    /// Builds a scene when the dataset and axes are complete and `surface` is
    /// present, rebuilding if a different input is already on screen.
    /// Degenerate input leaves the engine `Uninitialized` without an error.
    ///
    /// # Errors
    /// [`crate::error::EngineError::ContextUnavailable`] when no renderer can be created.
    /// The engine then stays `Uninitialized`.
    pub fn mount(&self, input: SceneInput, surface: Option<&DisplaySurface>) -> Result<()> {
        self.lock().mount(input, surface)
    }

    /// Services the pending frame: spin, damp the controls, render, and
    /// request the next one.
    pub fn tick(&self) -> Result<FrameStatus> {
        self.lock().tick()
    }

    /// Applies the latest surface width, if it changed. Returns whether the
    /// renderer was resized.
    pub fn poll_resize(&self) -> bool {
        self.lock().poll_resize()
    }

    /// Forwards pointer input to the orbit controls.
    pub fn handle_input(&self, input: ControlInput) {
        self.lock().handle_input(input);
    }

    /// Tears the current scene down. Safe to call repeatedly or before
    /// anything was built.
    pub fn dispose(&self) {
        self.lock().dispose();
    }

    /// Renders one frame and returns it as PNG bytes, or `None` when no scene
    /// is constructed.
    pub fn capture_image(&self) -> Option<Vec<u8>> {
        self.lock().capture_image()
    }

    pub fn handle(&self) -> SnapshotHandle {
        SnapshotHandle {
            core: Arc::downgrade(&self.core),
        }
    }

    pub fn state(&self) -> EngineState {
        self.lock().state
    }

    pub fn renderer_size(&self) -> Option<(u32, u32)> {
        self.lock().runtime.as_ref().map(|r| r.renderer.size())
    }

    pub fn camera_aspect(&self) -> Option<f32> {
        self.lock().runtime.as_ref().map(|r| r.camera.aspect)
    }

    pub fn camera_distance(&self) -> Option<f32> {
        self.lock()
            .runtime
            .as_ref()
            .map(|r| r.camera.distance_to_target())
    }

    pub fn point_count(&self) -> Option<usize> {
        self.lock().runtime.as_ref().map(|r| r.scene.point_count())
    }

    pub fn edge_count(&self) -> Option<usize> {
        self.lock().runtime.as_ref().map(|r| r.scene.edge_count())
    }

    /// Frames advanced by the current scene.
    pub fn frames(&self) -> u64 {
        self.lock()
            .runtime
            .as_ref()
            .map_or(0, |r| r.scene.frames())
    }

    /// Id of the frame the loop is waiting on, if it is running.
    pub fn pending_frame(&self) -> Option<u64> {
        self.lock().runtime.as_ref().and_then(|r| r.pending_frame)
    }

    /// Number of scenes built over the engine's lifetime.
    pub fn builds(&self) -> u64 {
        self.lock().builds
    }

    pub fn last_teardown(&self) -> Vec<TeardownStep> {
        self.lock().last_teardown.clone()
    }
}

/// Snapshot-only view of an engine. Does not keep the engine alive.
#[derive(Clone)]
pub struct SnapshotHandle {
    core: Weak<Mutex<EngineCore>>,
}

impl SnapshotHandle {
    pub fn capture_image(&self) -> Option<Vec<u8>> {
        let core = self.core.upgrade()?;
        let mut core = core.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        core.capture_image()
    }
}

/// Runs the engine's frame loop on a timer until `shutdown` resolves or the
/// engine stops animating, applying surface width changes between frames.
/// The engine is disposed on the way out.
///
/// # Returns
/// * `Result<u64>` - Frames rendered by this driver
pub async fn drive<F>(
    engine: &SceneEngine,
    surface: &DisplaySurface,
    frame_interval: Duration,
    shutdown: F,
) -> Result<u64>
where
    F: Future<Output = ()>,
{
    let mut widths = surface.observe();
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut shutdown = std::pin::pin!(shutdown);
    let mut frames = 0u64;

    let outcome: Result<()> = loop {
        tokio::select! {
            _ = &mut shutdown => break Ok(()),
            changed = widths.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                engine.poll_resize();
            }
            _ = ticker.tick() => {
                match engine.tick() {
                    Ok(FrameStatus::Rendered) => frames += 1,
                    Ok(FrameStatus::Idle) => break Ok(()),
                    Err(e) => break Err(e),
                }
            }
        }
    };

    engine.dispose();
    debug!("driver stopped after {} frames", frames);
    outcome.map(|_| frames)
}
