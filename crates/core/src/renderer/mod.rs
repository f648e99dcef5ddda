//! Visual styles and the set of renderers active on a visualiser.
//!
//! Each style consumes exactly one kind of frame. The closed [`Renderer`]
//! enum dispatches both entry points to its variant; the entry point for the
//! other kind is a no-op.

mod bar_graph;
mod circle;
mod circle_bar;
mod color;
mod line;

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

pub use bar_graph::BarGraphRenderer;
pub use circle::CircleRenderer;
pub use circle_bar::CircleBarRenderer;
pub use color::{ColorCycle, COLOR_CYCLE_STEP};
pub use line::{LineRenderer, ENVELOPE_DECAY};

use crate::{
    canvas::{Canvas, Viewport},
    frame::{SampleFrame, SpectrumFrame},
    Result, VisualiserError,
};

/// Two entry points, one per frame kind. Styles override the one they draw.
pub trait Visualisation {
    fn render_waveform(
        &mut self,
        _frame: &SampleFrame,
        _viewport: Viewport,
        _canvas: &mut dyn Canvas,
    ) {}

    fn render_spectrum(
        &mut self,
        _frame: &SpectrumFrame,
        _viewport: Viewport,
        _canvas: &mut dyn Canvas,
    ) {}
}

/// Which frame kind a renderer consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Waveform,
    Spectrum,
}

#[derive(Debug, Clone)]
pub enum Renderer {
    Line(LineRenderer),
    BarGraph(BarGraphRenderer),
    Circle(CircleRenderer),
    CircleBar(CircleBarRenderer),
}

impl Renderer {
    pub fn name(&self) -> &'static str {
        match self {
            Renderer::Line(_) => "line",
            Renderer::BarGraph(_) => "bar_graph",
            Renderer::Circle(_) => "circle",
            Renderer::CircleBar(_) => "circle_bar",
        }
    }

    pub fn frame_kind(&self) -> FrameKind {
        match self {
            Renderer::Line(_) | Renderer::Circle(_) => FrameKind::Waveform,
            Renderer::BarGraph(_) | Renderer::CircleBar(_) => FrameKind::Spectrum,
        }
    }

    fn style_mut(&mut self) -> &mut dyn Visualisation {
        match self {
            Renderer::Line(style) => style,
            Renderer::BarGraph(style) => style,
            Renderer::Circle(style) => style,
            Renderer::CircleBar(style) => style,
        }
    }
}

impl Visualisation for Renderer {
    fn render_waveform(
        &mut self,
        frame: &SampleFrame,
        viewport: Viewport,
        canvas: &mut dyn Canvas,
    ) {
        self.style_mut().render_waveform(frame, viewport, canvas);
    }

    fn render_spectrum(
        &mut self,
        frame: &SpectrumFrame,
        viewport: Viewport,
        canvas: &mut dyn Canvas,
    ) {
        self.style_mut().render_spectrum(frame, viewport, canvas);
    }
}

impl From<LineRenderer> for Renderer {
    fn from(value: LineRenderer) -> Self {
        Renderer::Line(value)
    }
}

impl From<BarGraphRenderer> for Renderer {
    fn from(value: BarGraphRenderer) -> Self {
        Renderer::BarGraph(value)
    }
}

impl From<CircleRenderer> for Renderer {
    fn from(value: CircleRenderer) -> Self {
        Renderer::Circle(value)
    }
}

impl From<CircleBarRenderer> for Renderer {
    fn from(value: CircleBarRenderer) -> Self {
        Renderer::CircleBar(value)
    }
}

pub(crate) fn validate_divisions(divisions: usize) -> Result<usize> {
    if divisions.is_power_of_two() {
        Ok(divisions)
    } else {
        Err(VisualiserError::InvalidDivisions(divisions))
    }
}

/// Geometry scratch space reused across frames. Sized to four floats per
/// frame byte and only ever grown.
#[derive(Debug, Default, Clone)]
pub(crate) struct PointBuffer {
    points: Vec<f32>,
}

impl PointBuffer {
    pub(crate) fn prepare(&mut self, frame_len: usize) -> &mut [f32] {
        let needed = frame_len * 4;
        if self.points.len() < needed {
            self.points.resize(needed, 0.0);
        }
        &mut self.points
    }

    pub(crate) fn segments(&self, count: usize) -> &[f32] {
        &self.points[..count * 4]
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.points.capacity()
    }
}

/// Shared reference to one registered renderer and its animation state.
///
/// Identity is by handle: registering a clone of the same handle twice is a
/// no-op, while two separately created handles animate independently.
#[derive(Clone)]
pub struct RendererHandle {
    inner: Arc<Mutex<Renderer>>,
}

impl RendererHandle {
    pub fn new(renderer: impl Into<Renderer>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(renderer.into())),
        }
    }

    pub fn ptr_eq(&self, other: &RendererHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs `f` with exclusive access to the renderer.
    pub fn with<R>(&self, f: impl FnOnce(&mut Renderer) -> R) -> Result<R> {
        let mut renderer = self
            .inner
            .lock()
            .map_err(|_| VisualiserError::Poisoned("renderer"))?;
        Ok(f(&mut renderer))
    }
}

impl fmt::Debug for RendererHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .inner
            .try_lock()
            .map(|renderer| renderer.name())
            .unwrap_or("<busy>");
        f.debug_struct("RendererHandle").field("renderer", &name).finish()
    }
}

/// Ordered, duplicate-free collection of active renderers.
///
/// Cloning shares the same set. Render passes iterate a snapshot, so adding
/// or clearing from another thread never disturbs a pass in progress.
#[derive(Debug, Clone, Default)]
pub struct RendererSet {
    entries: Arc<Mutex<Vec<RendererHandle>>>,
}

impl RendererSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle`. Returns `false` if it was already registered.
    pub fn add(&self, handle: RendererHandle) -> Result<bool> {
        let mut entries = self.lock()?;
        if entries.iter().any(|entry| entry.ptr_eq(&handle)) {
            return Ok(false);
        }
        entries.push(handle);
        Ok(true)
    }

    /// Removes `handle`. Returns `false` if it was not registered.
    pub fn remove(&self, handle: &RendererHandle) -> Result<bool> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|entry| !entry.ptr_eq(handle));
        Ok(entries.len() != before)
    }

    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Copy of the current membership in registration order.
    pub fn snapshot(&self) -> Result<Vec<RendererHandle>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<RendererHandle>>> {
        self.entries
            .lock()
            .map_err(|_| VisualiserError::Poisoned("renderer set"))
    }
}
