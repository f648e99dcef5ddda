//! Pixel surfaces: the persistent accumulation buffer and the output it is
//! presented to.

use std::{fmt, path::Path};

use tiny_skia::{BlendMode, Color, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::{
    canvas::{Canvas, CompositeMode, Rect, Rgba, StrokeStyle, Viewport},
    Result, VisualiserError,
};

/// Persistent pixel buffer every render pass draws into and fades.
#[derive(Clone)]
pub struct AccumulationSurface {
    pixmap: Pixmap,
}

impl AccumulationSurface {
    /// Allocates a surface filled with `background`. Returns `None` for an
    /// empty viewport.
    pub fn new(viewport: Viewport, background: Rgba) -> Option<Self> {
        let mut pixmap = Pixmap::new(viewport.width, viewport.height)?;
        pixmap.fill(to_color(background));
        Some(Self { pixmap })
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.pixmap.width(), self.pixmap.height())
    }

    /// Un-premultiplied colour at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some(Rgba::new(
            color.red(),
            color.green(),
            color.blue(),
            color.alpha(),
        ))
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Copies `other` into this surface, reallocating only on a size change.
    pub fn copy_from(&mut self, other: &AccumulationSurface) {
        if self.viewport() == other.viewport() {
            self.pixmap.data_mut().copy_from_slice(other.pixmap.data());
        } else {
            self.pixmap = other.pixmap.clone();
        }
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.pixmap
            .save_png(path)
            .map_err(|err| VisualiserError::Png(err.to_string()))
    }
}

impl Canvas for AccumulationSurface {
    fn draw_segments(&mut self, points: &[f32], style: &StrokeStyle) {
        let mut builder = PathBuilder::new();
        for segment in points.chunks_exact(4) {
            if segment.iter().all(|value| value.is_finite()) {
                builder.move_to(segment[0], segment[1]);
                builder.line_to(segment[2], segment[3]);
            }
        }

        // No segments, or only degenerate ones.
        let Some(path) = builder.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(to_color(style.color));
        paint.anti_alias = style.anti_alias;
        paint.blend_mode = to_blend_mode(style.mode);

        let stroke = Stroke {
            width: style.width,
            line_cap: LineCap::Butt,
            ..Stroke::default()
        };

        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    fn fill_rect(&mut self, rect: Rect, mode: CompositeMode, color: Rgba) {
        let Some(rect) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(to_color(color));
        paint.blend_mode = to_blend_mode(mode);

        self.pixmap
            .fill_rect(rect, &paint, Transform::identity(), None);
    }
}

impl fmt::Debug for AccumulationSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccumulationSurface")
            .field("viewport", &self.viewport())
            .finish()
    }
}

fn to_color(color: Rgba) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn to_blend_mode(mode: CompositeMode) -> BlendMode {
    match mode {
        CompositeMode::SourceOver => BlendMode::SourceOver,
        CompositeMode::Screen => BlendMode::Screen,
        CompositeMode::Multiply => BlendMode::Multiply,
        CompositeMode::Lighten => BlendMode::Lighten,
    }
}

/// Destination a finished frame is presented to.
///
/// A pass locks the surface, draws, then posts the frame. [`FrameLease`]
/// scopes that cycle so the surface is unlocked on every exit path.
pub trait OutputSurface: Send {
    /// Current drawable size, or `None` while the surface is not ready.
    fn viewport(&self) -> Option<Viewport>;

    /// Acquires exclusive access for one frame.
    fn lock(&mut self) -> Result<()> {
        Ok(())
    }

    /// Presents `frame` and releases the lock.
    fn post(&mut self, frame: &AccumulationSurface) -> Result<()>;

    /// Releases the lock without presenting.
    fn unlock(&mut self) {}
}

impl<S: OutputSurface + ?Sized> OutputSurface for Box<S> {
    fn viewport(&self) -> Option<Viewport> {
        (**self).viewport()
    }

    fn lock(&mut self) -> Result<()> {
        (**self).lock()
    }

    fn post(&mut self, frame: &AccumulationSurface) -> Result<()> {
        (**self).post(frame)
    }

    fn unlock(&mut self) {
        (**self).unlock()
    }
}

/// Exclusive hold on an [`OutputSurface`] for the duration of one pass.
pub struct FrameLease<'a, S: OutputSurface + ?Sized> {
    surface: &'a mut S,
    posted: bool,
}

impl<'a, S: OutputSurface + ?Sized> FrameLease<'a, S> {
    pub fn acquire(surface: &'a mut S) -> Result<Self> {
        surface.lock()?;
        Ok(Self {
            surface,
            posted: false,
        })
    }

    /// Presents `frame`. On failure the lease still unlocks when dropped.
    pub fn post(mut self, frame: &AccumulationSurface) -> Result<()> {
        self.surface.post(frame)?;
        self.posted = true;
        Ok(())
    }
}

impl<S: OutputSurface + ?Sized> Drop for FrameLease<'_, S> {
    fn drop(&mut self) {
        if !self.posted {
            self.surface.unlock();
        }
    }
}

/// In-memory output that keeps a copy of the last presented frame.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    viewport: Option<Viewport>,
    last_frame: Option<AccumulationSurface>,
    presented: u64,
    locked: bool,
}

impl HeadlessSurface {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport: Some(viewport),
            ..Self::default()
        }
    }

    /// A surface with no drawable area yet.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn resize(&mut self, viewport: Option<Viewport>) {
        self.viewport = viewport;
    }

    pub fn last_frame(&self) -> Option<&AccumulationSurface> {
        self.last_frame.as_ref()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl OutputSurface for HeadlessSurface {
    fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    fn lock(&mut self) -> Result<()> {
        if self.locked {
            return Err(VisualiserError::msg("surface is already locked"));
        }
        self.locked = true;
        Ok(())
    }

    fn post(&mut self, frame: &AccumulationSurface) -> Result<()> {
        match self.last_frame.as_mut() {
            Some(last) => last.copy_from(frame),
            None => self.last_frame = Some(frame.clone()),
        }
        self.presented += 1;
        self.locked = false;
        Ok(())
    }

    fn unlock(&mut self) {
        self.locked = false;
    }
}
