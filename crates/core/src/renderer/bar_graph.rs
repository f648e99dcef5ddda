use crate::{
    canvas::{Canvas, StrokeStyle, Viewport},
    frame::SpectrumFrame,
    Result,
};

use super::{validate_divisions, PointBuffer, Visualisation};

/// Renders spectrum bins as a histogram of vertical bars hanging from the top
/// edge or standing on the bottom edge.
#[derive(Debug, Clone)]
pub struct BarGraphRenderer {
    divisions: usize,
    stroke: StrokeStyle,
    top: bool,
    points: PointBuffer,
}

impl BarGraphRenderer {
    /// `divisions` controls the bar density: one bar per `divisions` bytes.
    pub fn new(divisions: usize, stroke: StrokeStyle, top: bool) -> Result<Self> {
        Ok(Self {
            divisions: validate_divisions(divisions)?,
            stroke,
            top,
            points: PointBuffer::default(),
        })
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    pub fn is_top(&self) -> bool {
        self.top
    }
}

impl Visualisation for BarGraphRenderer {
    fn render_spectrum(
        &mut self,
        frame: &SpectrumFrame,
        viewport: Viewport,
        canvas: &mut dyn Canvas,
    ) {
        let bars = frame.len() / self.divisions;
        if bars == 0 || viewport.is_empty() {
            return;
        }

        let height = viewport.height_f32();
        let spacing = viewport.width_f32() / bars as f32;

        let points = self.points.prepare(frame.len());
        for i in 0..bars {
            let length = 2.0 * frame.decibels_at(self.divisions * i) - 10.0;
            let x = (i as f32 + 0.5) * spacing;
            let (from, to) = if self.top {
                (0.0, length)
            } else {
                (height, height - length)
            };

            let at = i * 4;
            points[at] = x;
            points[at + 1] = from;
            points[at + 2] = x;
            points[at + 3] = to;
        }

        canvas.draw_segments(self.points.segments(bars), &self.stroke);
    }
}
