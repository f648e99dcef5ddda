use crate::{
    canvas::{Canvas, StrokeStyle, Viewport},
    frame::SampleFrame,
};

use super::{color::ColorCycle, PointBuffer, Visualisation};

/// Multiplicative envelope decay applied on every non-beat frame.
pub const ENVELOPE_DECAY: f32 = 0.99;

/// Draws the waveform as a polyline across the viewport and flashes it on
/// prominent beats.
///
/// Beat detection is a one-pole envelope follower: a frame whose mean
/// amplitude exceeds the envelope raises it and is drawn with the flash
/// stroke, every other frame decays it by [`ENVELOPE_DECAY`].
#[derive(Debug, Clone)]
pub struct LineRenderer {
    stroke: StrokeStyle,
    flash_stroke: StrokeStyle,
    color_cycle: Option<ColorCycle>,
    envelope: f32,
    points: PointBuffer,
}

impl LineRenderer {
    pub fn new(stroke: StrokeStyle, flash_stroke: StrokeStyle) -> Self {
        Self {
            stroke,
            flash_stroke,
            color_cycle: None,
            envelope: 0.0,
            points: PointBuffer::default(),
        }
    }

    pub fn with_color_cycle(mut self) -> Self {
        self.color_cycle = Some(ColorCycle::warm());
        self
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Folds `amplitude` into the envelope and reports whether it was a beat.
    pub fn observe(&mut self, amplitude: f32) -> bool {
        if amplitude > self.envelope {
            self.envelope = amplitude;
            true
        } else {
            self.envelope *= ENVELOPE_DECAY;
            false
        }
    }

    pub fn stroke(&self) -> &StrokeStyle {
        &self.stroke
    }
}

impl Visualisation for LineRenderer {
    fn render_waveform(
        &mut self,
        frame: &SampleFrame,
        viewport: Viewport,
        canvas: &mut dyn Canvas,
    ) {
        if frame.is_empty() || viewport.is_empty() {
            return;
        }

        if let Some(cycle) = self.color_cycle.as_mut() {
            self.stroke.color = cycle.advance();
        }

        let segments = frame.len() - 1;
        let width = viewport.width_f32();
        let mid = viewport.height_f32() / 2.0;
        let scale = viewport.height_f32() / 3.0 / 128.0;
        let x_at = |index: usize| width * index as f32 / segments as f32;
        let y_at = |index: usize| mid + f32::from(frame.centered(index)) * scale;

        let points = self.points.prepare(frame.len());
        for i in 0..segments {
            let at = i * 4;
            points[at] = x_at(i);
            points[at + 1] = y_at(i);
            points[at + 2] = x_at(i + 1);
            points[at + 3] = y_at(i + 1);
        }

        let style = if self.observe(frame.mean_amplitude()) {
            self.flash_stroke
        } else {
            self.stroke
        };

        if segments > 0 {
            canvas.draw_segments(self.points.segments(segments), &style);
        }
    }
}
