use crate::canvas::Rgba;

/// Phase advance per rendered frame.
pub const COLOR_CYCLE_STEP: f32 = 0.03;

/// Slow hue rotation derived from three phase-shifted sine waves.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCycle {
    phase: f32,
    offsets: [f32; 3],
    alpha: u8,
}

impl ColorCycle {
    /// Channels roughly 120° and 240° apart.
    pub fn rainbow() -> Self {
        Self::with_offsets([0.0, 2.0, 4.0])
    }

    /// Approximation of the line style's warmer rotation. Only the channel
    /// offsets are reproduced; that style's extra red bias is not.
    pub fn warm() -> Self {
        Self::with_offsets([0.0, 1.0, 7.0])
    }

    pub fn with_offsets(offsets: [f32; 3]) -> Self {
        Self {
            phase: 0.0,
            offsets,
            alpha: 128,
        }
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Colour at the current phase.
    pub fn color(&self) -> Rgba {
        let [r, g, b] = self.offsets.map(|offset| channel(self.phase + offset));
        Rgba::new(r, g, b, self.alpha)
    }

    /// Returns the current colour and advances the phase by one step.
    pub fn advance(&mut self) -> Rgba {
        let color = self.color();
        self.phase += COLOR_CYCLE_STEP;
        color
    }
}

fn channel(phase: f32) -> u8 {
    (128.0 * (phase.sin() + 1.0)).floor().clamp(0.0, 255.0) as u8
}
