//! Immutable carriers for one capture tick.
//!
//! Both frame kinds hold the bytes exactly as the analysis session wrote them.
//! Waveform bytes are unsigned 8-bit PCM biased at 128 and reinterpreted as
//! `i8`; spectrum bytes are interleaved real/imaginary FFT values.

/// One waveform snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFrame {
    bytes: Box<[i8]>,
}

impl SampleFrame {
    pub fn new(bytes: impl Into<Box<[i8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Raw capture bytes.
    pub fn bytes(&self) -> &[i8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Sample `index` re-centred around zero, in `-128..=127`.
    pub fn centered(&self, index: usize) -> i8 {
        self.bytes[index].wrapping_add(i8::MIN)
    }

    /// Mean absolute re-centred sample value divided by 128. Silence (every
    /// byte at the 0x80 midpoint) scores zero.
    pub fn mean_amplitude(&self) -> f32 {
        if self.bytes.is_empty() {
            return 0.0;
        }

        let sum: f32 = (0..self.bytes.len())
            .map(|index| f32::from(self.centered(index).unsigned_abs()))
            .sum();
        sum / (128.0 * self.bytes.len() as f32)
    }
}

/// One spectrum snapshot: bin `k` lives at indices `2k` and `2k + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectrumFrame {
    bytes: Box<[i8]>,
}

impl SpectrumFrame {
    pub fn new(bytes: impl Into<Box<[i8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[i8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Squared magnitude of the pair starting at `offset`. A real part at the
    /// final index has no imaginary partner and is paired with zero.
    pub fn magnitude_at(&self, offset: usize) -> f32 {
        let re = self.bytes.get(offset).copied().map(f32::from).unwrap_or(0.0);
        let im = self
            .bytes
            .get(offset + 1)
            .copied()
            .map(f32::from)
            .unwrap_or(0.0);
        re * re + im * im
    }

    /// `10·log10(magnitude)` of the pair at `offset`. Silent bins are floored
    /// at a magnitude of one so the result stays finite.
    pub fn decibels_at(&self, offset: usize) -> f32 {
        10.0 * self.magnitude_at(offset).max(1.0).log10()
    }
}
