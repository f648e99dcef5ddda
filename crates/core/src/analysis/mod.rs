//! Conversion of PCM windows into the 8-bit snapshots an analysis session
//! hands out.

use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{Result, VisualiserError};

/// Extra gain applied to normalised bin values before quantisation. Makes up
/// for the Hann window and for programme material well below full scale.
const SPECTRUM_GAIN: f32 = 4.0;

/// Quantises `samples` in `-1.0..=1.0` to unsigned 8-bit PCM biased at 128,
/// reinterpreted as `i8`.
pub fn quantize_waveform(samples: &[f32], out: &mut [i8]) {
    for (byte, sample) in out.iter_mut().zip(samples) {
        let biased = (sample.clamp(-1.0, 1.0) * 127.0).round() + 128.0;
        *byte = biased as u8 as i8;
    }
}

/// Real FFT over fixed-size windows, packed the way hardware visualisers
/// report it: `[Re0, Re(n/2), Re1, Im1, Re2, Im2, ...]`.
///
/// Only the plan for the current window size is kept, so the analyser can
/// move to the capture thread.
pub struct SpectrumAnalyser {
    fft: Option<FftResources>,
}

impl SpectrumAnalyser {
    pub fn new() -> Self {
        Self { fft: None }
    }

    /// Writes the packed spectrum of `samples` into `out`. Both slices must
    /// have the same, even length.
    pub fn analyse(&mut self, samples: &[f32], out: &mut [i8]) -> Result<()> {
        let len = samples.len();
        if len < 2 || len % 2 != 0 || out.len() != len {
            return Err(VisualiserError::Capture(format!(
                "cannot pack a {len}-sample window into {} bytes",
                out.len()
            )));
        }

        let fft = self.prepare_fft(len);
        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value * hann_value(index, len);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let scale = SPECTRUM_GAIN * 2.0 * 127.0 / len as f32;
        let half = len / 2;
        out[0] = quantize_bin(fft.spectrum[0].re, scale);
        out[1] = quantize_bin(fft.spectrum[half].re, scale);
        for k in 1..half {
            out[2 * k] = quantize_bin(fft.spectrum[k].re, scale);
            out[2 * k + 1] = quantize_bin(fft.spectrum[k].im, scale);
        }

        Ok(())
    }

    fn prepare_fft(&mut self, size: usize) -> &mut FftResources {
        let fft = match self.fft.take() {
            Some(fft) if fft.size == size => fft,
            _ => FftResources::plan(size),
        };
        self.fft.insert(fft)
    }
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl FftResources {
    fn plan(size: usize) -> Self {
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        Self {
            size,
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        }
    }
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("fft_size", &self.fft.as_ref().map(|fft| fft.size))
            .finish()
    }
}

fn quantize_bin(value: f32, scale: f32) -> i8 {
    (value * scale).round().clamp(-128.0, 127.0) as i8
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(len: usize, cycles: f32, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * cycles * i as f32 / len as f32).sin())
            .collect()
    }

    #[test]
    fn quantizes_around_the_bias() {
        let mut out = [0i8; 4];
        quantize_waveform(&[0.0, 1.0, -1.0, 4.0], &mut out);
        assert_eq!(out.map(|byte| byte as u8), [128, 255, 1, 255]);
    }

    #[test]
    fn silence_has_an_empty_spectrum() {
        let mut analyser = SpectrumAnalyser::new();
        let mut out = vec![1i8; 512];
        analyser.analyse(&vec![0.0; 512], &mut out).unwrap();
        assert!(out.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let mut analyser = SpectrumAnalyser::new();
        let mut out = vec![0i8; 256];
        analyser.analyse(&sine(256, 16.0, 0.5), &mut out).unwrap();

        let magnitude = |k: usize| {
            let re = f32::from(out[2 * k]);
            let im = f32::from(out[2 * k + 1]);
            re * re + im * im
        };
        let peak = (1..128).max_by(|a, b| magnitude(*a).total_cmp(&magnitude(*b))).unwrap();
        assert_eq!(peak, 16);
    }

    #[test]
    fn rejects_mismatched_buffers() {
        let mut analyser = SpectrumAnalyser::new();
        let mut out = vec![0i8; 8];
        assert!(analyser.analyse(&[0.0; 16], &mut out).is_err());
        assert!(analyser.analyse(&[0.0; 7], &mut out[..7]).is_err());
    }
}
