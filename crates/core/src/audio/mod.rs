use std::{f32::consts::TAU, fmt, path::Path, sync::Arc, time::Duration};

use crate::{
    analysis::{quantize_waveform, SpectrumAnalyser},
    timeline::PlaybackClock,
    Result, VisualiserError,
};

pub const MIN_CAPTURE_SIZE: usize = 128;
pub const MAX_CAPTURE_SIZE: usize = 1024;

/// Checks that `capture_size` is a power of two the analyser supports.
pub fn validate_capture_size(capture_size: usize) -> Result<usize> {
    if capture_size.is_power_of_two()
        && (MIN_CAPTURE_SIZE..=MAX_CAPTURE_SIZE).contains(&capture_size)
    {
        Ok(capture_size)
    } else {
        Err(VisualiserError::InvalidCaptureSize(capture_size))
    }
}

/// Something that can be analysed while it plays.
pub trait AudioAnalysisSource {
    /// Starts an analysis session with a fixed snapshot size.
    fn attach(&self, capture_size: usize) -> Result<Box<dyn AnalysisSession>>;
}

/// Live link to a playing source, handing out waveform and spectrum snapshots.
pub trait AnalysisSession: Send {
    fn capture_size(&self) -> usize;

    /// Whether snapshots are currently available. Becomes `false` once
    /// playback completes or the session is released.
    fn is_active(&self) -> bool;

    /// Fills `buffer` with the current waveform snapshot.
    fn waveform(&mut self, buffer: &mut [i8]) -> Result<()>;

    /// Fills `buffer` with the current spectrum snapshot.
    fn spectrum(&mut self, buffer: &mut [i8]) -> Result<()>;

    /// Detaches from the source. Calling it again has no effect.
    fn release(&mut self);
}

/// Decoded mono clip analysed in step with a wall-clock playback position.
#[derive(Clone)]
pub struct ClipSource {
    samples: Arc<[f32]>,
    sample_rate: u32,
    looping: bool,
}

impl ClipSource {
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            looping: false,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Decodes a WAV file, mixing all channels down to mono.
    pub fn from_wav(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = hound::WavReader::open(path.as_ref())?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, _>>()?,
            hound::SampleFormat::Int => {
                let full_scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / full_scale))
                    .collect::<std::result::Result<Vec<f32>, _>>()?
            }
        };

        let mono: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        tracing::debug!(
            path = %path.as_ref().display(),
            sample_rate = spec.sample_rate,
            channels,
            samples = mono.len(),
            "decoded wav clip"
        );

        Ok(Self::new(mono, spec.sample_rate))
    }

    /// Synthesises a chord of sine `frequencies` whose level pulses at
    /// `beats_per_second`.
    pub fn tone(
        sample_rate: u32,
        seconds: f32,
        frequencies: &[f32],
        beats_per_second: f32,
    ) -> Self {
        let len = (sample_rate as f32 * seconds.max(0.0)) as usize;
        let voices = frequencies.len().max(1) as f32;
        let samples: Vec<f32> = (0..len)
            .map(|index| {
                let t = index as f32 / sample_rate as f32;
                let beat_phase = (t * beats_per_second).fract();
                let envelope = 0.2 + 0.8 * (1.0 - beat_phase).powi(3);
                let chord: f32 = frequencies
                    .iter()
                    .map(|frequency| (TAU * frequency * t).sin())
                    .sum();
                envelope * chord / voices
            })
            .collect();

        Self::new(samples, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Attaches with an explicit clock, e.g. one that starts mid-clip.
    pub fn attach_with_clock(
        &self,
        capture_size: usize,
        clock: PlaybackClock,
    ) -> Result<ClipSession> {
        let capture_size = validate_capture_size(capture_size)?;
        if self.samples.is_empty() || self.sample_rate == 0 {
            return Err(VisualiserError::SourceUnavailable);
        }

        tracing::info!(
            capture_size,
            sample_rate = self.sample_rate,
            looping = self.looping,
            duration_ms = self.duration().as_millis() as u64,
            "attached analysis session"
        );

        Ok(ClipSession {
            clip: self.clone(),
            clock,
            analyser: SpectrumAnalyser::new(),
            window: vec![0.0; capture_size],
            released: false,
        })
    }
}

impl AudioAnalysisSource for ClipSource {
    fn attach(&self, capture_size: usize) -> Result<Box<dyn AnalysisSession>> {
        Ok(Box::new(self.attach_with_clock(capture_size, PlaybackClock::start())?))
    }
}

impl fmt::Debug for ClipSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipSource")
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("looping", &self.looping)
            .finish()
    }
}

/// Analysis session over a [`ClipSource`].
#[derive(Debug)]
pub struct ClipSession {
    clip: ClipSource,
    clock: PlaybackClock,
    analyser: SpectrumAnalyser,
    window: Vec<f32>,
    released: bool,
}

impl ClipSession {
    /// Index of the sample currently playing, or `None` once a one-shot clip
    /// has finished.
    pub fn position(&self) -> Option<usize> {
        let elapsed = self.clock.elapsed().as_secs_f64();
        let index = (elapsed * f64::from(self.clip.sample_rate)) as usize;
        let len = self.clip.samples.len();

        if self.clip.looping {
            Some(index % len)
        } else if index < len {
            Some(index)
        } else {
            None
        }
    }

    /// Copies the window starting at the playback position into `self.window`.
    fn fill_window(&mut self, buffer_len: usize) -> Result<()> {
        if self.released {
            return Err(VisualiserError::Capture("session has been released".into()));
        }
        if buffer_len != self.window.len() {
            return Err(VisualiserError::Capture(format!(
                "buffer holds {buffer_len} bytes, capture size is {}",
                self.window.len()
            )));
        }
        let start = self
            .position()
            .ok_or_else(|| VisualiserError::Capture("playback has finished".into()))?;

        let samples = &self.clip.samples;
        for (offset, slot) in self.window.iter_mut().enumerate() {
            let index = start + offset;
            *slot = if self.clip.looping {
                samples[index % samples.len()]
            } else {
                samples.get(index).copied().unwrap_or(0.0)
            };
        }

        Ok(())
    }
}

impl AnalysisSession for ClipSession {
    fn capture_size(&self) -> usize {
        self.window.len()
    }

    fn is_active(&self) -> bool {
        !self.released && self.position().is_some()
    }

    fn waveform(&mut self, buffer: &mut [i8]) -> Result<()> {
        self.fill_window(buffer.len())?;
        quantize_waveform(&self.window, buffer);
        Ok(())
    }

    fn spectrum(&mut self, buffer: &mut [i8]) -> Result<()> {
        self.fill_window(buffer.len())?;
        self.analyser.analyse(&self.window, buffer)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            tracing::info!("released analysis session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_capture_sizes() {
        for size in [128, 256, 512, 1024] {
            assert_eq!(validate_capture_size(size).unwrap(), size);
        }
        for size in [0, 64, 500, 2048] {
            assert!(matches!(
                validate_capture_size(size),
                Err(VisualiserError::InvalidCaptureSize(s)) if s == size
            ));
        }
    }

    #[test]
    fn empty_clip_cannot_be_attached() {
        let source = ClipSource::new(Vec::<f32>::new(), 44_100);
        assert!(matches!(source.attach(512), Err(VisualiserError::SourceUnavailable)));
    }

    #[test]
    fn constant_clip_yields_constant_waveform() {
        let source = ClipSource::new(vec![0.5; 4_096], 8_000).looping(true);
        let mut session = source.attach(256).unwrap();
        let mut buffer = vec![0i8; 256];
        session.waveform(&mut buffer).unwrap();

        // round(0.5 · 127) + 128 = 192
        assert!(buffer.iter().all(|byte| *byte as u8 == 192));
        assert!(session.is_active());
    }

    #[test]
    fn finished_clip_is_inactive() {
        let source = ClipSource::new(vec![0.1; 1_000], 1_000);
        let mut session = source
            .attach_with_clock(128, PlaybackClock::starting_at(Duration::from_secs(2)))
            .unwrap();

        assert!(!session.is_active());
        let mut buffer = vec![0i8; 128];
        assert!(matches!(
            session.waveform(&mut buffer),
            Err(VisualiserError::Capture(_))
        ));
    }

    #[test]
    fn looping_clip_wraps_around() {
        let source = ClipSource::new(vec![0.1; 1_000], 1_000).looping(true);
        let session = source
            .attach_with_clock(128, PlaybackClock::starting_at(Duration::from_millis(2_500)))
            .unwrap();
        let position = session.position().unwrap();
        assert!((500..600).contains(&position));
    }

    #[test]
    fn release_is_idempotent_and_stops_capture() {
        let source = ClipSource::tone(8_000, 1.0, &[220.0, 330.0], 2.0).looping(true);
        let mut session = source.attach(512).unwrap();
        let mut buffer = vec![0i8; 512];
        session.spectrum(&mut buffer).unwrap();

        session.release();
        session.release();
        assert!(!session.is_active());
        assert!(session.spectrum(&mut buffer).is_err());
    }

    #[test]
    fn rejects_wrong_buffer_length() {
        let source = ClipSource::new(vec![0.0; 2_048], 8_000).looping(true);
        let mut session = source.attach(128).unwrap();
        let mut buffer = vec![0i8; 64];
        assert!(session.waveform(&mut buffer).is_err());
    }

    #[test]
    fn decodes_wav_files_to_mono() {
        let path = std::env::temp_dir().join(format!("visualiser-clip-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(i16::MAX / 2).unwrap();
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();

        let clip = ClipSource::from_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(clip.sample_rate(), 8_000);
        assert_eq!(clip.len(), 100);
        assert!((clip.samples[0] - 0.25).abs() < 1e-3);
    }
}
