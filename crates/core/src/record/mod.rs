use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    canvas::Viewport,
    surface::{AccumulationSurface, OutputSurface},
    Result,
};

/// Configuration options for the recording subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    pub output_dir: PathBuf,
    /// Write every n-th presented frame. Zero keeps only the last frame.
    pub every: u32,
    pub width: u32,
    pub height: u32,
}

impl RecordingSettings {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("frames"),
            every: 0,
            width: 720,
            height: 720,
        }
    }
}

/// Output surface that writes presented frames to numbered PNG files.
#[derive(Debug)]
pub struct PngRecorder {
    settings: RecordingSettings,
    presented: u64,
    written: u64,
    last_frame: Option<AccumulationSurface>,
}

impl PngRecorder {
    pub fn new(settings: RecordingSettings) -> Result<Self> {
        if settings.every > 0 {
            fs::create_dir_all(&settings.output_dir)?;
        }
        tracing::info!(
            output_dir = %settings.output_dir.display(),
            every = settings.every,
            width = settings.width,
            height = settings.height,
            "recording frames"
        );

        Ok(Self {
            settings,
            presented: 0,
            written: 0,
            last_frame: None,
        })
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Number of PNG files written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn last_frame(&self) -> Option<&AccumulationSurface> {
        self.last_frame.as_ref()
    }

    /// Writes the most recently presented frame to `path`. Returns `false`
    /// when nothing has been presented yet.
    pub fn save_last(&self, path: impl AsRef<Path>) -> Result<bool> {
        match &self.last_frame {
            Some(frame) => {
                frame.save_png(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn frame_path(&self) -> PathBuf {
        self.settings
            .output_dir
            .join(format!("frame_{:05}.png", self.written))
    }
}

impl OutputSurface for PngRecorder {
    fn viewport(&self) -> Option<Viewport> {
        Some(self.settings.viewport()).filter(|viewport| !viewport.is_empty())
    }

    fn post(&mut self, frame: &AccumulationSurface) -> Result<()> {
        let every = u64::from(self.settings.every);
        if every > 0 && self.presented % every == 0 {
            let path = self.frame_path();
            frame.save_png(&path)?;
            self.written += 1;
            tracing::debug!(path = %path.display(), "wrote frame");
        }
        self.presented += 1;

        match self.last_frame.as_mut() {
            Some(last) => last.copy_from(frame),
            None => self.last_frame = Some(frame.clone()),
        }
        Ok(())
    }
}
