/// Result alias that carries the custom [`VisualiserError`] type.
pub type Result<T> = std::result::Result<T, VisualiserError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum VisualiserError {
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The visualiser was linked to a source with nothing to play.
    #[error("cannot attach to an absent audio source")]
    SourceUnavailable,
    /// Capture sizes must be a power of two within the analyser's range.
    #[error("capture size {0} must be a power of two between 128 and 1024")]
    InvalidCaptureSize(usize),
    /// Renderer division counts must be non-zero powers of two.
    #[error("division count {0} must be a non-zero power of two")]
    InvalidDivisions(usize),
    /// A single snapshot read failed. Never fatal: the previous frame is reused.
    #[error("snapshot capture failed: {0}")]
    Capture(String),
    #[error("fft failed: {0}")]
    Fft(#[from] realfft::FftError),
    #[error("wav decoding failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("png encoding failed: {0}")]
    Png(String),
    /// A shared lock was poisoned by a thread that panicked while holding it.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
}

impl VisualiserError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for VisualiserError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for VisualiserError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
