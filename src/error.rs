use std::process::ExitStatus;

pub type OrreryResult<T> = Result<T, OrreryError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum OrreryError {
    /// A `SystemState` that must not reach the renderer: position outside
    /// [-1, 1], malformed color string, duplicate entity id, inconsistent
    /// tag tally. Validation belongs to the collaborator; the renderer fails
    /// loudly instead of clamping.
    #[error("malformed state: {0}")]
    State(String),

    /// Fewer than 2 snapshots were supplied for a timeline video.
    #[error("insufficient history: {0}")]
    InsufficientHistory(String),

    /// The external video encoder is missing or failed its version probe.
    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// The external video encoder ran but exited non-zero.
    #[error("encoding failed with {status}: {stderr}")]
    EncodingFailed { status: ExitStatus, stderr: String },

    /// Invalid caller-provided options (fps of zero, empty output path, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrreryError {
    /// Build an [`OrreryError::State`] value.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Build an [`OrreryError::InsufficientHistory`] value.
    pub fn insufficient_history(msg: impl Into<String>) -> Self {
        Self::InsufficientHistory(msg.into())
    }

    /// Build an [`OrreryError::EncoderUnavailable`] value.
    pub fn encoder_unavailable(msg: impl Into<String>) -> Self {
        Self::EncoderUnavailable(msg.into())
    }

    /// Build an [`OrreryError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            OrreryError::state("x")
                .to_string()
                .contains("malformed state:")
        );
        assert!(
            OrreryError::insufficient_history("x")
                .to_string()
                .contains("insufficient history:")
        );
        assert!(
            OrreryError::encoder_unavailable("x")
                .to_string()
                .contains("encoder unavailable:")
        );
        assert!(
            OrreryError::validation("x")
                .to_string()
                .contains("validation error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = OrreryError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
