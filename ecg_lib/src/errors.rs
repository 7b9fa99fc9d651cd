/** ------------------------------------------------------------
 * Error types raised by this lib.
 * ------------------------------------------------------------- */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input length {length} is not a positive multiple of the packet size {packet_size}")]
    InvalidLength { length: usize, packet_size: usize },
    #[error("Malformed packet at position {position}: {reason}")]
    MalformedPacket { position: usize, reason: String },
    #[error("Residual interquartile range {iqr} is degenerate, outlier scores are undefined")]
    DegenerateData { iqr: f64 },
    #[error("Heart rate requested for an empty series")]
    DivisionByZero,
    #[error("Received series of insufficient length: {available} (required: {required})")]
    InsufficientData { required: usize, available: usize },
    #[error("LOESS span {span} must be finite and positive")]
    InvalidSpan { span: f64 },
    #[error("Input lengths differ: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /**
     * Whether the error stems from the shape of the raw packet stream
     */
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidLength { .. } | PipelineError::MalformedPacket { .. }
        )
    }
}
