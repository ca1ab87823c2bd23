//! Error types for the siamese patch scorer.
//!
//! Configuration mistakes are reported with our own messages. Archive,
//! weight-file and framework failures keep the message of the library that
//! raised them.

use thiserror::Error;

/// Main error type for training, prediction and scoring.
#[derive(Error, Debug)]
pub enum SiameseError {
    /// Loss code other than `c` or `l`
    #[error(
        "loss function {0} is not supported. We currently only support c for \
         contrastive loss and l for logistic loss"
    )]
    UnsupportedLoss(String),

    /// Output mode code other than `e`, `c` or `l`
    #[error(
        "output mode {0} is not supported. We currently only support e for \
         euclidean distance, c for cosine similarity and l for logit"
    )]
    UnsupportedOutputMode(String),

    /// A required data path was not given
    #[error("No {0} data")]
    NoData(&'static str),

    /// Checkpoint path template could not be rendered
    #[error("Checkpoint template error: {0}")]
    Template(String),

    /// Patch or archive shapes do not line up
    #[error("Shape error: {0}")]
    Shape(String),

    /// Archive is missing a named entry
    #[error("Archive has no '{0}' entry")]
    MissingEntry(String),

    /// Nothing left to train on after the validation split
    #[error("Training set is empty after the validation split")]
    EmptyTraining,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Archive(#[from] ndarray_npy::ReadNpzError),

    #[error(transparent)]
    Recorder(#[from] burn::record::RecorderError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Specialized Result type for siamese operations.
pub type Result<T> = std::result::Result<T, SiameseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_loss_names_code() {
        let err = SiameseError::UnsupportedLoss("x".to_string());
        assert!(err.to_string().starts_with("loss function x is not supported"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SiameseError = io_err.into();
        assert!(matches!(err, SiameseError::Io(_)));
        // transparent keeps the loader's own message
        assert_eq!(err.to_string(), "file not found");
    }
}
