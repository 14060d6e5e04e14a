//! Upload error types.

/// Errors produced while driving a multipart upload.
///
/// Every variant carries rendered messages so a single error can be handed to
/// the error observer, the event channel and the final report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("invalid upload: {0}")]
    InvalidSpec(String),

    #[error("could not read source: {0}")]
    Source(String),

    #[error("could not initialize multipart upload: {0}")]
    Initialization(String),

    #[error("could not get part upload targets: {0}")]
    TargetAcquisition(String),

    #[error("could not upload part {part_number}: {message}")]
    PartUpload { part_number: u16, message: String },

    #[error("could not finalize multipart upload: {0}")]
    Finalization(String),

    #[error("upload task failed: {0}")]
    Task(String),
}

impl UploadError {
    #[must_use]
    pub fn part(part_number: u16, message: impl ToString) -> Self {
        Self::PartUpload {
            part_number,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let test_cases = vec![
            (
                UploadError::InvalidSpec("empty object".to_string()),
                "invalid upload: empty object",
            ),
            (
                UploadError::TargetAcquisition("expected 3 targets, got 2".to_string()),
                "could not get part upload targets: expected 3 targets, got 2",
            ),
            (
                UploadError::part(2, "HTTP Status Code: 500"),
                "could not upload part 2: HTTP Status Code: 500",
            ),
        ];
        for (error, expected) in test_cases {
            assert_eq!(error.to_string(), expected);
        }
    }
}
