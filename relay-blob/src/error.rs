use thiserror::Error;

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur while storing blobs
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Sink misconfigured: {message}")]
    Config { message: String },

    #[error("Upload session not found: {upload_id}")]
    UploadNotFound { upload_id: String },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a configuration error, raised while opening a sink
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an upload not found error
    pub fn upload_not_found<S: Into<String>>(upload_id: S) -> Self {
        Self::UploadNotFound {
            upload_id: upload_id.into(),
        }
    }

    /// Create an upload failed error
    pub fn upload_failed<S: Into<String>>(reason: S) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_pick_their_variant() {
        assert!(matches!(BlobError::invalid("x"), BlobError::Invalid { .. }));
        assert!(matches!(BlobError::config("x"), BlobError::Config { .. }));
        assert!(matches!(BlobError::upload_failed("x"), BlobError::UploadFailed { .. }));
        assert_eq!(
            BlobError::upload_not_found("up-9").to_string(),
            "Upload session not found: up-9"
        );
    }

    #[test]
    fn backend_errors_keep_their_source() {
        let err = BlobError::backend(std::io::Error::other("bucket gone"));
        assert_eq!(err.to_string(), "Storage backend error: bucket gone");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn io_errors_convert() {
        let err: BlobError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, BlobError::Io { .. }));
    }
}
