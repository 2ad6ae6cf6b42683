use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::{BlobError, BlobResult};

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Handle returned by a sink for a stored blob: a local path or an object key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobLocator(pub String);

impl BlobLocator {
    pub fn new<S: Into<String>>(locator: S) -> Self {
        Self(locator.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for BlobLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend-issued identifier of a multipart upload session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(pub String);

impl UploadId {
    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integrity tag the backend returned for one uploaded part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

/// State of an upload session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadState {
    Initiated,
    InProgress,
    Completed,
    Aborted,
}

impl UploadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// One multipart upload, created per `store` call and finished before it
/// returns.
///
/// Part numbers start at 1 and stay contiguous; `Completed` needs at least one
/// part and `Aborted` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub upload_id: UploadId,
    pub bucket: String,
    pub key: String,
    pub parts: Vec<CompletedPart>,
    pub state: UploadState,
    pub received_bytes: u64,
}

impl UploadSession {
    pub fn new(upload_id: UploadId, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            upload_id,
            bucket: bucket.into(),
            key: key.into(),
            parts: Vec::new(),
            state: UploadState::Initiated,
            received_bytes: 0,
        }
    }

    /// Part number the next upload must carry
    pub fn next_part_number(&self) -> u32 {
        self.parts.len() as u32 + 1
    }

    /// Record an acknowledged part
    pub fn record_part(&mut self, part: CompletedPart, size_bytes: u64) -> BlobResult<()> {
        if self.state.is_terminal() {
            return Err(self.illegal("record a part"));
        }
        let expected = self.next_part_number();
        if part.part_number != expected {
            return Err(BlobError::invalid(format!(
                "part {} recorded out of order, expected {}",
                part.part_number, expected
            )));
        }
        self.parts.push(part);
        self.received_bytes += size_bytes;
        self.state = UploadState::InProgress;
        Ok(())
    }

    pub fn mark_completed(&mut self) -> BlobResult<()> {
        if self.state != UploadState::InProgress || self.parts.is_empty() {
            return Err(self.illegal("complete"));
        }
        self.state = UploadState::Completed;
        Ok(())
    }

    pub fn mark_aborted(&mut self) -> BlobResult<()> {
        if self.state == UploadState::Completed {
            return Err(self.illegal("abort"));
        }
        self.state = UploadState::Aborted;
        Ok(())
    }

    fn illegal(&self, action: &str) -> BlobError {
        BlobError::invalid(format!(
            "cannot {} upload {} in state {:?}",
            action, self.upload_id, self.state
        ))
    }
}
