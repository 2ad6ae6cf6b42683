use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BlobLocator, BlobResult, ByteStream, CompletedPart, UploadId};

/// A destination for captured media - must be implemented by every sink
#[async_trait]
pub trait BlobSink: Send + Sync {
    /// Store the whole stream and return the locator of the new blob
    async fn store(&self, source: ByteStream, extension: &str) -> BlobResult<BlobLocator>;

    /// Get sink capabilities
    fn capabilities(&self) -> SinkCapabilities;

    /// Presigning support, fixed when the sink is built
    fn presigner(&self) -> Option<&dyn PresignedUrlProvider> {
        None
    }
}

/// Optional signed URL support
#[async_trait]
pub trait PresignedUrlProvider: Send + Sync {
    /// Generate a URL that reads the blob anonymously until `now + ttl`
    async fn public_url(&self, locator: &BlobLocator, ttl: Duration) -> BlobResult<String>;
}

/// Remote object store speaking init / upload-part / complete / abort
#[async_trait]
pub trait MultipartBackend: Send + Sync {
    /// Bucket every upload lands in
    fn bucket(&self) -> &str;

    /// Reachability check run once at startup
    async fn probe(&self) -> BlobResult<()>;

    /// Initialize a multipart upload
    async fn init_multipart(&self, key: &str) -> BlobResult<UploadId>;

    /// Upload a part
    async fn put_part(
        &self,
        key: &str,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> BlobResult<CompletedPart>;

    /// Complete multipart upload; `parts` is ordered by part number
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &UploadId,
        parts: &[CompletedPart],
    ) -> BlobResult<()>;

    /// Abort multipart upload and release what the backend reserved for it
    async fn abort_multipart(&self, key: &str, upload_id: &UploadId) -> BlobResult<()>;
}

/// Sink capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkCapabilities {
    pub multipart: bool,
    pub presigned_urls: bool,
    pub local_paths: bool,
}

impl SinkCapabilities {
    pub fn basic() -> Self {
        Self::default()
    }

    pub fn with_multipart(mut self) -> Self {
        self.multipart = true;
        self
    }

    pub fn with_presigned_urls(mut self) -> Self {
        self.presigned_urls = true;
        self
    }

    pub fn with_local_paths(mut self) -> Self {
        self.local_paths = true;
        self
    }
}

/// Strategy for naming stored blobs
pub trait BlobKeyStrategy: Send + Sync {
    /// Generate a fresh, globally unique name for a blob with this extension
    fn object_key(&self, extension: &str) -> String;
}

/// Default key strategy: `<uuid>.<extension>`
#[derive(Debug, Clone)]
pub struct DefaultKeyStrategy;

impl BlobKeyStrategy for DefaultKeyStrategy {
    fn object_key(&self, extension: &str) -> String {
        let id = uuid::Uuid::new_v4();
        match extension.trim_start_matches('.') {
            "" => id.to_string(),
            ext => format!("{}.{}", id, ext),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys_are_unique_and_carry_extension() {
        let keys = DefaultKeyStrategy;
        let a = keys.object_key("jpg");
        let b = keys.object_key(".jpg");
        assert_ne!(a, b);
        assert!(a.ends_with(".jpg"));
        assert!(b.ends_with(".jpg") && !b.ends_with("..jpg"));
        assert_eq!(a.len(), 36 + 4);
    }

    #[test]
    fn empty_extension_yields_bare_uuid() {
        let key = DefaultKeyStrategy.object_key("");
        assert!(uuid::Uuid::parse_str(&key).is_ok());
    }

    #[test]
    fn capabilities_builder() {
        let caps = SinkCapabilities::basic().with_multipart().with_presigned_urls();
        assert!(caps.multipart && caps.presigned_urls && !caps.local_paths);
    }
}
