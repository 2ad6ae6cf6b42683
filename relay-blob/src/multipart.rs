use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tracing::{debug, info, instrument, warn};

use crate::{
    BlobConfig, BlobError, BlobKeyStrategy, BlobLocator, BlobResult, BlobSink, ByteStream,
    DefaultKeyStrategy, MultipartBackend, PresignedUrlProvider, SinkCapabilities, UploadSession,
};

/// Sink that streams its input into a [`MultipartBackend`] one part at a time.
///
/// At most one part (plus the chunk that overflowed it) is held in memory.
/// Any failure after the session was initiated aborts it, so no half-written
/// object is left behind.
pub struct MultipartBlobSink<B: MultipartBackend> {
    backend: Arc<B>,
    presigner: Option<Arc<dyn PresignedUrlProvider>>,
    keys: Arc<dyn BlobKeyStrategy>,
    config: BlobConfig,
}

impl<B: MultipartBackend + 'static> MultipartBlobSink<B> {
    /// Create a sink without presigning support
    pub fn new(backend: B, config: BlobConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            presigner: None,
            keys: Arc::new(DefaultKeyStrategy),
            config,
        }
    }

    /// Create with custom key strategy
    pub fn with_key_strategy<K: BlobKeyStrategy + 'static>(mut self, keys: K) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get configuration
    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    async fn upload_parts(
        &self,
        session: &mut UploadSession,
        source: ByteStream,
    ) -> BlobResult<()> {
        let mut parts = PartReader::new(source, self.config.part_size);

        while let Some(body) = parts.next_part().await? {
            let part_number = session.next_part_number();
            if part_number > self.config.max_parts {
                return Err(BlobError::upload_failed(format!(
                    "input needs more than {} parts of {} bytes",
                    self.config.max_parts, self.config.part_size
                )));
            }

            let size = body.len() as u64;
            let part = self
                .backend
                .put_part(&session.key, &session.upload_id, part_number, body)
                .await?;
            if part.part_number != part_number {
                return Err(BlobError::upload_failed(format!(
                    "backend acknowledged part {} for part {}",
                    part.part_number, part_number
                )));
            }
            session.record_part(part, size)?;
            debug!(upload_id = %session.upload_id, part_number, size, "uploaded part");
        }

        self.backend
            .complete_multipart(&session.key, &session.upload_id, &session.parts)
            .await?;
        session.mark_completed()
    }

    async fn abort(&self, session: &mut UploadSession, cause: &BlobError) {
        warn!(
            upload_id = %session.upload_id,
            key = %session.key,
            parts = session.parts.len(),
            error = %cause,
            "aborting multipart upload"
        );
        if let Err(err) = self
            .backend
            .abort_multipart(&session.key, &session.upload_id)
            .await
        {
            warn!(upload_id = %session.upload_id, error = %err, "abort failed, upload may linger");
        }
        // Completed sessions never reach here.
        let _ = session.mark_aborted();
    }
}

impl<B: MultipartBackend + PresignedUrlProvider + 'static> MultipartBlobSink<B> {
    /// Create a sink that also hands out presigned URLs through the backend
    pub fn with_presigned_urls(backend: B, config: BlobConfig) -> Self {
        let backend = Arc::new(backend);
        Self {
            presigner: Some(backend.clone() as Arc<dyn PresignedUrlProvider>),
            backend,
            keys: Arc::new(DefaultKeyStrategy),
            config,
        }
    }
}

#[async_trait]
impl<B: MultipartBackend + 'static> BlobSink for MultipartBlobSink<B> {
    #[instrument(skip(self, source), fields(bucket = %self.backend.bucket()))]
    async fn store(&self, source: ByteStream, extension: &str) -> BlobResult<BlobLocator> {
        let key = self.keys.object_key(extension);
        let upload_id = self.backend.init_multipart(&key).await?;
        let mut session = UploadSession::new(upload_id, self.backend.bucket(), key);
        debug!(upload_id = %session.upload_id, key = %session.key, "initiated multipart upload");

        match self.upload_parts(&mut session, source).await {
            Ok(()) => {
                info!(
                    key = %session.key,
                    parts = session.parts.len(),
                    bytes = session.received_bytes,
                    "stored blob"
                );
                Ok(BlobLocator::new(session.key))
            }
            Err(err) => {
                self.abort(&mut session, &err).await;
                Err(err)
            }
        }
    }

    fn capabilities(&self) -> SinkCapabilities {
        let caps = SinkCapabilities::basic().with_multipart();
        if self.presigner.is_some() {
            caps.with_presigned_urls()
        } else {
            caps
        }
    }

    fn presigner(&self) -> Option<&dyn PresignedUrlProvider> {
        self.presigner.as_deref()
    }
}

/// Cuts a byte stream into parts of exactly `part_size` bytes, the last one
/// possibly shorter. An empty stream still yields one empty part.
pub(crate) struct PartReader {
    source: ByteStream,
    part_size: usize,
    pending: BytesMut,
    exhausted: bool,
    emitted: u32,
}

impl PartReader {
    pub(crate) fn new(source: ByteStream, part_size: usize) -> Self {
        Self {
            source,
            part_size,
            pending: BytesMut::new(),
            exhausted: false,
            emitted: 0,
        }
    }

    pub(crate) async fn next_part(&mut self) -> BlobResult<Option<Bytes>> {
        while self.pending.len() < self.part_size && !self.exhausted {
            match self.source.next().await {
                Some(chunk) => self.pending.extend_from_slice(&chunk?),
                None => self.exhausted = true,
            }
        }

        let take = self.pending.len().min(self.part_size);
        if take == 0 && self.emitted > 0 {
            return Ok(None);
        }
        self.emitted += 1;
        Ok(Some(self.pending.split_to(take).freeze()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendCall, MemoryMultipartBackend};
    use futures_util::stream;

    fn chunked(data: Vec<u8>, chunk: usize) -> ByteStream {
        let chunks: Vec<Result<Bytes, std::io::Error>> = data
            .chunks(chunk.max(1))
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    async fn part_sizes(data: Vec<u8>, chunk: usize, part_size: usize) -> Vec<usize> {
        let mut reader = PartReader::new(chunked(data, chunk), part_size);
        let mut sizes = Vec::new();
        while let Some(part) = reader.next_part().await.unwrap() {
            sizes.push(part.len());
        }
        sizes
    }

    #[tokio::test]
    async fn reader_yields_single_empty_part_for_empty_input() {
        assert_eq!(part_sizes(Vec::new(), 4, 10).await, vec![0]);
    }

    #[tokio::test]
    async fn reader_never_emits_empty_trailing_part() {
        assert_eq!(part_sizes(vec![1; 20], 3, 10).await, vec![10, 10]);
    }

    #[tokio::test]
    async fn reader_fills_parts_from_small_reads() {
        assert_eq!(part_sizes(vec![7; 25], 3, 10).await, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn reader_splits_oversized_chunks() {
        assert_eq!(part_sizes(vec![7; 25], 25, 10).await, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn too_many_parts_aborts() {
        let backend = MemoryMultipartBackend::new("media");
        let sink = MultipartBlobSink::new(
            backend.clone(),
            BlobConfig::new().with_part_size(4).with_max_parts(2),
        );

        let result = sink.store(chunked(vec![0; 9], 9), "bin").await;

        assert!(matches!(result, Err(BlobError::UploadFailed { .. })));
        let calls = backend.calls();
        assert!(matches!(calls.last(), Some(BackendCall::Abort { .. })));
        assert_eq!(backend.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn capabilities_follow_construction() {
        let sink = MultipartBlobSink::new(MemoryMultipartBackend::new("media"), BlobConfig::default());
        assert!(sink.capabilities().multipart);
        assert!(!sink.capabilities().presigned_urls);
        assert!(sink.presigner().is_none());
    }
}
