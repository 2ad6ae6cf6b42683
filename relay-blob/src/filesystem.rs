use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use crate::{
    BlobError, BlobKeyStrategy, BlobLocator, BlobResult, BlobSink, ByteStream, DefaultKeyStrategy,
    SinkCapabilities,
};

/// Sink writing each blob to its own file below a base directory.
///
/// A file whose copy fails part way is removed before the error is returned.
pub struct FilesystemBlobSink {
    base_dir: PathBuf,
    keys: Arc<dyn BlobKeyStrategy>,
}

impl FilesystemBlobSink {
    /// Open the sink, creating `base_dir` if it does not exist yet
    pub async fn new<P: Into<PathBuf>>(base_dir: P) -> BlobResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await.map_err(|err| {
            BlobError::config(format!(
                "cannot create media directory {}: {}",
                base_dir.display(),
                err
            ))
        })?;
        Ok(Self {
            base_dir,
            keys: Arc::new(DefaultKeyStrategy),
        })
    }

    /// Create with custom key strategy
    pub fn with_key_strategy<K: BlobKeyStrategy + 'static>(mut self, keys: K) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    async fn copy(path: &Path, mut source: ByteStream) -> BlobResult<u64> {
        let mut file = File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = source.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl BlobSink for FilesystemBlobSink {
    #[instrument(skip(self, source), fields(base_dir = %self.base_dir.display()))]
    async fn store(&self, source: ByteStream, extension: &str) -> BlobResult<BlobLocator> {
        let path = self.base_dir.join(self.keys.object_key(extension));

        match Self::copy(&path, source).await {
            Ok(bytes) => {
                info!(path = %path.display(), bytes, "stored blob");
                Ok(BlobLocator::new(path.to_string_lossy().into_owned()))
            }
            Err(err) => {
                if let Err(cleanup) = fs::remove_file(&path).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %path.display(), error = %cleanup, "partial file left behind");
                    }
                }
                Err(err)
            }
        }
    }

    fn capabilities(&self) -> SinkCapabilities {
        SinkCapabilities::basic().with_local_paths()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::stream;

    fn source(chunks: Vec<&'static str>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes()))),
        ))
    }

    #[tokio::test]
    async fn creates_missing_base_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        FilesystemBlobSink::new(&nested).await.unwrap();
        assert!(nested.is_dir());

        // opening again is not an error
        FilesystemBlobSink::new(&nested).await.unwrap();
    }

    #[tokio::test]
    async fn stores_stream_under_unique_name() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FilesystemBlobSink::new(tmp.path()).await.unwrap();

        let first = sink.store(source(vec!["hello ", "world"]), "txt").await.unwrap();
        let second = sink.store(source(vec!["again"]), "txt").await.unwrap();

        assert_ne!(first, second);
        assert!(first.as_str().ends_with(".txt"));
        assert!(Path::new(first.as_str()).starts_with(tmp.path()));
        assert_eq!(std::fs::read(first.as_str()).unwrap(), b"hello world");
        assert_eq!(std::fs::read(second.as_str()).unwrap(), b"again");
    }

    #[tokio::test]
    async fn empty_stream_creates_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FilesystemBlobSink::new(tmp.path()).await.unwrap();

        let locator = sink.store(source(vec![]), "jpg").await.unwrap();

        assert_eq!(std::fs::metadata(locator.as_str()).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn failed_copy_removes_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FilesystemBlobSink::new(tmp.path()).await.unwrap();
        let broken: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer went away")),
        ]));

        let result = sink.store(broken, "mp4").await;

        assert!(matches!(result, Err(BlobError::Io { .. })));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn filesystem_sink_cannot_presign() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FilesystemBlobSink::new(tmp.path()).await.unwrap();
        assert!(sink.presigner().is_none());
        assert!(!sink.capabilities().presigned_urls);
        assert!(sink.capabilities().local_paths);
    }
}
