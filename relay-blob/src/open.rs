use std::sync::Arc;

use tracing::info;

use crate::{
    BlobConfig, BlobResult, BlobSink, FilesystemBlobSink, MultipartBlobSink, S3Backend, SinkConfig,
};

/// Build the sink described by `config`, validating the backend once.
///
/// A missing bucket, bad credentials or an uncreatable directory fail here,
/// before any media is accepted.
pub async fn open_sink(sink: &SinkConfig, config: BlobConfig) -> BlobResult<Arc<dyn BlobSink>> {
    config.validate()?;

    let opened: Arc<dyn BlobSink> = match sink {
        SinkConfig::Filesystem { base_dir } => Arc::new(FilesystemBlobSink::new(base_dir.clone()).await?),
        SinkConfig::S3(s3) => {
            let backend = S3Backend::connect(s3).await?;
            Arc::new(MultipartBlobSink::with_presigned_urls(backend, config))
        }
    };

    info!(kind = sink.kind(), capabilities = ?opened.capabilities(), "blob sink ready");
    Ok(opened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlobError;

    #[tokio::test]
    async fn opens_filesystem_sink() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = open_sink(
            &SinkConfig::filesystem(tmp.path().join("media")),
            BlobConfig::default(),
        )
        .await
        .unwrap();

        assert!(sink.capabilities().local_paths);
        assert!(sink.presigner().is_none());
        assert!(tmp.path().join("media").is_dir());
    }

    #[tokio::test]
    async fn invalid_blob_config_fails_before_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let result = open_sink(
            &SinkConfig::filesystem(tmp.path().join("media")),
            BlobConfig::new().with_part_size(0),
        )
        .await;

        assert!(matches!(result, Err(BlobError::Config { .. })));
        assert!(!tmp.path().join("media").exists());
    }
}
