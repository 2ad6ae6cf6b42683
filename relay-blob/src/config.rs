use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BlobError, BlobResult, S3Config};

/// Smallest part size S3 accepts for every part but the last
pub const DEFAULT_PART_SIZE: usize = 5 * 1024 * 1024;

/// Hard limit on parts per multipart upload
pub const MAX_PARTS: u32 = 10_000;

/// Longest lifetime a presigned URL may be issued for
pub const MAX_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration shared by every sink
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Size of each uploaded part (bytes). Only the last part may be shorter.
    pub part_size: usize,

    /// Upper bound on parts per upload, protects memory and backend limits
    pub max_parts: u32,

    /// Lifetime of public URLs handed back to callers
    pub url_ttl: Duration,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            max_parts: MAX_PARTS,
            url_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set part size
    pub fn with_part_size(mut self, bytes: usize) -> Self {
        self.part_size = bytes;
        self
    }

    /// Set max parts
    pub fn with_max_parts(mut self, max: u32) -> Self {
        self.max_parts = max;
        self
    }

    /// Set the lifetime of presigned URLs
    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    /// Reject settings no backend can honour
    pub fn validate(&self) -> BlobResult<()> {
        if self.part_size == 0 {
            return Err(BlobError::config("part size must be at least one byte"));
        }
        if self.max_parts == 0 || self.max_parts > MAX_PARTS {
            return Err(BlobError::config(format!(
                "max parts must be within 1-{}, got {}",
                MAX_PARTS, self.max_parts
            )));
        }
        check_url_ttl(self.url_ttl)
    }
}

pub(crate) fn check_url_ttl(ttl: Duration) -> BlobResult<()> {
    if ttl.is_zero() || ttl > MAX_URL_TTL {
        return Err(BlobError::invalid(format!(
            "url ttl must be within 1s-{}s, got {}s",
            MAX_URL_TTL.as_secs(),
            ttl.as_secs()
        )));
    }
    Ok(())
}

/// Which backend captured media lands in. Resolved once at startup by
/// [`open_sink`](crate::open_sink).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Plain files below a local directory
    Filesystem { base_dir: PathBuf },
    /// Multipart uploads into an S3-compatible bucket
    S3(S3Config),
}

impl SinkConfig {
    pub fn filesystem<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self::Filesystem {
            base_dir: base_dir.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Filesystem { .. } => "filesystem",
            Self::S3(_) => "s3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BlobConfig::default();
        assert_eq!(config.part_size, 5 * 1024 * 1024);
        assert_eq!(config.url_ttl, Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_part_size_is_rejected() {
        let config = BlobConfig::new().with_part_size(0);
        assert!(matches!(config.validate(), Err(BlobError::Config { .. })));
    }

    #[test]
    fn url_ttl_bounds() {
        assert!(check_url_ttl(Duration::ZERO).is_err());
        assert!(check_url_ttl(MAX_URL_TTL).is_ok());
        assert!(check_url_ttl(MAX_URL_TTL + Duration::from_secs(1)).is_err());
    }

    #[test]
    fn sink_config_from_json() {
        let fs: SinkConfig =
            serde_json::from_str(r#"{"kind":"filesystem","base_dir":"media"}"#).unwrap();
        assert!(matches!(fs, SinkConfig::Filesystem { ref base_dir } if base_dir == &PathBuf::from("media")));

        let s3: SinkConfig = serde_json::from_str(
            r#"{"kind":"s3","bucket":"media","region":"eu-central-1","endpoint":"http://localhost:9000","force_path_style":true}"#,
        )
        .unwrap();
        match s3 {
            SinkConfig::S3(cfg) => {
                assert_eq!(cfg.bucket, "media");
                assert_eq!(cfg.endpoint.as_deref(), Some("http://localhost:9000"));
                assert!(cfg.credentials.is_none());
            }
            other => panic!("unexpected sink config: {:?}", other),
        }
    }
}
