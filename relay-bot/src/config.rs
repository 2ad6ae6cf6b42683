use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use relay_blob::{BlobConfig, S3Config, SinkConfig};
use relay_telegram::{ClientConfig, DEFAULT_BASE_URL};
use relay_updates::{RetryPolicy, StreamConfig};

use crate::RelayConfig;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    Filesystem,
    S3,
}

#[derive(Debug, Parser)]
#[command(name = "relay-bot")]
#[command(about = "Echoes chat messages and captures photos and videos into blob storage")]
pub struct Cli {
    /// Bot API token
    #[arg(long, env = "RELAY_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log as JSON lines
    #[arg(long, env = "RELAY_LOG_JSON")]
    pub log_json: bool,

    /// Bot API base URL
    #[arg(long, env = "RELAY_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Long-poll window in seconds; 0 polls without waiting
    #[arg(long, env = "RELAY_POLL_TIMEOUT", default_value_t = 25)]
    pub poll_timeout_secs: u64,

    /// Per-request timeout in seconds, on top of the long-poll window
    #[arg(long, env = "RELAY_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Retries for a failing poll before giving up
    #[arg(long, env = "RELAY_MAX_RETRIES", default_value_t = 8)]
    pub max_retries: u32,

    /// Where captured media goes; S3 settings come from RELAY_S3_* variables
    #[arg(long, env = "RELAY_SINK", value_enum, default_value_t = SinkKind::Filesystem)]
    pub sink: SinkKind,

    /// JSON sink description, overrides --sink
    #[arg(long, env = "RELAY_SINK_CONFIG")]
    pub sink_config: Option<PathBuf>,

    /// Directory for the filesystem sink
    #[arg(long, env = "RELAY_FS_DIR", default_value = "media")]
    pub media_dir: PathBuf,

    /// Multipart part size in MiB
    #[arg(long, env = "RELAY_PART_SIZE_MIB", default_value_t = 5)]
    pub part_size_mib: usize,

    /// Lifetime of presigned links in seconds
    #[arg(long, env = "RELAY_URL_TTL", default_value_t = 3600)]
    pub url_ttl_secs: u64,

    /// Updates handled concurrently
    #[arg(long, env = "RELAY_MAX_CONCURRENT", default_value_t = 1)]
    pub max_concurrent_updates: usize,

    /// Idle seconds before a chat's session is forgotten
    #[arg(long, env = "RELAY_SESSION_TTL", default_value_t = 86400)]
    pub session_ttl_secs: u64,
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        let long_poll = (self.poll_timeout_secs > 0).then(|| Duration::from_secs(self.poll_timeout_secs));
        ClientConfig::new()
            .with_base_url(self.api_url.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_long_poll_timeout(long_poll)
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig::new().with_retry(RetryPolicy::default().with_max_retries(self.max_retries))
    }

    pub fn blob_config(&self) -> BlobConfig {
        BlobConfig::new()
            .with_part_size(self.part_size_mib.saturating_mul(MIB))
            .with_url_ttl(self.url_ttl())
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            url_ttl: self.url_ttl(),
            max_concurrent_updates: self.max_concurrent_updates,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Resolve the sink: a JSON file wins, then `--sink`
    pub fn sink(&self) -> Result<SinkConfig> {
        if let Some(path) = &self.sink_config {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading sink config {}", path.display()))?;
            return serde_json::from_str(&raw)
                .with_context(|| format!("parsing sink config {}", path.display()));
        }

        match self.sink {
            SinkKind::Filesystem => Ok(SinkConfig::filesystem(&self.media_dir)),
            SinkKind::S3 => {
                let s3 = S3Config::from_env("RELAY_S3_").context("S3 sink selected")?;
                Ok(SinkConfig::S3(s3))
            }
        }
    }

    fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["relay-bot", "--token", "1:abc"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);

        assert_eq!(cli.sink, SinkKind::Filesystem);
        assert_eq!(cli.client_config().long_poll_timeout, Some(Duration::from_secs(25)));
        assert_eq!(cli.blob_config().part_size, BlobConfig::default().part_size);
        assert_eq!(cli.blob_config().url_ttl, Duration::from_secs(3600));
        assert_eq!(cli.relay_config().max_concurrent_updates, 1);
        assert!(matches!(cli.sink().unwrap(), SinkConfig::Filesystem { base_dir } if base_dir == PathBuf::from("media")));
    }

    #[test]
    fn zero_poll_timeout_means_short_polling() {
        let cli = parse(&["--poll-timeout-secs", "0"]);
        assert_eq!(cli.client_config().long_poll_timeout, None);
    }

    #[test]
    fn sink_config_file_overrides_flag() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"kind": "filesystem", "base_dir": "/var/relay"}}"#).unwrap();

        let cli = parse(&["--sink", "s3", "--sink-config", file.path().to_str().unwrap()]);

        assert!(matches!(
            cli.sink().unwrap(),
            SinkConfig::Filesystem { base_dir } if base_dir == PathBuf::from("/var/relay")
        ));
    }
}
