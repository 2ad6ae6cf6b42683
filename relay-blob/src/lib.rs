//! # relay-blob: streaming sinks for captured media
//!
//! `relay-blob` takes a byte stream of unknown length (typically a file the
//! chat platform is still sending) and lands it in storage without holding
//! the whole payload in memory.
//!
//! ## Key Features
//!
//! - **Streaming-first**: multipart uploads read one fixed-size part at a time
//! - **Abort on failure**: an upload that fails mid-way is aborted, never left half-written
//! - **Pluggable backends**: S3-compatible storage, local filesystem, or in-memory for tests
//! - **Explicit capabilities**: presigned URLs only where the backend can produce them
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relay_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let sink = relay_blob::open_sink(
//!     &SinkConfig::filesystem("media"),
//!     BlobConfig::default(),
//! ).await?;
//!
//! let data = bytes::Bytes::from_static(b"Hello, world!");
//! let stream = futures_util::stream::once(async move { Ok(data) });
//! let locator = sink.store(Box::pin(stream), "txt").await?;
//!
//! if let Some(presigner) = sink.presigner() {
//!     let url = presigner.public_url(&locator, std::time::Duration::from_secs(3600)).await?;
//!     println!("{}", url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │   BlobSink           │  ← store(stream, extension) -> locator
//! ├──────────┬───────────┤
//! │ Multipart│ Filesystem│
//! ├──────────┴───────────┤
//! │   MultipartBackend   │  ← init / part / complete / abort
//! └──────────────────────┘
//! ```

mod config;
mod error;
mod filesystem;
mod memory;
mod multipart;
mod open;
mod s3_store;
pub mod store;
mod types;

// Re-export main types for clean API
pub use config::{BlobConfig, SinkConfig, DEFAULT_PART_SIZE, MAX_PARTS, MAX_URL_TTL};
pub use error::{BlobError, BlobResult};
pub use filesystem::FilesystemBlobSink;
pub use memory::{BackendCall, MemoryMultipartBackend};
pub use multipart::MultipartBlobSink;
pub use open::open_sink;
pub use s3_store::{S3Backend, S3Config, StaticCredentials};
pub use store::{
    BlobKeyStrategy, BlobSink, DefaultKeyStrategy, MultipartBackend, PresignedUrlProvider,
    SinkCapabilities,
};
pub use types::{
    BlobLocator, ByteStream, CompletedPart, UploadId, UploadSession, UploadState,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobConfig, BlobError, BlobLocator, BlobResult, BlobSink, ByteStream,
        PresignedUrlProvider, SinkConfig,
    };
}
