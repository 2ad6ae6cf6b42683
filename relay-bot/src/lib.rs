//! # relay-bot
//!
//! The consumer side of the relay. Text is echoed back, photos and videos are
//! downloaded and stored through a [`relay_blob::BlobSink`], and the sender
//! gets a link (or the storage locator) in reply.
//!
//! Two commands read the per-chat session: `/last` reports the latest
//! capture and `/forget` drops it.

mod config;
mod error;
mod logging;
pub mod media;
mod relay;
mod sessions;

pub use config::{Cli, SinkKind};
pub use error::{RelayError, RelayResult};
pub use logging::init_tracing;
pub use relay::{ChatApi, Outcome, Relay, RelayConfig};
pub use sessions::{ChatSession, ChatSessions};
