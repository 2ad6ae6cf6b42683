//! # relay-updates
//!
//! Turns a cursor-based long-poll endpoint into an ordered stream of updates.
//!
//! - **Ordered**: ids are delivered strictly ascending, never twice once the
//!   cursor has moved past them
//! - **Backpressure**: one update in flight; a slow consumer stalls polling
//! - **Cancellation**: observed between batches, so a batch is never cut short
//! - **Classified retries**: transient failures back off exponentially, fatal
//!   ones end the stream
//!
//! The cursor lives in memory only. Restarting the process may redeliver
//! updates the endpoint has not yet seen acknowledged.
//!
//! ```rust,no_run
//! use relay_updates::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run<S: UpdateSource + 'static>(source: S) -> PollResult<()>
//! # where S::Payload: std::fmt::Debug {
//! let cancel = CancellationToken::new();
//! let mut updates = UpdateStream::subscribe(source, 0, cancel.clone(), StreamConfig::default());
//!
//! while let Some(event) = updates.recv().await {
//!     println!("{} => {:?}", event.id, event.payload);
//! }
//!
//! updates.finish().await
//! # }
//! ```

mod cursor;
mod error;
mod retry;
mod source;
mod stream;

pub use cursor::Cursor;
pub use error::{PollError, PollResult};
pub use retry::RetryPolicy;
pub use source::{UpdateEvent, UpdateSource};
pub use stream::{StreamConfig, UpdateStream};

pub mod prelude {
    pub use crate::{
        PollError, PollResult, RetryPolicy, StreamConfig, UpdateEvent, UpdateSource, UpdateStream,
    };
}
