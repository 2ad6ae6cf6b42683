use std::sync::Arc;

use async_trait::async_trait;

use crate::PollResult;

/// One update as handed to the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent<P> {
    pub id: i64,
    pub payload: P,
}

impl<P> UpdateEvent<P> {
    pub fn new(id: i64, payload: P) -> Self {
        Self { id, payload }
    }
}

/// A cursor-based long-poll endpoint.
///
/// `poll` returns every update with `id >= offset` that is available within
/// the source's own long-poll window. An empty batch is a normal answer.
/// Errors must be classified: [`crate::PollError::Transient`] is retried,
/// anything else stops the stream.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    type Payload: Send + 'static;

    async fn poll(&self, offset: Option<i64>) -> PollResult<Vec<UpdateEvent<Self::Payload>>>;
}

#[async_trait]
impl<S: UpdateSource + ?Sized> UpdateSource for Arc<S> {
    type Payload = S::Payload;

    async fn poll(&self, offset: Option<i64>) -> PollResult<Vec<UpdateEvent<Self::Payload>>> {
        (**self).poll(offset).await
    }
}
