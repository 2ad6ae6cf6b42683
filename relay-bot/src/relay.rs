use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use relay_blob::{BlobLocator, BlobSink};
use relay_telegram::{
    Api, InlineButton, InlineKeyboard, Message, OutgoingMessage, RemoteFile, TelegramResult,
    Update,
};
use relay_updates::{PollResult, UpdateEvent, UpdateStream};
use tracing::{debug, error, info, instrument, warn};

use crate::media::{self, Capture};
use crate::{ChatSessions, RelayResult};

/// The chat operations the relay needs
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(&self, message: &OutgoingMessage) -> TelegramResult<Message>;

    async fn open_file(&self, file_id: &str) -> TelegramResult<RemoteFile>;
}

#[async_trait]
impl ChatApi for Api {
    async fn send_message(&self, message: &OutgoingMessage) -> TelegramResult<Message> {
        Api::send_message(self, message).await
    }

    async fn open_file(&self, file_id: &str) -> TelegramResult<RemoteFile> {
        Api::open_file(self, file_id).await
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Lifetime of the links handed back for stored media
    pub url_ttl: Duration,

    /// Updates handled at once; 1 handles them strictly one after another
    pub max_concurrent_updates: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url_ttl: Duration::from_secs(3600),
            max_concurrent_updates: 1,
        }
    }
}

/// What happened to one update
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Skipped,
    Echoed,
    Captured(BlobLocator),
    Reported,
    Forgotten,
}

/// Consumes updates: echoes text, stores photos and videos, answers session commands
pub struct Relay<C> {
    chat: Arc<C>,
    sink: Arc<dyn BlobSink>,
    sessions: ChatSessions,
    config: RelayConfig,
}

impl<C: ChatApi> Relay<C> {
    pub fn new(chat: Arc<C>, sink: Arc<dyn BlobSink>, sessions: ChatSessions, config: RelayConfig) -> Self {
        Self {
            chat,
            sink,
            sessions,
            config,
        }
    }

    pub fn sessions(&self) -> &ChatSessions {
        &self.sessions
    }

    /// Drain the stream until it ends, then report how it ended
    pub async fn run(&self, mut updates: UpdateStream<Update>) -> PollResult<()> {
        let limit = self.config.max_concurrent_updates.max(1);
        info!(limit, "Relay consuming updates");

        (&mut updates)
            .for_each_concurrent(limit, |event| self.dispatch(event))
            .await;

        updates.finish().await
    }

    async fn dispatch(&self, event: UpdateEvent<Update>) {
        let update_id = event.id;
        match self.handle(event.payload).await {
            Ok(outcome) => debug!(update_id, ?outcome, "Update handled"),
            Err(e) => warn!(update_id, "Update not fully processed: {}", e),
        }

        let purged = self.sessions.purge_expired();
        if purged > 0 {
            debug!(purged, "Expired chat sessions dropped");
        }
    }

    /// Handle one update. Errors only concern this update.
    pub async fn handle(&self, update: Update) -> RelayResult<Outcome> {
        let Some(message) = update.message else {
            return Ok(Outcome::Skipped);
        };
        let chat_id = message.chat.id;

        if let Some(capture) = media::capture_for(&message) {
            return match self.capture(&message, &capture).await {
                Ok(locator) => Ok(Outcome::Captured(locator)),
                Err(e) => {
                    error!(chat_id, file_id = %capture.file_id, "Capture failed: {}", e);
                    let sorry = OutgoingMessage::text(chat_id, "sorry, that file could not be saved")
                        .in_reply_to(message.message_id);
                    if let Err(reply_err) = self.chat.send_message(&sorry).await {
                        warn!(chat_id, "Failure notice not sent: {}", reply_err);
                    }
                    Err(e)
                }
            };
        }

        let Some(text) = message.text.as_deref() else {
            return Ok(Outcome::Skipped);
        };

        let (body, outcome) = match command(text) {
            Some("/last") => {
                let body = match self.sessions.get(chat_id) {
                    Some(session) => format!(
                        "last capture: {} ({} so far)",
                        session.last_locator, session.captured
                    ),
                    None => "nothing captured yet".to_string(),
                };
                (body, Outcome::Reported)
            }
            Some("/forget") => {
                let body = if self.sessions.clear(chat_id) {
                    "forgotten"
                } else {
                    "nothing to forget"
                };
                (body.to_string(), Outcome::Forgotten)
            }
            _ => (format!("echo: {}", text), Outcome::Echoed),
        };

        let reply = OutgoingMessage::text(chat_id, body).in_reply_to(message.message_id);
        self.chat.send_message(&reply).await?;
        Ok(outcome)
    }

    #[instrument(skip(self, message, capture), fields(chat_id = message.chat.id, ext = capture.extension))]
    async fn capture(&self, message: &Message, capture: &Capture) -> RelayResult<BlobLocator> {
        let chat_id = message.chat.id;

        let remote = self.chat.open_file(&capture.file_id).await?;
        debug!(size = ?remote.file.file_size, "Downloading capture");

        let locator = self.sink.store(remote.stream, capture.extension).await?;
        info!(%locator, "Media captured");
        self.sessions.record_capture(chat_id, locator.clone());

        let reply = self.saved_reply(chat_id, &locator).await.in_reply_to(message.message_id);
        if let Err(e) = self.chat.send_message(&reply).await {
            warn!(chat_id, "Capture stored but reply not sent: {}", e);
        }
        Ok(locator)
    }

    /// A link when the sink can presign one, otherwise the bare locator
    async fn saved_reply(&self, chat_id: i64, locator: &BlobLocator) -> OutgoingMessage {
        if let Some(presigner) = self.sink.presigner() {
            match presigner.public_url(locator, self.config.url_ttl).await {
                Ok(url) => {
                    return OutgoingMessage::text(chat_id, format!("saved: {}", url))
                        .with_keyboard(InlineKeyboard::new([vec![InlineButton::link("open", url)]]));
                }
                Err(e) => warn!(%locator, "Presigning failed, replying with locator: {}", e),
            }
        }
        OutgoingMessage::text(chat_id, format!("saved: {}", locator))
    }
}

/// Leading `/command`, without any `@botname` suffix
fn command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }
    first.split('@').next()
}
