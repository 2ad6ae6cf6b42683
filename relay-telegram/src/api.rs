use std::fmt;
use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use relay_updates::{PollResult, UpdateEvent, UpdateSource};

use crate::{BotUser, ClientConfig, File, Message, OutgoingMessage, TelegramError, TelegramResult, Update};

const REDACTED: &str = "*****";

/// Raw bytes of a downloaded file, read incrementally
pub type FileStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// A file handle together with its open download
pub struct RemoteFile {
    pub file: File,
    pub stream: FileStream,
}

impl fmt::Debug for RemoteFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteFile").field("file", &self.file).finish_non_exhaustive()
    }
}

/// Bot API client scoped to one bot token
#[derive(Clone)]
pub struct Api {
    client: Client,
    token: String,
    config: ClientConfig,
    me: Option<BotUser>,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("token", &REDACTED)
            .field("config", &self.config)
            .field("me", &self.me)
            .finish()
    }
}

impl Api {
    /// Build a client without contacting the API
    pub fn new(token: impl Into<String>, config: ClientConfig) -> TelegramResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TelegramError::config("bot token is empty"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.total_timeout())
            .build()
            .map_err(|e| TelegramError::config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token,
            config,
            me: None,
        })
    }

    /// Build a client and check the token with `getMe`
    pub async fn connect(token: impl Into<String>, config: ClientConfig) -> TelegramResult<Self> {
        let mut api = Self::new(token, config)?;
        let me = api.get_me().await?;
        info!(bot = me.username(), "Connected to Bot API");
        api.me = Some(me);
        Ok(api)
    }

    /// The bot account, once [`Api::connect`] has verified it
    pub fn me(&self) -> Option<&BotUser> {
        self.me.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get_me(&self) -> TelegramResult<BotUser> {
        let url = self.method_url("getMe");
        debug!("tg: GET -> {}", self.redact(&url));
        self.call(self.client.get(&url)).await
    }

    /// Updates with `update_id >= offset`; a zero or missing offset is not sent
    pub async fn get_updates(&self, offset: Option<i64>) -> TelegramResult<Vec<Update>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(offset) = offset.filter(|o| *o != 0) {
            query.push(("offset", offset.to_string()));
        }
        if let Some(timeout) = self.config.long_poll_timeout {
            query.push(("timeout", timeout.as_secs().to_string()));
        }

        let url = self.method_url("getUpdates");
        debug!(?offset, "tg: GET -> {}", self.redact(&url));
        self.call(self.client.get(&url).query(&query)).await
    }

    #[instrument(skip(self, message), fields(chat_id = message.chat_id))]
    pub async fn send_message(&self, message: &OutgoingMessage) -> TelegramResult<Message> {
        let url = self.method_url("sendMessage");
        debug!("tg: POST -> {}", self.redact(&url));
        self.call(self.client.post(&url).json(message)).await
    }

    pub async fn get_file(&self, file_id: &str) -> TelegramResult<File> {
        let url = self.method_url("getFile");
        debug!(file_id, "tg: POST -> {}", self.redact(&url));
        self.call(self.client.post(&url).json(&json!({ "file_id": file_id })))
            .await
    }

    /// Resolve a file id and open its download as a byte stream.
    ///
    /// The body is not buffered; dropping the stream releases the connection.
    #[instrument(skip(self))]
    pub async fn open_file(&self, file_id: &str) -> TelegramResult<RemoteFile> {
        let file = self.get_file(file_id).await?;
        let path = file
            .file_path
            .clone()
            .ok_or_else(|| TelegramError::MissingFilePath {
                file_id: file_id.to_string(),
            })?;

        let url = self.file_url(&path);
        debug!("tg: GET -> {}", self.redact(&url));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(TelegramError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelegramError::Status {
                status: status.as_u16(),
                description: status.canonical_reason().unwrap_or("download failed").to_string(),
            });
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::other(e.without_url()));

        Ok(RemoteFile {
            file,
            stream: Box::pin(stream),
        })
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> TelegramResult<T> {
        let response = request.send().await.map_err(TelegramError::transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(TelegramError::transport)?;
        debug!(%status, bytes = body.len(), "tg: response");

        decode_envelope(status, &body)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.config.base_url, self.token, method)
    }

    fn file_url(&self, path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.config.base_url,
            self.token,
            path.trim_start_matches('/')
        )
    }

    fn redact(&self, text: &str) -> String {
        text.replace(&self.token, REDACTED)
    }
}

#[async_trait]
impl UpdateSource for Api {
    type Payload = Update;

    async fn poll(&self, offset: Option<i64>) -> PollResult<Vec<UpdateEvent<Update>>> {
        let updates = self.get_updates(offset).await?;
        Ok(updates
            .into_iter()
            .map(|update| UpdateEvent::new(update.update_id, update))
            .collect())
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

/// Unwrap `{ok, result}`; a non-2xx status or `ok: false` is an error
pub(crate) fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> TelegramResult<T> {
    if !status.is_success() {
        let description = serde_json::from_slice::<Envelope<IgnoredAny>>(body)
            .ok()
            .and_then(|envelope| envelope.description)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        return Err(TelegramError::Status {
            status: status.as_u16(),
            description,
        });
    }

    let envelope: Envelope<T> =
        serde_json::from_slice(body).map_err(|e| TelegramError::malformed(e.to_string()))?;

    if !envelope.ok {
        return Err(TelegramError::Api {
            code: envelope.error_code,
            description: envelope
                .description
                .unwrap_or_else(|| "response not ok".to_string()),
        });
    }

    envelope
        .result
        .ok_or_else(|| TelegramError::malformed("ok response without result"))
}
