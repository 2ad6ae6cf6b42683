//! # relay-telegram
//!
//! Minimal Telegram Bot API client used by the relay.
//!
//! - `getMe` token check on [`Api::connect`]
//! - `getUpdates` long polling, also exposed as an
//!   [`relay_updates::UpdateSource`]
//! - `sendMessage` with reply keyboards, inline keyboards and MarkdownV2
//! - `getFile` plus a streamed download of the file body
//!
//! The bot token is part of every request path. It is replaced with `*****`
//! in everything this crate logs or prints.

mod api;
mod config;
mod error;
pub mod keyboard;
mod message;
mod model;

pub use api::{Api, FileStream, RemoteFile};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{TelegramError, TelegramResult};
pub use keyboard::{InlineButton, InlineKeyboard, KeyboardButton, ReplyKeyboard, ReplyMarkup};
pub use message::{OutgoingMessage, ParseMode};
pub use model::{BotUser, Chat, File, Message, PhotoSize, Update, User, Video};
