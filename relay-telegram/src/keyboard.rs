use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

/// A row of reply keyboard buttons
pub type ButtonRow = Vec<KeyboardButton>;

pub fn button(text: impl Into<String>) -> KeyboardButton {
    KeyboardButton { text: text.into() }
}

pub fn row(buttons: impl IntoIterator<Item = KeyboardButton>) -> ButtonRow {
    buttons.into_iter().collect()
}

/// Custom keyboard shown in place of the user's regular one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboard {
    pub keyboard: Vec<ButtonRow>,
    pub resize_keyboard: bool,
}

impl ReplyKeyboard {
    /// Resized to fit its buttons by default
    pub fn new(rows: impl IntoIterator<Item = ButtonRow>) -> Self {
        Self {
            keyboard: rows.into_iter().collect(),
            resize_keyboard: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub url: String,
}

impl InlineButton {
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

/// Buttons attached to the message itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new(rows: impl IntoIterator<Item = Vec<InlineButton>>) -> Self {
        Self {
            inline_keyboard: rows.into_iter().collect(),
        }
    }
}

/// Any markup `sendMessage` accepts as `reply_markup`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Reply(ReplyKeyboard),
    Inline(InlineKeyboard),
}

impl From<ReplyKeyboard> for ReplyMarkup {
    fn from(keyboard: ReplyKeyboard) -> Self {
        Self::Reply(keyboard)
    }
}

impl From<InlineKeyboard> for ReplyMarkup {
    fn from(keyboard: InlineKeyboard) -> Self {
        Self::Inline(keyboard)
    }
}
