use serde::Serialize;

use crate::keyboard::ReplyMarkup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    MarkdownV2,
}

/// Body of a `sendMessage` call.
///
/// ```rust
/// use relay_telegram::{keyboard, OutgoingMessage, ReplyKeyboard};
///
/// let msg = OutgoingMessage::text(42, "pick one")
///     .in_reply_to(7)
///     .with_keyboard(ReplyKeyboard::new([keyboard::row([keyboard::button("ok")])]));
/// assert_eq!(msg.reply_to_message_id, Some(7));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
}

impl OutgoingMessage {
    pub fn text(chat_id: i64, body: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: body.into(),
            reply_to_message_id: None,
            reply_markup: None,
            parse_mode: None,
        }
    }

    pub fn in_reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    pub fn with_keyboard(mut self, markup: impl Into<ReplyMarkup>) -> Self {
        self.reply_markup = Some(markup.into());
        self
    }

    /// Render the text as MarkdownV2
    pub fn markdown(mut self) -> Self {
        self.parse_mode = Some(ParseMode::MarkdownV2);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_text_omits_optional_fields() {
        let msg = OutgoingMessage::text(10, "echo: hi");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"chat_id": 10, "text": "echo: hi"})
        );
    }

    #[test]
    fn markdown_reply() {
        let msg = OutgoingMessage::text(10, "*bold*").in_reply_to(3).markdown();
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["parse_mode"], "MarkdownV2");
        assert_eq!(value["reply_to_message_id"], 3);
    }
}
