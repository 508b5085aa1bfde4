use serde::{Deserialize, Serialize};

use crate::definition::{AiConfig, MediaItem};

/// Terminal marker emitted wherever a next step cannot be resolved.
pub const STOP_STEP: &str = "stop";

/// Runtime classification of a step's message, independent of the content
/// payload shape but required to agree with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    QuickReply,
    List,
    Buttons,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::QuickReply => "quick_reply",
            MessageType::List => "list",
            MessageType::Buttons => "buttons",
        }
    }

    /// Parse a stored classification, defaulting to `Text`.
    pub fn parse(s: &str) -> Self {
        match s {
            "quick_reply" => MessageType::QuickReply,
            "list" => MessageType::List,
            "buttons" => MessageType::Buttons,
            _ => MessageType::Text,
        }
    }
}

/// A text block nested inside quick-reply content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// A selectable option with its postback routing payload.
///
/// The postback text is `"{targetStep}/{label}"`; the runtime splits on the
/// slash to know where the conversation goes next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyOption {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub postback_text: String,
}

impl ReplyOption {
    pub fn text(title: impl Into<String>, postback_text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            title: title.into(),
            postback_text: postback_text.into(),
        }
    }
}

/// The global action button shown on list messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextButton {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
}

impl TextButton {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            title: title.into(),
        }
    }
}

/// One section of a compiled list message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSection {
    pub title: String,
    pub options: Vec<ReplyOption>,
}

/// The message payload of a compiled step, one shape per node kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    QuickReply {
        content: TextBlock,
        options: Vec<ReplyOption>,
    },
    List {
        title: String,
        body: String,
        #[serde(rename = "globalButtons")]
        global_buttons: Vec<TextButton>,
        items: Vec<ListSection>,
    },
    Unknown,
}

/// The flattened, addressable execution unit derived from one non-start
/// node. This is what gets persisted and what the conversation runtime
/// consumes; the field set is part of the external contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledStep {
    pub step: String,
    pub step_name: String,
    pub variable: String,
    pub mandatory: bool,
    pub check_post: bool,
    pub purpose: String,
    pub enable_ai_takeover: bool,
    pub regex: String,
    /// Never empty; a sink node carries `["stop"]`.
    pub next_possible_steps: Vec<String>,
    pub type_of_message: MessageType,
    pub message_content: MessageContent,
    pub media_items: Vec<MediaItem>,
    /// Present only when the node explicitly enabled AI takeover.
    pub ai_config: Option<AiConfig>,
}
