use botforge_core::definition::NodeKind;
use botforge_core::step::MessageType;

/// The fixed node-type → message classification table.
///
/// This is one of two views of the same classification — the other is the
/// content shape emitted by [`crate::content::message_content`] — and the
/// runtime reads both, so the two must never disagree.
pub fn message_type_for(kind: NodeKind) -> MessageType {
    match kind {
        NodeKind::Message => MessageType::Text,
        NodeKind::Question => MessageType::QuickReply,
        NodeKind::List => MessageType::List,
        NodeKind::Buttons => MessageType::Buttons,
        NodeKind::Start | NodeKind::Unknown => MessageType::Text,
    }
}
