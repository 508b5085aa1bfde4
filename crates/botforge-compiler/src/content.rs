use botforge_core::definition::{Edge, Node, NodeKind};
use botforge_core::step::{ListSection, MessageContent, TextBlock, TextButton};

use crate::address::StepAddressMap;
use crate::options::resolve_option;

/// Produce the message-content payload for one node.
///
/// Dispatch is an exhaustive match over `NodeKind`; the parallel
/// classification in [`crate::registry::message_type_for`] must stay in
/// agreement with the shapes produced here.
pub fn message_content(
    node: &Node,
    outgoing: &[&Edge],
    addresses: &StepAddressMap,
) -> MessageContent {
    match node.kind {
        NodeKind::Message => MessageContent::Text {
            text: node.data.text.clone().unwrap_or_default(),
        },

        NodeKind::Question => MessageContent::QuickReply {
            content: TextBlock::new(node.data.question.clone().unwrap_or_default()),
            options: node
                .data
                .options
                .iter()
                .enumerate()
                .map(|(i, label)| resolve_option(node, i, label, outgoing, addresses))
                .collect(),
        },

        NodeKind::List => {
            // Handle indices run flat across all sections, matching how the
            // editor numbers a list node's option handles.
            let mut index = 0;
            let items = node
                .data
                .items
                .iter()
                .map(|item| ListSection {
                    title: item.title.clone(),
                    options: item
                        .options
                        .iter()
                        .map(|label| {
                            let option =
                                resolve_option(node, index, label, outgoing, addresses);
                            index += 1;
                            option
                        })
                        .collect(),
                })
                .collect();

            MessageContent::List {
                title: node.data.title.clone().unwrap_or_default(),
                body: node.data.body.clone().unwrap_or_default(),
                global_buttons: vec![TextButton::new("Select an Option")],
                items,
            }
        }

        NodeKind::Buttons => MessageContent::QuickReply {
            content: TextBlock::new(node.data.text.clone().unwrap_or_default()),
            options: node
                .data
                .buttons
                .iter()
                .enumerate()
                .map(|(i, label)| resolve_option(node, i, label, outgoing, addresses))
                .collect(),
        },

        NodeKind::Start | NodeKind::Unknown => MessageContent::Unknown,
    }
}
