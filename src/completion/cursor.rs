//! Cursor context classification.
//!
//! Given the parsed tree and a byte offset, report which syntactic position
//! the cursor occupies, the enclosing tag, the attribute name/value when
//! applicable, and the exact replacement range for the token being typed.
//!
//! Boundary rule: an offset exactly between two adjacent constructs belongs
//! to the construct that *starts* there. The offset immediately before an
//! attribute value's opening quote is its own position
//! (`AttributeValueLeftQuote`) so candidates can supply the quote.

use crate::sax::node::{NodeData, NodeId, TextKind, XmlDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPos {
    /// Before any content, after the last root, or inside a self-closing
    /// terminator; nothing completable here.
    Undefined,
    ProcessingInstruction,
    /// Inside a tag's name token.
    NodeStart,
    /// Inside a closing tag's name token, after `</`.
    NodeEnd,
    /// Inside an attribute key token (including `name.state` forms).
    AttributeName,
    /// Inside an attribute's quoted value.
    AttributeValue,
    /// Immediately before the value's opening quote.
    AttributeValueLeftQuote,
    Comment,
    CData,
    Text,
}

#[derive(Debug, Clone)]
pub struct CursorInfo {
    pub pos: CursorPos,
    pub tag: Option<NodeId>,
    pub attribute: Option<String>,
    pub attribute_value: Option<String>,
    /// Byte range of the token a completion should replace; absent when no
    /// active token exists at the cursor.
    pub edit_range: Option<(usize, usize)>,
}

impl CursorInfo {
    fn undefined() -> Self {
        Self {
            pos: CursorPos::Undefined,
            tag: None,
            attribute: None,
            attribute_value: None,
            edit_range: None,
        }
    }

    fn at(pos: CursorPos, tag: Option<NodeId>) -> Self {
        Self {
            pos,
            tag,
            attribute: None,
            attribute_value: None,
            edit_range: None,
        }
    }
}

/// Classify `offset` within the parsed document.
pub fn check_cursor_pos(doc: &XmlDocument, offset: usize) -> CursorInfo {
    // Comments and processing instructions are recorded at the document
    // level and may appear anywhere, including before the root.
    for comment in &doc.comments {
        if comment.start <= offset && offset < comment.end {
            return CursorInfo::at(CursorPos::Comment, None);
        }
    }
    for pi in &doc.processing_instructions {
        if pi.start <= offset && offset < pi.end {
            return CursorInfo::at(CursorPos::ProcessingInstruction, None);
        }
    }

    let Some(id) = doc.node_at(offset) else {
        return CursorInfo::undefined();
    };
    let node = doc.node(id);

    // A tag whose `>` never arrived keeps its open-tag region up to and
    // including the provisional end, so typing at end of input classifies.
    if offset < node.start_tag_end || (offset == node.start_tag_end && !node.start_tag_closed) {
        return classify_open_tag(node, id, offset);
    }
    if let Some(end_tag_start) = node.end_tag_start {
        if offset >= end_tag_start {
            return classify_close_tag(node, id, offset, end_tag_start);
        }
    }
    classify_content(node, id, offset)
}

fn classify_open_tag(node: &NodeData, id: NodeId, offset: usize) -> CursorInfo {
    // The name token; `offset == start` sits on the `<` that starts the tag.
    if offset <= node.name_end {
        return CursorInfo {
            pos: CursorPos::NodeStart,
            tag: Some(id),
            attribute: None,
            attribute_value: None,
            edit_range: Some((node.name_start, node.name_end)),
        };
    }

    if node.self_closing && offset + 2 > node.start_tag_end {
        // Inside the `/>` terminator; no identifier lives here.
        return CursorInfo::undefined();
    }

    for attr in &node.attributes {
        if let (Some(value_start), Some(value_end)) = (attr.value_start, attr.value_end) {
            if offset + 1 == value_start {
                return CursorInfo {
                    pos: CursorPos::AttributeValueLeftQuote,
                    tag: Some(id),
                    attribute: Some(attr.name.clone()),
                    attribute_value: Some(attr.value.clone()),
                    edit_range: Some((value_start - 1, attr.end)),
                };
            }
            if value_start <= offset && offset <= value_end {
                return CursorInfo {
                    pos: CursorPos::AttributeValue,
                    tag: Some(id),
                    attribute: Some(attr.name.clone()),
                    attribute_value: Some(attr.value.clone()),
                    edit_range: Some((value_start, attr.end)),
                };
            }
        }
        if attr.start <= offset && offset <= attr.name_end {
            return CursorInfo {
                pos: CursorPos::AttributeName,
                tag: Some(id),
                attribute: Some(attr.name.clone()),
                attribute_value: Some(attr.value.clone()),
                edit_range: Some((attr.start, attr.end)),
            };
        }
    }

    // Whitespace between attributes: attribute-name position with no active
    // token.
    CursorInfo::at(CursorPos::AttributeName, Some(id))
}

fn classify_close_tag(
    node: &NodeData,
    id: NodeId,
    offset: usize,
    end_tag_start: usize,
) -> CursorInfo {
    let name_end = node.close_name_end.unwrap_or(end_tag_start + 1);
    if offset <= name_end {
        return CursorInfo {
            pos: CursorPos::NodeEnd,
            tag: Some(id),
            attribute: None,
            attribute_value: None,
            edit_range: Some((end_tag_start + 1, name_end)),
        };
    }
    // Past the name token, on or after the closing `>`.
    CursorInfo::undefined()
}

fn classify_content(node: &NodeData, id: NodeId, offset: usize) -> CursorInfo {
    for fragment in &node.text_fragments {
        if fragment.kind == TextKind::CData && fragment.start <= offset && offset <= fragment.end {
            return CursorInfo::at(CursorPos::CData, Some(id));
        }
    }
    CursorInfo::at(CursorPos::Text, Some(id))
}
