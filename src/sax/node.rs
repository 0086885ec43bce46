//! Arena-backed node tree produced by the parser.
//!
//! Parent and child links are `NodeId` indices into the owning arena rather
//! than shared references, so the tree has no ownership cycles.

/// Index of a node within an [`XmlDocument`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// One attribute occurrence, with the exact byte ranges of its name token
/// and quoted value content.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    /// Offset of the first character of the attribute name.
    pub start: usize,
    /// Offset just past the last character of the attribute name.
    pub name_end: usize,
    /// Offset of the first character inside the quotes, if a value exists.
    pub value_start: Option<usize>,
    /// Offset just past the last character inside the quotes.
    pub value_end: Option<usize>,
    /// Offset just past the attribute (past the closing quote when closed).
    pub end: usize,
    /// Whether the quoted value was terminated before the tag or input ended.
    pub closed: bool,
}

impl Attribute {
    /// Offset of the opening quote character, if the value is quoted.
    pub fn quote_offset(&self) -> Option<usize> {
        self.value_start.map(|s| s - 1)
    }
}

/// Kind of an accumulated content fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Text,
    CData,
}

/// A ranged run of character content inside an element. A node may mix
/// CDATA and literal text, so the original segmentation is preserved.
#[derive(Debug, Clone)]
pub struct TextFragment {
    pub kind: TextKind,
    /// Range of the fragment content (for CDATA, the content between the
    /// `<![CDATA[` and `]]>` markers).
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// A parse problem attached to the document; never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub start: usize,
    pub end: usize,
    pub message: String,
}

/// A comment or processing instruction recorded at the document level.
#[derive(Debug, Clone)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// One element in the tree.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// Raw tag name as written, e.g. `e:Button`.
    pub name: String,
    pub prefix: String,
    pub local_name: String,
    /// Namespace URI the prefix resolved to; empty when undeclared.
    pub namespace: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// Offset of the `<` opening this tag.
    pub start: usize,
    /// Offset of the first character of the tag name token.
    pub name_start: usize,
    /// Offset just past the tag name token.
    pub name_end: usize,
    /// Offset just past the `>` that closes the open tag; the document end
    /// when the tag was never closed.
    pub start_tag_end: usize,
    /// Offset of the `<` of the matching `</...>`, if any. For self-closing
    /// tags this equals `start_tag_end`.
    pub end_tag_start: Option<usize>,
    /// Offset just past the node, including its closing tag.
    pub end: usize,
    pub self_closing: bool,
    /// Whether the open tag was terminated by `>`; false when the input or
    /// a stray `<` cut it short.
    pub start_tag_closed: bool,
    /// Concatenation of all text/CDATA content.
    pub text: String,
    pub text_fragments: Vec<TextFragment>,
    /// Name-token range of the closing tag (`</name>`), if present.
    pub close_name_start: Option<usize>,
    pub close_name_end: Option<usize>,
}

impl NodeData {
    /// True when no closing construct terminated this element, so its end
    /// offset is provisional (end of input or the next construct's start).
    pub fn is_unterminated(&self) -> bool {
        !self.self_closing && self.end_tag_start.is_none()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// The parse result: node arena, root list and document-level records.
#[derive(Debug, Default)]
pub struct XmlDocument {
    nodes: Vec<NodeData>,
    pub roots: Vec<NodeId>,
    pub errors: Vec<ParseError>,
    pub comments: Vec<Span>,
    pub processing_instructions: Vec<Span>,
}

impl XmlDocument {
    /// The effective root: the first top-level node, if any parsed.
    pub fn root(&self) -> Option<NodeId> {
        self.roots.first().copied()
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    pub(crate) fn push_node(&mut self, node: NodeData) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Walk up from `id`, yielding the tag names from the root down to the
    /// parent of `id` (document order).
    pub fn ancestor_names(&self, id: NodeId) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(pid) = current {
            names.push(self.node(pid).name.clone());
            current = self.node(pid).parent;
        }
        names.reverse();
        names
    }

    /// Find the deepest node under the effective root whose range contains
    /// `offset`. Later top-level roots are kept for diagnostics only. Among
    /// sibling children the later match wins, so an offset on the boundary
    /// between two constructs resolves to the one that starts there.
    pub fn node_at(&self, offset: usize) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        let mut current: Option<NodeId> =
            self.root().filter(|id| self.contains(*id, offset));
        while let Some(id) = current {
            best = Some(id);
            current = self
                .node(id)
                .children
                .iter()
                .copied()
                .filter(|c| self.contains(*c, offset))
                .last();
        }
        best
    }

    fn contains(&self, id: NodeId, offset: usize) -> bool {
        let node = self.node(id);
        if offset < node.start {
            return false;
        }
        // An unterminated element's end offset is provisional; the cursor
        // sitting exactly there is still inside it.
        offset < node.end || (offset == node.end && node.is_unterminated())
    }
}
