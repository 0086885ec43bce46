//! Tree construction over the tokenizer's event stream.
//!
//! Open tags push a node, matching close tags pop it. Namespace prefixes
//! resolve against a scope stack fed by `xmlns`/`xmlns:p` attributes, so a
//! tag may use a prefix it declares itself. Everything salvageable from
//! malformed input stays in the tree; problems are recorded as ranged
//! errors on the document.

use super::node::{NodeData, NodeId, ParseError, Span, TextFragment, TextKind, XmlDocument};
use super::tokenizer::{self, Event};

struct OpenEntry {
    id: NodeId,
    /// Number of namespace-scope entries this node contributed.
    ns_count: usize,
}

struct TreeBuilder {
    doc: XmlDocument,
    stack: Vec<OpenEntry>,
    /// Flat prefix scope stack; lookups search from the top.
    scopes: Vec<(String, String)>,
    pending: Option<NodeData>,
}

/// Parse `text` into a document tree. Never fails: malformed input yields a
/// partial tree plus errors.
pub fn parse(text: &str) -> XmlDocument {
    let mut builder = TreeBuilder {
        doc: XmlDocument::default(),
        stack: Vec::new(),
        scopes: Vec::new(),
        pending: None,
    };
    tokenizer::scan(text, &mut |event| builder.handle(event, text.len()));
    builder.finish(text.len())
}

impl TreeBuilder {
    fn handle(&mut self, event: Event, text_len: usize) {
        match event {
            Event::OpenTagStart {
                start,
                name_start,
                name_end,
                name,
            } => {
                self.pending = Some(NodeData {
                    name,
                    prefix: String::new(),
                    local_name: String::new(),
                    namespace: String::new(),
                    attributes: Vec::new(),
                    children: Vec::new(),
                    parent: None,
                    start,
                    name_start,
                    name_end,
                    start_tag_end: text_len,
                    end_tag_start: None,
                    end: text_len,
                    self_closing: false,
                    start_tag_closed: false,
                    text: String::new(),
                    text_fragments: Vec::new(),
                    close_name_start: None,
                    close_name_end: None,
                });
            }
            Event::Attribute(attr) => {
                if let Some(pending) = self.pending.as_mut() {
                    if pending.attributes.iter().any(|a| a.name == attr.name) {
                        self.doc.errors.push(ParseError {
                            start: attr.start,
                            end: attr.name_end,
                            message: format!("duplicate attribute '{}'", attr.name),
                        });
                    }
                    pending.attributes.push(attr);
                }
            }
            Event::OpenTagEnd {
                end,
                self_closing,
                closed,
            } => self.finish_open_tag(end, self_closing, closed),
            Event::CloseTag {
                start,
                name_start,
                name_end,
                end,
                name,
            } => self.close_tag(start, name_start, name_end, end, &name),
            Event::Text { start, end, text } => self.append_text(TextKind::Text, start, end, text),
            Event::CData { start, end, text } => {
                self.append_text(TextKind::CData, start, end, text)
            }
            Event::Comment { start, end, text } => {
                self.doc.comments.push(Span { start, end, text });
            }
            Event::ProcessingInstruction {
                start, end, name, ..
            } => {
                self.doc.processing_instructions.push(Span {
                    start,
                    end,
                    text: name,
                });
            }
            Event::Error(error) => self.doc.errors.push(error),
        }
    }

    fn finish_open_tag(&mut self, end: usize, self_closing: bool, closed: bool) {
        let Some(mut node) = self.pending.take() else {
            return;
        };
        node.start_tag_end = end;
        node.end = end;
        node.self_closing = self_closing;
        node.start_tag_closed = closed;
        if self_closing {
            node.end_tag_start = Some(end);
        }

        // Declarations come into scope before the node's own prefix resolves.
        let mut ns_count = 0;
        for attr in &node.attributes {
            if attr.name == "xmlns" {
                self.scopes.push((String::new(), attr.value.clone()));
                ns_count += 1;
            } else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
                self.scopes.push((prefix.to_string(), attr.value.clone()));
                ns_count += 1;
            }
        }

        match node.name.find(':') {
            Some(index) => {
                node.prefix = node.name[..index].to_string();
                node.local_name = node.name[index + 1..].to_string();
            }
            None => {
                node.local_name = node.name.clone();
            }
        }
        node.namespace = self.resolve_prefix(&node.prefix);

        let parent = self.stack.last().map(|entry| entry.id);
        node.parent = parent;
        let id = self.doc.push_node(node);
        match parent {
            Some(pid) => self.doc.node_mut(pid).children.push(id),
            None => self.doc.roots.push(id),
        }

        if closed && !self_closing {
            self.stack.push(OpenEntry { id, ns_count });
        } else {
            self.scopes.truncate(self.scopes.len() - ns_count);
        }
    }

    fn resolve_prefix(&self, prefix: &str) -> String {
        self.scopes
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.clone())
            .unwrap_or_default()
    }

    fn close_tag(
        &mut self,
        start: usize,
        name_start: usize,
        name_end: usize,
        end: usize,
        name: &str,
    ) {
        let matching = self
            .stack
            .iter()
            .rposition(|entry| self.doc.node(entry.id).name == name);
        let Some(index) = matching else {
            self.doc.errors.push(ParseError {
                start,
                end,
                message: format!("unexpected closing tag '</{}>'", name),
            });
            return;
        };
        // Anything above the match was left unclosed; end it at this tag.
        while self.stack.len() > index + 1 {
            let entry = self.stack.pop().expect("stack entry above match");
            self.scopes.truncate(self.scopes.len() - entry.ns_count);
            let node = self.doc.node_mut(entry.id);
            node.end = start;
            let range = (node.start, node.name_end);
            let tag = node.name.clone();
            self.doc.errors.push(ParseError {
                start: range.0,
                end: range.1,
                message: format!("unclosed tag '<{}>'", tag),
            });
        }
        let entry = self.stack.pop().expect("matching stack entry");
        self.scopes.truncate(self.scopes.len() - entry.ns_count);
        let node = self.doc.node_mut(entry.id);
        node.end_tag_start = Some(start);
        node.close_name_start = Some(name_start);
        node.close_name_end = Some(name_end);
        node.end = end;
    }

    fn append_text(&mut self, kind: TextKind, start: usize, end: usize, text: String) {
        let Some(entry) = self.stack.last() else {
            return;
        };
        let node = self.doc.node_mut(entry.id);
        node.text.push_str(&text);
        node.text_fragments.push(TextFragment {
            kind,
            start,
            end,
            text,
        });
    }

    fn finish(mut self, text_len: usize) -> XmlDocument {
        // Tags still open at end of input keep whatever subtree completed.
        while let Some(entry) = self.stack.pop() {
            let node = self.doc.node_mut(entry.id);
            node.end = text_len;
            let range = (node.start, node.name_end);
            let tag = node.name.clone();
            self.doc.errors.push(ParseError {
                start: range.0,
                end: range.1,
                message: format!("unclosed tag '<{}>'", tag),
            });
        }
        self.doc
    }
}
