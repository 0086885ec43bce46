//! The completion-candidate generator.
//!
//! Dispatches on the cursor classifier and assembles `CompletionItem`s from
//! the schema queries, the skin/state/image/style indices and the
//! namespace resolver. Candidates whose namespace is not yet declared in
//! the document carry an `exml.insertNamespace` follow-up command instead
//! of a multi-range edit, so the primary edit stays a single token replace.

use serde_json::json;
use tower_lsp::lsp_types::{
    Command, CompletionItem, CompletionItemKind, CompletionTextEdit, Range, TextEdit,
};

use crate::document::Document;
use crate::exml::facts::FactScanner;
use crate::exml::index::ProjectIndex;
use crate::exml::project::ProjectModel;
use crate::exml::properties::PropertyCatalog;
use crate::exml::resolver::NamespaceResolver;
use crate::exml::tracker::{ChangeBatch, ChangeKind};
use crate::sax::{self, Namespace, QName, XmlDocument};

use super::cursor::{check_cursor_pos, CursorPos};
use super::images::ImageResourceIndex;
use super::schema::SchemaModel;
use super::states::document_states;
use super::styles::ThemeStyleIndex;

/// Command identifiers the client executes after accepting a candidate.
pub const INSERT_NAMESPACE_COMMAND: &str = "exml.insertNamespace";
pub const CURSOR_BACK_COMMAND: &str = "exml.cursorBack";

/// One `xmlns` declaration found in the raw text, with the offset just past
/// its closing quote (the anchor for inserting further declarations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    pub ns: Namespace,
    pub end: usize,
}

pub struct ContentAssistProcessor {
    project: ProjectModel,
    index: ProjectIndex,
    images: ImageResourceIndex,
    styles: ThemeStyleIndex,
}

impl std::fmt::Debug for ContentAssistProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentAssistProcessor")
            .field("root", &self.project.root())
            .field("index", &self.index)
            .finish()
    }
}

impl ContentAssistProcessor {
    /// Build the processor for a project, scanning the workspace once.
    /// `None` when the workspace does not select a known dialect.
    pub fn new(project: ProjectModel, scanner: Box<dyn FactScanner>) -> Option<Self> {
        let dialect = project.dialect()?;
        let resolver = NamespaceResolver::with_manifest(dialect, &project.manifest_path());
        let catalog = PropertyCatalog::load(&project.properties_path());
        let mut index = ProjectIndex::new(
            project.root().to_path_buf(),
            dialect,
            resolver,
            catalog,
            scanner,
        );
        index.scan_workspace();
        let mut images = ImageResourceIndex::default();
        images.init(&project.resources_path());
        let styles = ThemeStyleIndex::load(&project.theme_path());
        Some(Self {
            project,
            index,
            images,
            styles,
        })
    }

    pub fn index(&self) -> &ProjectIndex {
        &self.index
    }

    /// Fold a drained file-change batch into every derived index.
    pub fn file_changed(&mut self, batch: &ChangeBatch) {
        if batch.paths().any(|p| self.project.needs_refresh(p)) {
            self.refresh();
            return;
        }
        let theme_path = self.project.theme_path();
        if batch.paths().any(|p| *p == theme_path) {
            self.styles = ThemeStyleIndex::load(&theme_path);
        }
        for path in &batch.added {
            self.images.file_changed(path, ChangeKind::Added);
        }
        for path in &batch.modified {
            self.images.file_changed(path, ChangeKind::Modified);
        }
        for path in &batch.deleted {
            self.images.file_changed(path, ChangeKind::Deleted);
        }
        self.index.apply_batch(batch);
    }

    /// Re-read the project file and rebuild everything derived from it.
    fn refresh(&mut self) {
        if let Some(project) = ProjectModel::load(self.project.root()) {
            self.project = project;
        }
        if let Some(dialect) = self.project.dialect() {
            let resolver =
                NamespaceResolver::with_manifest(dialect, &self.project.manifest_path());
            let catalog = PropertyCatalog::load(&self.project.properties_path());
            self.index.reconfigure(resolver, catalog);
        }
        self.images.init(&self.project.resources_path());
        self.styles = ThemeStyleIndex::load(&self.project.theme_path());
    }

    /// Compute the candidate list for a cursor offset.
    pub fn compute_completion(
        &self,
        document: &mut Document,
        offset: usize,
    ) -> Vec<CompletionItem> {
        let text = document.text().to_string();
        let offset = offset.min(text.len());
        let xml = sax::parse(&text);
        let info = check_cursor_pos(&xml, offset);

        let tag_name = info
            .tag
            .map(|id| xml.node(id).name.clone())
            .unwrap_or_default();
        let attribute = info.attribute.clone().unwrap_or_default();
        let attribute_value = info.attribute_value.clone().unwrap_or_default();
        let range = info.edit_range.map(|(start, end)| {
            Range::new(document.position_at(start), document.position_at(end))
        });

        match info.pos {
            CursorPos::NodeStart => {
                let tag_path = info
                    .tag
                    .map(|id| xml.ancestor_names(id))
                    .unwrap_or_default();
                self.node_start_completions(&tag_path, &text, range)
            }
            CursorPos::NodeEnd => node_end_completions(&tag_name, range),
            CursorPos::AttributeName => match attribute.find('.') {
                Some(_) => state_completions(&xml),
                None => self.attribute_completions(&tag_name, &text, range, &attribute_value),
            },
            CursorPos::AttributeValue | CursorPos::AttributeValueLeftQuote => {
                let left_quote = info.pos == CursorPos::AttributeValueLeftQuote;
                self.attribute_value_completions(&tag_name, &attribute, &xml, &text, range, left_quote)
            }
            _ => Vec::new(),
        }
    }

    fn node_start_completions(
        &self,
        tag_path: &[String],
        text: &str,
        range: Option<Range>,
    ) -> Vec<CompletionItem> {
        let decls = document_namespaces(text);
        let ns_list: Vec<Namespace> = decls.iter().map(|d| d.ns.clone()).collect();
        let resolver = self.index.resolver();
        let dialect = resolver.dialect();
        let path_qnames: Vec<QName> = tag_path
            .iter()
            .filter_map(|name| qname_with_node(name, &decls))
            .collect();
        let schema = SchemaModel::new(self.index.graph(), resolver);
        let elements = schema.possible_elements(&path_qnames);

        let mut completions = Vec::new();
        for element in elements {
            let uri = element.qname.uri.as_str();
            let local = element.qname.local_name.as_str();
            let declared_prefix = decls
                .iter()
                .find(|d| d.ns.uri() == uri)
                .map(|d| d.ns.prefix().to_string());

            let mut label = match &declared_prefix {
                Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
                _ => local.to_string(),
            };
            let mut detail = uri.replace(".*", "").replace('*', "default package");
            let mut kind = CompletionItemKind::CLASS;
            if let Some(owner) = &element.owner {
                detail = owner.clone();
                kind = CompletionItemKind::PROPERTY;
                if let Some(type_name) = &element.type_name {
                    label = format!("{} : {}", label, type_name);
                }
            }

            let mut insert_text = match &declared_prefix {
                Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
                _ => local.to_string(),
            };
            let mut command = None;
            if uri != dialect.ui_ns().uri() && uri != dialect.work_ns().uri() {
                if let Some(class_name) = &element.class_name {
                    let ns = resolver.create_namespace(class_name, &ns_list);
                    insert_text = format!("{}:{}", ns.prefix(), local);
                    let already_declared = decls.iter().any(|d| d.ns.uri() == ns.uri());
                    if !already_declared {
                        if let Some((at, xmlns_text)) = add_namespace(text, ns.prefix(), ns.uri())
                        {
                            command = Some(Command {
                                title: "add namespace".to_string(),
                                command: INSERT_NAMESPACE_COMMAND.to_string(),
                                arguments: Some(vec![json!({
                                    "offset": at,
                                    "text": xmlns_text,
                                })]),
                            });
                        }
                    }
                }
            }

            completions.push(CompletionItem {
                label,
                detail: Some(detail),
                kind: Some(kind),
                insert_text: Some(insert_text.clone()),
                text_edit: range.map(|range| {
                    CompletionTextEdit::Edit(TextEdit::new(range, insert_text))
                }),
                command,
                ..Default::default()
            });
        }
        completions
    }

    fn attribute_completions(
        &self,
        tag_name: &str,
        text: &str,
        range: Option<Range>,
        value: &str,
    ) -> Vec<CompletionItem> {
        let decls = document_namespaces(text);
        let Some(qname) = qname_with_node(tag_name, &decls) else {
            return Vec::new();
        };
        let schema = SchemaModel::new(self.index.graph(), self.index.resolver());
        schema
            .possible_attributes(&qname)
            .into_iter()
            .map(|attr| {
                let insert_text = format!("{}=\"{}\"", attr.name, value);
                CompletionItem {
                    label: attr.name,
                    detail: Some(attr.owner),
                    kind: Some(CompletionItemKind::PROPERTY),
                    insert_text: Some(insert_text.clone()),
                    text_edit: range.map(|range| {
                        CompletionTextEdit::Edit(TextEdit::new(range, insert_text))
                    }),
                    command: Some(Command {
                        title: "move cursor back".to_string(),
                        command: CURSOR_BACK_COMMAND.to_string(),
                        arguments: None,
                    }),
                    ..Default::default()
                }
            })
            .collect()
    }

    fn attribute_value_completions(
        &self,
        tag_name: &str,
        attribute: &str,
        xml: &XmlDocument,
        text: &str,
        range: Option<Range>,
        left_quote: bool,
    ) -> Vec<CompletionItem> {
        if attribute.starts_with("source") && tag_name.contains(":Image") {
            return self
                .images
                .keys()
                .map(|key| plain_value_item(key, ""))
                .collect();
        }
        if attribute.starts_with("style") && tag_name.contains(":Label") {
            return self
                .styles
                .styles()
                .map(|(name, detail)| plain_value_item(name, detail))
                .collect();
        }
        if attribute.starts_with("skinName") {
            return self
                .index
                .skin_class_names()
                .iter()
                .map(|name| plain_value_item(name, ""))
                .collect();
        }

        let values = if attribute == "includeIn" || attribute == "excludeFrom" {
            document_states(xml)
        } else {
            let decls = document_namespaces(text);
            match qname_with_node(tag_name, &decls) {
                Some(qname) => {
                    let schema = SchemaModel::new(self.index.graph(), self.index.resolver());
                    schema.possible_attribute_values(&qname, attribute)
                }
                None => Vec::new(),
            }
        };
        values
            .into_iter()
            .map(|value| {
                let open = if left_quote { "\"" } else { "" };
                let insert_text = format!("{}{}\"", open, value);
                CompletionItem {
                    label: value,
                    kind: Some(CompletionItemKind::VALUE),
                    insert_text: Some(insert_text.clone()),
                    text_edit: range.map(|range| {
                        CompletionTextEdit::Edit(TextEdit::new(range, insert_text))
                    }),
                    ..Default::default()
                }
            })
            .collect()
    }
}

fn node_end_completions(tag_name: &str, range: Option<Range>) -> Vec<CompletionItem> {
    let insert_text = format!("/{}", tag_name);
    vec![CompletionItem {
        label: insert_text.clone(),
        kind: Some(CompletionItemKind::PROPERTY),
        sort_text: Some("!".to_string()),
        insert_text: Some(insert_text.clone()),
        text_edit: range.map(|range| CompletionTextEdit::Edit(TextEdit::new(range, insert_text))),
        ..Default::default()
    }]
}

fn state_completions(xml: &XmlDocument) -> Vec<CompletionItem> {
    document_states(xml)
        .into_iter()
        .map(|state| CompletionItem {
            label: state.clone(),
            kind: Some(CompletionItemKind::PROPERTY),
            insert_text: Some(state),
            ..Default::default()
        })
        .collect()
}

fn plain_value_item(label: &str, detail: &str) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        detail: (!detail.is_empty()).then(|| detail.to_string()),
        kind: Some(CompletionItemKind::VALUE),
        insert_text: Some(label.to_string()),
        ..Default::default()
    }
}

/// Resolve a raw tag name (`prefix:Local` or bare `Local`) against the
/// document's namespace declarations.
pub fn qname_with_node(tag_name: &str, decls: &[NamespaceDecl]) -> Option<QName> {
    let (prefix, local) = match tag_name.find(':') {
        Some(index) => (&tag_name[..index], &tag_name[index + 1..]),
        None => ("", tag_name),
    };
    let ns = decls.iter().find(|d| d.ns.prefix() == prefix)?;
    Some(QName::new(ns.ns.uri(), local))
}

/// Collect the document's `xmlns` declarations with a raw text scan, which
/// keeps working on markup too broken to produce a root node.
pub fn document_namespaces(text: &str) -> Vec<NamespaceDecl> {
    let bytes = text.as_bytes();
    let mut decls = Vec::new();
    let mut search_from = 0;
    while let Some(found) = text[search_from..].find("xmlns") {
        let start = search_from + found;
        search_from = start + "xmlns".len();
        if start > 0 {
            let prev = bytes[start - 1];
            if !prev.is_ascii_whitespace() && prev != b'<' && prev != b'"' && prev != b'\'' {
                continue;
            }
        }
        let mut pos = start + "xmlns".len();
        let mut prefix = String::new();
        if bytes.get(pos) == Some(&b':') {
            pos += 1;
            let prefix_start = pos;
            while pos < bytes.len() && bytes[pos] != b'=' && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            prefix = text[prefix_start..pos].to_string();
        }
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            continue;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let quote = match bytes.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => continue,
        };
        pos += 1;
        let uri_start = pos;
        while pos < bytes.len() && bytes[pos] != quote {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        decls.push(NamespaceDecl {
            ns: Namespace::new(prefix, text[uri_start..pos].to_string()),
            end: pos + 1,
        });
        search_from = pos + 1;
    }
    decls
}

/// Compute the insertion for a new `xmlns` declaration: just after the last
/// existing declaration. `None` when the declaration already exists or the
/// document has no declarations to anchor on.
pub fn add_namespace(text: &str, prefix: &str, uri: &str) -> Option<(usize, String)> {
    let decls = document_namespaces(text);
    if decls
        .iter()
        .any(|d| d.ns.prefix() == prefix && d.ns.uri() == uri)
    {
        return None;
    }
    let last = decls.last()?;
    Some((last.end, format!(" xmlns:{}=\"{}\"", prefix, uri)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_namespaces_scan() {
        let text = r#"<e:Skin xmlns:e="http://ns.egret.com/eui" xmlns:w='http://ns.egret.com/wing'>"#;
        let decls = document_namespaces(text);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].ns.prefix(), "e");
        assert_eq!(decls[0].ns.uri(), "http://ns.egret.com/eui");
        assert_eq!(&text[decls[0].end - 1..decls[0].end], "\"");
        assert_eq!(decls[1].ns.prefix(), "w");
    }

    #[test]
    fn test_document_namespaces_default_declaration() {
        let decls = document_namespaces(r#"<Skin xmlns="http://ns.egret.com/eui">"#);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].ns.prefix(), "");
    }

    #[test]
    fn test_add_namespace_after_last_declaration() {
        let text = r#"<e:Skin xmlns:e="http://ns.egret.com/eui">"#;
        let (at, inserted) = add_namespace(text, "game", "com.game.*").unwrap();
        assert_eq!(at, text.len() - 1);
        assert_eq!(inserted, " xmlns:game=\"com.game.*\"");
    }

    #[test]
    fn test_add_namespace_skips_existing() {
        let text = r#"<e:Skin xmlns:e="http://ns.egret.com/eui">"#;
        assert!(add_namespace(text, "e", "http://ns.egret.com/eui").is_none());
    }

    #[test]
    fn test_add_namespace_needs_anchor() {
        assert!(add_namespace("<Skin>", "e", "uri").is_none());
    }

    #[test]
    fn test_qname_with_node() {
        let decls = document_namespaces(r#"<a:Widget xmlns:a="pkg.*" xmlns="dflt.*">"#);
        assert_eq!(
            qname_with_node("a:Widget", &decls),
            Some(QName::new("pkg.*", "Widget"))
        );
        assert_eq!(
            qname_with_node("Widget", &decls),
            Some(QName::new("dflt.*", "Widget"))
        );
        assert_eq!(qname_with_node("x:Widget", &decls), None);
    }
}
