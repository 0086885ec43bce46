//! Schema queries: which elements, attributes and values are legal at a
//! given QName.
//!
//! The rules derive from the class graph and the property catalog: every
//! promptable class is an element; a class's own and inherited props are
//! its attributes and its property elements; enumerated props (and
//! booleans) constrain attribute values.

use crate::exml::graph::ClassGraph;
use crate::exml::resolver::NamespaceResolver;
use crate::sax::QName;

/// An element the schema allows at the queried path.
#[derive(Debug, Clone)]
pub struct ElementDecl {
    pub qname: QName,
    /// The class a component element instantiates.
    pub class_name: Option<String>,
    /// Property elements carry their value type and declaring class.
    pub type_name: Option<String>,
    pub owner: Option<String>,
}

/// An attribute the schema allows on the queried QName.
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    pub name: String,
    /// The class that declares the property.
    pub owner: String,
}

/// Borrowing view over the graph and resolver for one request.
pub struct SchemaModel<'a> {
    graph: &'a ClassGraph,
    resolver: &'a NamespaceResolver,
}

impl<'a> SchemaModel<'a> {
    pub fn new(graph: &'a ClassGraph, resolver: &'a NamespaceResolver) -> Self {
        Self { graph, resolver }
    }

    /// Elements allowed under the ancestor path (root-first). The innermost
    /// resolvable path entry contributes its properties as property
    /// elements; every promptable class is a component element.
    pub fn possible_elements(&self, path: &[QName]) -> Vec<ElementDecl> {
        let mut elements = Vec::new();

        if let Some(parent) = path.last() {
            if let Some(class_name) = self.resolver.qname_class_name(parent) {
                for (owner, prop) in self.graph.props(&class_name) {
                    elements.push(ElementDecl {
                        qname: QName::new(parent.uri.clone(), prop.name.clone()),
                        class_name: None,
                        type_name: Some(prop.type_name.clone()),
                        owner: Some(owner.to_string()),
                    });
                }
            }
        }

        for class_name in self.graph.prompt_class_names() {
            elements.push(ElementDecl {
                qname: self.resolver.qname_for_class(class_name),
                class_name: Some(class_name.to_string()),
                type_name: None,
                owner: None,
            });
        }
        elements
    }

    /// Attributes allowed on `qname`: own plus inherited props, closest
    /// declaration first.
    pub fn possible_attributes(&self, qname: &QName) -> Vec<AttributeDecl> {
        let Some(class_name) = self.resolver.qname_class_name(qname) else {
            return Vec::new();
        };
        self.graph
            .props(&class_name)
            .into_iter()
            .map(|(owner, prop)| AttributeDecl {
                name: prop.name.clone(),
                owner: owner.to_string(),
            })
            .collect()
    }

    /// Enumerated legal values for `(qname, attribute)`; empty when the
    /// property is unconstrained or unknown.
    pub fn possible_attribute_values(&self, qname: &QName, attribute: &str) -> Vec<String> {
        let Some(class_name) = self.resolver.qname_class_name(qname) else {
            return Vec::new();
        };
        let props = self.graph.props(&class_name);
        let Some((_, prop)) = props.into_iter().find(|(_, p)| p.name == attribute) else {
            return Vec::new();
        };
        if !prop.available.is_empty() {
            return prop.available.clone();
        }
        if prop.type_name == "boolean" {
            return vec!["true".to_string(), "false".to_string()];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exml::dialect::Dialect;
    use crate::exml::graph::{ClassNode, Prop};
    use rustc_hash::FxHashMap;

    fn fixture() -> (ClassGraph, NamespaceResolver) {
        let mut nodes = FxHashMap::default();
        nodes.insert(
            "eui.Component".to_string(),
            ClassNode {
                full_name: "eui.Component".into(),
                props: vec![Prop {
                    name: "enabled".into(),
                    type_name: "boolean".into(),
                    ..Default::default()
                }],
                in_engine: true,
                in_prompt: true,
                ..Default::default()
            },
        );
        nodes.insert(
            "pkg.Widget".to_string(),
            ClassNode {
                full_name: "pkg.Widget".into(),
                base: Some("eui.Component".into()),
                props: vec![Prop {
                    name: "mode".into(),
                    type_name: "string".into(),
                    available: vec!["compact".into(), "full".into()],
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        (
            ClassGraph::from_nodes(nodes),
            NamespaceResolver::new(Dialect::Eui),
        )
    }

    #[test]
    fn test_possible_elements_components_and_property_elements() {
        let (graph, resolver) = fixture();
        let schema = SchemaModel::new(&graph, &resolver);
        let path = vec![QName::new("pkg.*", "Widget")];
        let elements = schema.possible_elements(&path);

        let widget = elements
            .iter()
            .find(|e| e.class_name.as_deref() == Some("pkg.Widget"))
            .expect("component element");
        assert_eq!(widget.qname, QName::new("pkg.*", "Widget"));

        let mode = elements
            .iter()
            .find(|e| e.qname.local_name == "mode")
            .expect("property element");
        assert_eq!(mode.owner.as_deref(), Some("pkg.Widget"));
        assert_eq!(mode.type_name.as_deref(), Some("string"));
        // Inherited property elements come from the base class.
        assert!(elements
            .iter()
            .any(|e| e.qname.local_name == "enabled" && e.owner.as_deref() == Some("eui.Component")));
    }

    #[test]
    fn test_possible_attributes_inherited() {
        let (graph, resolver) = fixture();
        let schema = SchemaModel::new(&graph, &resolver);
        let attrs = schema.possible_attributes(&QName::new("pkg.*", "Widget"));
        let names: Vec<&str> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["mode", "enabled"]);
        assert_eq!(attrs[1].owner, "eui.Component");
    }

    #[test]
    fn test_possible_attribute_values() {
        let (graph, resolver) = fixture();
        let schema = SchemaModel::new(&graph, &resolver);
        let qname = QName::new("pkg.*", "Widget");
        assert_eq!(
            schema.possible_attribute_values(&qname, "mode"),
            ["compact", "full"]
        );
        assert_eq!(
            schema.possible_attribute_values(&qname, "enabled"),
            ["true", "false"]
        );
        assert!(schema.possible_attribute_values(&qname, "nope").is_empty());
    }

    #[test]
    fn test_unresolvable_qname_degrades_to_empty() {
        let (graph, resolver) = fixture();
        let schema = SchemaModel::new(&graph, &resolver);
        let qname = QName::new("http://unknown", "Thing");
        assert!(schema.possible_attributes(&qname).is_empty());
        assert!(schema.possible_attribute_values(&qname, "x").is_empty());
    }
}
