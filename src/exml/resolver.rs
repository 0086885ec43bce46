//! Mapping between fully qualified class names and XML namespaces.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::warn;

use super::dialect::Dialect;
use crate::sax::{self, Namespace, QName, XmlDocument};

/// Resolves tag QNames to class names and synthesizes namespace
/// declarations for class names. Engine component ids come from the
/// manifest catalog.
#[derive(Debug)]
pub struct NamespaceResolver {
    dialect: Dialect,
    /// Component id -> fully qualified engine class name.
    id_map: FxHashMap<String, String>,
}

impl NamespaceResolver {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            id_map: FxHashMap::default(),
        }
    }

    /// Load the manifest catalog (an XML file whose root's children carry
    /// `id` and `module` attributes). A missing or malformed manifest leaves
    /// the id map empty.
    pub fn with_manifest(dialect: Dialect, manifest_path: &Path) -> Self {
        let mut resolver = Self::new(dialect);
        let text = match fs::read_to_string(manifest_path) {
            Ok(text) => text,
            Err(_) => return resolver,
        };
        let doc = sax::parse(&text);
        let Some(root) = doc.root() else {
            warn!(path = %manifest_path.display(), "manifest has no root element");
            return resolver;
        };
        for child in &doc.node(root).children {
            let item = doc.node(*child);
            if let (Some(id), Some(module)) = (item.attribute("id"), item.attribute("module")) {
                resolver
                    .id_map
                    .insert(id.to_string(), format!("{}.{}", module, id));
            }
        }
        resolver
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn engine_class_for_id(&self, id: &str) -> Option<&str> {
        self.id_map.get(id).map(String::as_str)
    }

    /// Resolve a tag's local name plus namespace to a fully qualified class
    /// name. Returns `None` for work-namespace tags and for namespaces the
    /// resolver cannot interpret.
    pub fn class_name(&self, id: &str, ns: Option<&Namespace>) -> Option<String> {
        let ui = self.dialect.ui_ns();
        let work = self.dialect.work_ns();
        if let Some(ns) = ns {
            if ns.uri() == ui.uri() {
                if id == "Object" {
                    return Some(id.to_string());
                }
                if self.dialect.core_classes().contains(&id) {
                    return Some(format!("egret.{}", id));
                }
            }
        }
        if self.dialect.basic_types().contains(&id) {
            return Some(id.to_string());
        }
        match ns {
            Some(ns) if ns.uri() == work.uri() => None,
            Some(ns) if ns.uri().is_empty() => Some(format!("{}{}", self.dialect.ui_prefix(), id)),
            None => Some(format!("{}{}", self.dialect.ui_prefix(), id)),
            Some(ns) if ns.uri() == ui.uri() => {
                Some(format!("{}{}", self.dialect.ui_prefix(), id))
            }
            // Wildcard package URIs: `pkg.*` resolves to `pkg.<id>`, the
            // bare `*` to the default package.
            Some(ns) if ns.uri().ends_with('*') => {
                let package = &ns.uri()[..ns.uri().len() - 1];
                Some(format!("{}{}", package, id))
            }
            Some(_) => None,
        }
    }

    pub fn qname_class_name(&self, qname: &QName) -> Option<String> {
        self.class_name(
            &qname.local_name,
            Some(&Namespace::new("", qname.uri.clone())),
        )
    }

    /// Class name the document's root tag resolves to (the base type of the
    /// type the markup file itself declares).
    pub fn root_class_name(&self, doc: &XmlDocument) -> Option<String> {
        let root = doc.root()?;
        let node = doc.node(root);
        let ns = Namespace::new(node.prefix.clone(), node.namespace.clone());
        self.class_name(&node.local_name, Some(&ns))
    }

    /// The QName under which a class is addressable from markup: engine and
    /// component-library classes live in the UI namespace, everything else
    /// in its wildcard package namespace.
    pub fn qname_for_class(&self, full_name: &str) -> QName {
        let (package, simple) = split_class_name(full_name);
        if self.id_map.get(simple).map(String::as_str) == Some(full_name) {
            return QName::new(self.dialect.ui_ns().uri(), simple);
        }
        if let Some(rest) = full_name.strip_prefix(self.dialect.ui_prefix()) {
            if !rest.contains('.') {
                return QName::new(self.dialect.ui_ns().uri(), rest);
            }
        }
        if package.is_empty() {
            QName::new("*", simple)
        } else {
            QName::new(format!("{}.*", package), simple)
        }
    }

    /// Create (or reuse) a namespace for a fully qualified class name,
    /// synthesizing a fresh prefix that avoids the document's declarations.
    pub fn create_namespace(&self, class_name: &str, declared: &[Namespace]) -> Namespace {
        let class_name = class_name.replace("::", ".");
        let (package, simple) = split_class_name(&class_name);
        if self.id_map.get(simple).map(String::as_str) == Some(class_name.as_str()) {
            return self.dialect.ui_ns().clone();
        }
        let uri = if package.is_empty() {
            "*".to_string()
        } else {
            format!("{}.*", package)
        };
        for ns in declared {
            if ns.uri() == uri {
                return ns.clone();
            }
        }
        let (mut prefix, stem) = if package.is_empty() {
            ("ns1".to_string(), "ns".to_string())
        } else {
            let stem = package
                .rsplit('.')
                .next()
                .unwrap_or(package)
                .to_string();
            (stem.clone(), stem)
        };
        let mut counter = 0;
        while declared.iter().any(|ns| ns.prefix() == prefix) {
            counter += 1;
            prefix = format!("{}{}", stem, counter);
        }
        Namespace::new(prefix, uri)
    }
}

fn split_class_name(full_name: &str) -> (&str, &str) {
    match full_name.rfind('.') {
        Some(index) => (&full_name[..index], &full_name[index + 1..]),
        None => ("", full_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> NamespaceResolver {
        let mut r = NamespaceResolver::new(Dialect::Eui);
        r.id_map
            .insert("Button".to_string(), "eui.Button".to_string());
        r
    }

    #[test]
    fn test_class_name_in_ui_namespace() {
        let r = resolver();
        let ui = Dialect::Eui.ui_ns();
        assert_eq!(
            r.class_name("Button", Some(ui)),
            Some("eui.Button".to_string())
        );
        assert_eq!(
            r.class_name("Point", Some(ui)),
            Some("egret.Point".to_string())
        );
        assert_eq!(r.class_name("Object", Some(ui)), Some("Object".to_string()));
    }

    #[test]
    fn test_class_name_wildcard_packages() {
        let r = resolver();
        let pkg = Namespace::new("g", "com.game.*");
        assert_eq!(
            r.class_name("Panel", Some(&pkg)),
            Some("com.game.Panel".to_string())
        );
        let default_pkg = Namespace::new("d", "*");
        assert_eq!(
            r.class_name("Main", Some(&default_pkg)),
            Some("Main".to_string())
        );
    }

    #[test]
    fn test_work_namespace_has_no_class() {
        let r = resolver();
        assert_eq!(r.class_name("Config", Some(Dialect::Eui.work_ns())), None);
    }

    #[test]
    fn test_root_class_name() {
        let r = resolver();
        let doc = sax::parse(r#"<e:Skin xmlns:e="http://ns.egret.com/eui"/>"#);
        assert_eq!(r.root_class_name(&doc), Some("eui.Skin".to_string()));
    }

    #[test]
    fn test_create_namespace_reuses_declared_uri() {
        let r = resolver();
        let declared = vec![Namespace::new("game", "com.game.*")];
        let ns = r.create_namespace("com.game.Panel", &declared);
        assert_eq!(ns, declared[0]);
    }

    #[test]
    fn test_create_namespace_synthesizes_prefix() {
        let r = resolver();
        let ns = r.create_namespace("com.game.Panel", &[]);
        assert_eq!(ns.prefix(), "game");
        assert_eq!(ns.uri(), "com.game.*");
    }

    #[test]
    fn test_create_namespace_disambiguates_prefix() {
        let r = resolver();
        let declared = vec![
            Namespace::new("game", "other.*"),
            Namespace::new("game1", "another.*"),
        ];
        let ns = r.create_namespace("com.game.Panel", &declared);
        assert_eq!(ns.prefix(), "game2");
    }

    #[test]
    fn test_create_namespace_default_package() {
        let r = resolver();
        let ns = r.create_namespace("Main", &[]);
        assert_eq!(ns.prefix(), "ns1");
        assert_eq!(ns.uri(), "*");
    }

    #[test]
    fn test_create_namespace_engine_id_returns_ui_ns() {
        let r = resolver();
        let ns = r.create_namespace("eui.Button", &[]);
        assert_eq!(ns, *Dialect::Eui.ui_ns());
    }

    #[test]
    fn test_qname_for_class() {
        let r = resolver();
        assert_eq!(
            r.qname_for_class("eui.Button"),
            QName::new("http://ns.egret.com/eui", "Button")
        );
        assert_eq!(
            r.qname_for_class("com.game.Panel"),
            QName::new("com.game.*", "Panel")
        );
        assert_eq!(r.qname_for_class("Main"), QName::new("*", "Main"));
    }
}
