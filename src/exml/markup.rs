//! Index of the project's markup files.
//!
//! Every `.exml` file declares a type: its name comes from the root tag's
//! `class` attribute (EUI) or from the file's project-relative path (GUI),
//! and it extends the type the root tag resolves to. Files whose root
//! resolves to the dialect's skin class populate the skin-name table.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tracing::warn;

use super::dialect::Dialect;
use super::facts::{ClassFacts, FactMap};
use super::resolver::NamespaceResolver;
use crate::sax;

#[derive(Debug, Clone)]
struct MarkupClassData {
    class_name: String,
    base_name: Option<String>,
    short_url: String,
    is_skin: bool,
}

#[derive(Debug, Default)]
pub struct MarkupIndex {
    project_path: PathBuf,
    dialect: Option<Dialect>,
    path_to_class: FxHashMap<PathBuf, MarkupClassData>,
    skin_name_to_path: FxHashMap<String, PathBuf>,
}

impl MarkupIndex {
    pub fn new(project_path: PathBuf, dialect: Dialect) -> Self {
        Self {
            project_path,
            dialect: Some(dialect),
            path_to_class: FxHashMap::default(),
            skin_name_to_path: FxHashMap::default(),
        }
    }

    fn src_path(&self) -> PathBuf {
        self.project_path.join("src")
    }

    /// Apply one batch of markup-file changes and rebuild the derived
    /// tables.
    pub fn file_changed(
        &mut self,
        resolver: &NamespaceResolver,
        added: &[PathBuf],
        modified: &[PathBuf],
        deleted: &[PathBuf],
    ) {
        for path in deleted {
            self.path_to_class.remove(path);
        }
        for path in added.iter().chain(modified) {
            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable markup file");
                    self.path_to_class.remove(path);
                    continue;
                }
            };
            let doc = sax::parse(&content);
            let base_name = resolver.root_class_name(&doc);
            let class_name = self.declared_class_name(path, &doc);
            let short_url = self.relative_url(path);
            let is_skin = base_name
                .as_deref()
                .zip(self.dialect)
                .map(|(base, dialect)| dialect.is_skin_root(base))
                .unwrap_or(false);
            self.path_to_class.insert(
                path.clone(),
                MarkupClassData {
                    class_name,
                    base_name,
                    short_url,
                    is_skin,
                },
            );
        }
        self.skin_name_to_path = self
            .path_to_class
            .iter()
            .map(|(path, data)| {
                let key = if data.class_name.is_empty() {
                    data.short_url.clone()
                } else {
                    data.class_name.clone()
                };
                (key, path.clone())
            })
            .collect();
    }

    fn declared_class_name(&self, path: &Path, doc: &sax::XmlDocument) -> String {
        match self.dialect {
            Some(Dialect::Eui) => doc
                .root()
                .and_then(|root| doc.node(root).attribute("class"))
                .unwrap_or_default()
                .to_string(),
            Some(Dialect::Gui) => {
                let src = self.src_path();
                match path.strip_prefix(&src) {
                    Ok(rest) => {
                        let mut name = rest.to_string_lossy().replace(['/', '\\'], ".");
                        if let Some(stripped) = name.strip_suffix(".exml") {
                            name = stripped.to_string();
                        }
                        name
                    }
                    Err(_) => String::new(),
                }
            }
            None => String::new(),
        }
    }

    fn relative_url(&self, path: &Path) -> String {
        path.strip_prefix(&self.project_path)
            .map(|rest| rest.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default()
    }

    /// Markup-derived class facts: each named markup type extends its
    /// resolved root class.
    pub fn class_facts(&self) -> FactMap {
        let mut map = FactMap::default();
        for data in self.path_to_class.values() {
            if data.class_name.is_empty() {
                continue;
            }
            map.insert(
                data.class_name.clone(),
                ClassFacts {
                    base_names: data.base_name.iter().cloned().collect(),
                    ..Default::default()
                },
            );
        }
        map
    }

    /// All known skin type names, sorted; path-keyed entries are excluded.
    pub fn skin_class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .skin_name_to_path
            .iter()
            .filter(|(name, path)| {
                let is_path_key = name.to_lowercase().ends_with(".exml");
                let is_skin = self
                    .path_to_class
                    .get(*path)
                    .map(|d| d.is_skin)
                    .unwrap_or(false);
                !is_path_key && is_skin
            })
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn markup_path(&self, class_name: &str) -> Option<&Path> {
        self.skin_name_to_path.get(class_name).map(PathBuf::as_path)
    }

    pub fn tracked_len(&self) -> usize {
        self.path_to_class.len()
    }
}
