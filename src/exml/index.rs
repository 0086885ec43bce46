//! The project-wide class index.
//!
//! Tracks the current sets of fact catalogs and markup files, applies
//! drained change batches, and rebuilds the class graph wholesale: engine
//! facts win over project-local redeclarations, markup-derived types extend
//! their resolved root classes, and catalog enumerations attach to props.
//! Readers always see either the previous graph or the next one.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use super::dialect::Dialect;
use super::facts::{ClassFacts, FactMap, FactScanner};
use super::graph::{ClassGraph, ClassNode};
use super::markup::MarkupIndex;
use super::properties::PropertyCatalog;
use super::resolver::NamespaceResolver;
use super::tracker::ChangeBatch;

const IGNORED_DIRS: [&str; 2] = ["bin-debug", "bin-release"];

fn is_ignored(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| IGNORED_DIRS.contains(&s))
            .unwrap_or(false)
    })
}

fn is_fact_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_lowercase().ends_with(".facts.json"))
        .unwrap_or(false)
}

fn is_markup_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("exml"))
        .unwrap_or(false)
}

pub struct ProjectIndex {
    project_path: PathBuf,
    resolver: NamespaceResolver,
    catalog: PropertyCatalog,
    scanner: Box<dyn FactScanner>,
    fact_files: BTreeSet<PathBuf>,
    markup: MarkupIndex,
    graph: ClassGraph,
}

impl std::fmt::Debug for ProjectIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectIndex")
            .field("project_path", &self.project_path)
            .field("fact_files", &self.fact_files.len())
            .field("markup_files", &self.markup.tracked_len())
            .field("classes", &self.graph.len())
            .finish()
    }
}

impl ProjectIndex {
    pub fn new(
        project_path: PathBuf,
        dialect: Dialect,
        resolver: NamespaceResolver,
        catalog: PropertyCatalog,
        scanner: Box<dyn FactScanner>,
    ) -> Self {
        Self {
            markup: MarkupIndex::new(project_path.clone(), dialect),
            project_path,
            resolver,
            catalog,
            scanner,
            fact_files: BTreeSet::new(),
            graph: ClassGraph::default(),
        }
    }

    /// Walk the project tree once and index everything found.
    pub fn scan_workspace(&mut self) {
        let mut batch = ChangeBatch::default();
        for entry in WalkDir::new(&self.project_path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if is_ignored(path) {
                continue;
            }
            if is_fact_file(path) || is_markup_file(path) {
                batch.added.push(path.to_path_buf());
            }
        }
        info!(
            files = batch.added.len(),
            root = %self.project_path.display(),
            "initial workspace scan"
        );
        self.apply_batch(&batch);
    }

    /// Fold a drained change batch into the tracked sets and rebuild the
    /// graph.
    pub fn apply_batch(&mut self, batch: &ChangeBatch) {
        let mut markup_added = Vec::new();
        let mut markup_modified = Vec::new();
        let mut markup_deleted = Vec::new();
        for path in &batch.added {
            if is_ignored(path) {
                continue;
            }
            if is_fact_file(path) {
                self.fact_files.insert(path.clone());
            } else if is_markup_file(path) {
                markup_added.push(path.clone());
            }
        }
        for path in &batch.modified {
            if is_ignored(path) {
                continue;
            }
            if is_fact_file(path) {
                self.fact_files.insert(path.clone());
            } else if is_markup_file(path) {
                markup_modified.push(path.clone());
            }
        }
        for path in &batch.deleted {
            if is_fact_file(path) {
                self.fact_files.remove(path);
            } else if is_markup_file(path) {
                markup_deleted.push(path.clone());
            }
        }
        self.markup
            .file_changed(&self.resolver, &markup_added, &markup_modified, &markup_deleted);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let fact_files: Vec<PathBuf> = self.fact_files.iter().cloned().collect();
        let source_facts = self.scanner.extract_facts(&fact_files);
        let markup_facts = self.markup.class_facts();

        let mut merged: FactMap = FactMap::default();
        for (name, facts) in source_facts.into_iter().chain(markup_facts) {
            if Self::can_replace(&merged, &name, &facts) {
                merged.insert(name, facts);
            }
        }

        let names: BTreeSet<String> = merged.keys().cloned().collect();
        let mut nodes = rustc_hash::FxHashMap::default();
        for (name, facts) in merged {
            // Edges exist only when the target made it into the map.
            let base = facts
                .base_names
                .iter()
                .find(|b| names.contains(*b))
                .cloned();
            let implements = facts
                .implemented_names
                .iter()
                .filter(|i| names.contains(*i))
                .cloned()
                .collect();
            let mut props = facts.props;
            for prop in &mut props {
                if let Some(available) = self.catalog.available_values(&name, &prop.name) {
                    prop.available = available;
                }
            }
            nodes.insert(
                name.clone(),
                ClassNode {
                    full_name: name,
                    base,
                    implements,
                    props,
                    in_engine: facts.in_engine,
                    in_prompt: facts.in_prompt,
                    is_interface: facts.is_interface,
                },
            );
        }
        self.graph = ClassGraph::from_nodes(nodes);
        debug!(classes = self.graph.len(), "class graph rebuilt");
    }

    /// An engine declaration is never displaced by a project-local one.
    fn can_replace(merged: &FactMap, name: &str, incoming: &ClassFacts) -> bool {
        if incoming.in_engine {
            return true;
        }
        match merged.get(name) {
            Some(existing) => !existing.in_engine,
            None => true,
        }
    }

    /// Swap in a freshly loaded resolver and catalog (the project file
    /// changed) and rebuild from a clean workspace scan.
    pub fn reconfigure(&mut self, resolver: NamespaceResolver, catalog: PropertyCatalog) {
        self.markup = MarkupIndex::new(self.project_path.clone(), resolver.dialect());
        self.resolver = resolver;
        self.catalog = catalog;
        self.fact_files.clear();
        self.scan_workspace();
    }

    pub fn graph(&self) -> &ClassGraph {
        &self.graph
    }

    pub fn resolver(&self) -> &NamespaceResolver {
        &self.resolver
    }

    pub fn skin_class_names(&self) -> Vec<String> {
        self.markup.skin_class_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exml::facts::StaticFactScanner;
    use crate::exml::graph::Prop;
    use std::fs;
    use std::io::Write;

    fn facts(base: Option<&str>, in_engine: bool) -> ClassFacts {
        ClassFacts {
            base_names: base.iter().map(|s| s.to_string()).collect(),
            in_engine,
            ..Default::default()
        }
    }

    fn index_with(map: FactMap) -> ProjectIndex {
        let dir = std::env::temp_dir();
        ProjectIndex::new(
            dir,
            Dialect::Eui,
            NamespaceResolver::new(Dialect::Eui),
            PropertyCatalog::default(),
            Box::new(StaticFactScanner::new(map)),
        )
    }

    #[test]
    fn test_rebuild_wires_edges_by_name() {
        let mut map = FactMap::default();
        map.insert("eui.Component".into(), facts(None, true));
        map.insert("eui.Button".into(), facts(Some("eui.Component"), true));
        map.insert("game.MyButton".into(), facts(Some("eui.Button"), false));
        let mut index = index_with(map);
        index.apply_batch(&ChangeBatch::default());

        let graph = index.graph();
        assert!(graph.is_instance_of("game.MyButton", "eui.Component"));
        assert_eq!(graph.get("game.MyButton").unwrap().base.as_deref(), Some("eui.Button"));
    }

    #[test]
    fn test_engine_declaration_wins() {
        let mut map = FactMap::default();
        let mut engine = facts(None, true);
        engine.props = vec![Prop {
            name: "label".into(),
            type_name: "string".into(),
            ..Default::default()
        }];
        map.insert("eui.Button".into(), engine);
        let mut index = index_with(map);
        index.apply_batch(&ChangeBatch::default());
        // The map insertion order chains source facts before markup facts;
        // a markup redeclaration of an engine name must lose.
        assert!(index.graph().get("eui.Button").unwrap().in_engine);
        assert_eq!(index.graph().get("eui.Button").unwrap().props.len(), 1);
    }

    #[test]
    fn test_deleted_fact_file_removes_types() {
        let dir = tempfile::tempdir().unwrap();
        let fact_path = dir.path().join("libs/eui.facts.json");
        fs::create_dir_all(fact_path.parent().unwrap()).unwrap();
        let mut file = fs::File::create(&fact_path).unwrap();
        write!(file, r#"{{"game.Panel": {{"baseNames": ["eui.Group"]}}}}"#).unwrap();

        let mut index = ProjectIndex::new(
            dir.path().to_path_buf(),
            Dialect::Eui,
            NamespaceResolver::new(Dialect::Eui),
            PropertyCatalog::default(),
            Box::new(crate::exml::facts::JsonFactScanner),
        );
        index.scan_workspace();
        assert!(index.graph().contains("game.Panel"));
        assert!(index.graph().is_instance_of("game.Panel", "game.Panel"));

        fs::remove_file(&fact_path).unwrap();
        let batch = ChangeBatch {
            deleted: vec![fact_path],
            ..Default::default()
        };
        index.apply_batch(&batch);
        assert!(!index.graph().contains("game.Panel"));
        assert!(!index.graph().is_instance_of("other.Type", "game.Panel"));
    }

    #[test]
    fn test_catalog_enumerations_attach() {
        let mut map = FactMap::default();
        let mut label = facts(None, true);
        label.props = vec![Prop {
            name: "verticalAlign".into(),
            type_name: "string".into(),
            ..Default::default()
        }];
        map.insert("eui.Label".into(), label);
        let dir = std::env::temp_dir();
        let catalog = PropertyCatalog::from_json(serde_json::json!({
            "eumn": {
                "eui.Label": {"verticalAlign": "VerticalAlign"},
                "VerticalAlign": ["top", "bottom"]
            }
        }));
        let mut index = ProjectIndex::new(
            dir,
            Dialect::Eui,
            NamespaceResolver::new(Dialect::Eui),
            catalog,
            Box::new(StaticFactScanner::new(map)),
        );
        index.apply_batch(&ChangeBatch::default());
        let node = index.graph().get("eui.Label").unwrap();
        assert_eq!(node.props[0].available, ["top", "bottom"]);
    }

    #[test]
    fn test_ignored_directories_skipped() {
        assert!(is_ignored(Path::new("/p/bin-debug/game.facts.json")));
        assert!(!is_ignored(Path::new("/p/src/game.exml")));
    }
}
