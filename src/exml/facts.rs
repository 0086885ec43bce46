//! The source-fact contract.
//!
//! The completion core does not analyze project source code itself: a
//! pluggable scanner yields, per declared type, its base types, implemented
//! interfaces, public mutable properties and flags. `JsonFactScanner` reads
//! fact catalogs produced out-of-band by the host toolchain;
//! `StaticFactScanner` serves fixtures in tests.

use std::fs;
use std::path::PathBuf;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::warn;

use super::graph::Prop;

/// Facts about one declared type, before graph wiring.
#[derive(Debug, Clone, Default)]
pub struct ClassFacts {
    pub base_names: Vec<String>,
    pub implemented_names: Vec<String>,
    pub props: Vec<Prop>,
    pub is_interface: bool,
    /// Declared by the engine runtime; wins over project-local declarations
    /// of the same name.
    pub in_engine: bool,
    /// Engine declaration that should still be offered in completion.
    pub in_prompt: bool,
}

pub type FactMap = FxHashMap<String, ClassFacts>;

/// Contract for the external static-analysis service. Implementations must
/// exclude private/protected/read-only members, resolve simple literal
/// defaults (`false`/`""`/`0` for the primitive types, `null` otherwise) and
/// flag engine-provided declarations.
pub trait FactScanner: Send + Sync {
    /// Extract facts from the given files. A file that cannot be read or
    /// understood is skipped; it must not poison the batch.
    fn extract_facts(&self, files: &[PathBuf]) -> FactMap;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FactEntry {
    base_names: Vec<String>,
    implemented_names: Vec<String>,
    properties: Vec<PropEntry>,
    is_interface: bool,
    in_engine: bool,
    in_prompt: bool,
}

impl Default for FactEntry {
    fn default() -> Self {
        Self {
            base_names: Vec::new(),
            implemented_names: Vec::new(),
            properties: Vec::new(),
            is_interface: false,
            in_engine: false,
            in_prompt: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PropEntry {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    value: Option<String>,
}

impl PropEntry {
    /// Apply the default-value rules when the catalog carries no initializer.
    fn into_prop(self) -> Prop {
        let value = self.value.unwrap_or_else(|| {
            match self.type_name.as_str() {
                "boolean" => "false",
                "string" => "\"\"",
                "number" => "0",
                _ => "null",
            }
            .to_string()
        });
        Prop {
            name: self.name,
            type_name: self.type_name,
            value,
            available: Vec::new(),
        }
    }
}

/// Reads `*.facts.json` catalogs: a JSON object mapping fully qualified
/// names to fact entries.
#[derive(Debug, Default)]
pub struct JsonFactScanner;

impl FactScanner for JsonFactScanner {
    fn extract_facts(&self, files: &[PathBuf]) -> FactMap {
        let mut map = FactMap::default();
        for path in files {
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable fact catalog");
                    continue;
                }
            };
            let entries: FxHashMap<String, FactEntry> = match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping malformed fact catalog");
                    continue;
                }
            };
            for (name, entry) in entries {
                map.insert(
                    name,
                    ClassFacts {
                        base_names: entry.base_names,
                        implemented_names: entry.implemented_names,
                        props: entry.properties.into_iter().map(PropEntry::into_prop).collect(),
                        is_interface: entry.is_interface,
                        in_engine: entry.in_engine,
                        in_prompt: entry.in_prompt,
                    },
                );
            }
        }
        map
    }
}

/// In-memory scanner for tests and fixtures; ignores the file list.
#[derive(Debug, Default)]
pub struct StaticFactScanner {
    facts: FactMap,
}

impl StaticFactScanner {
    pub fn new(facts: FactMap) -> Self {
        Self { facts }
    }
}

impl FactScanner for StaticFactScanner {
    fn extract_facts(&self, _files: &[PathBuf]) -> FactMap {
        self.facts.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_json_scanner_reads_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "eui.Button": {{
                    "baseNames": ["eui.Component"],
                    "implementedNames": ["eui.IDisplayText"],
                    "properties": [
                        {{"name": "label", "type": "string"}},
                        {{"name": "scale", "type": "number", "value": "1"}}
                    ],
                    "inEngine": true
                }}
            }}"#
        )
        .unwrap();
        let facts = JsonFactScanner.extract_facts(&[file.path().to_path_buf()]);
        let button = &facts["eui.Button"];
        assert_eq!(button.base_names, ["eui.Component"]);
        assert!(button.in_engine);
        assert_eq!(button.props[0].value, "\"\"");
        assert_eq!(button.props[1].value, "1");
    }

    #[test]
    fn test_unreadable_file_is_isolated() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        write!(good, r#"{{"a.A": {{}}}}"#).unwrap();
        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        let facts = JsonFactScanner.extract_facts(&[
            bad.path().to_path_buf(),
            PathBuf::from("/no/such/file.facts.json"),
            good.path().to_path_buf(),
        ]);
        assert_eq!(facts.len(), 1);
        assert!(facts.contains_key("a.A"));
    }
}
