//! Auxiliary property metadata: the enumeration catalog.
//!
//! The catalog's `eumn` table maps class names to `{property: enum-key}`
//! objects and enum keys to their legal value lists. A missing or malformed
//! catalog degrades to no enumerations.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

#[derive(Debug, Default)]
pub struct PropertyCatalog {
    eumn: Value,
}

impl PropertyCatalog {
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(root) => Self {
                eumn: root.get("eumn").cloned().unwrap_or(Value::Null),
            },
            Err(err) => {
                warn!(path = %path.display(), %err, "malformed property catalog");
                Self::default()
            }
        }
    }

    #[cfg(test)]
    pub fn from_json(root: Value) -> Self {
        Self {
            eumn: root.get("eumn").cloned().unwrap_or(Value::Null),
        }
    }

    /// Legal values for `class_name.prop_name`, when the catalog enumerates
    /// them.
    pub fn available_values(&self, class_name: &str, prop_name: &str) -> Option<Vec<String>> {
        let key = self.eumn.get(class_name)?.get(prop_name)?.as_str()?;
        let values = self.eumn.get(key)?.as_array()?;
        Some(
            values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )
    }
}
