//! Theme style table for `style`-attribute completion.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

#[derive(Debug, Default)]
pub struct ThemeStyleIndex {
    /// Style name plus its serialized body, shown as candidate detail.
    styles: Vec<(String, String)>,
}

impl ThemeStyleIndex {
    /// Parse the theme file's `styles` table. Missing or malformed themes
    /// degrade to an empty table.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        let root: Value = match serde_json::from_str(&text) {
            Ok(root) => root,
            Err(err) => {
                warn!(path = %path.display(), %err, "malformed theme file");
                return Self::default();
            }
        };
        let styles = root
            .get("styles")
            .and_then(Value::as_object)
            .map(|styles| {
                styles
                    .iter()
                    .map(|(name, body)| (name.clone(), body.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Self { styles }
    }

    pub fn styles(&self) -> impl Iterator<Item = (&str, &str)> {
        self.styles.iter().map(|(n, d)| (n.as_str(), d.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
