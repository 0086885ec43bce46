//! Image-resource index for `source`-attribute completion.
//!
//! Keys are resource-relative paths of image files under the configured
//! resource root, kept current from file events.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::exml::tracker::ChangeKind;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

#[derive(Debug, Default)]
pub struct ImageResourceIndex {
    root: Option<PathBuf>,
    keys: BTreeSet<String>,
}

impl ImageResourceIndex {
    /// Point the index at a resource root and scan it. A missing root
    /// leaves the index empty.
    pub fn init(&mut self, root: &Path) {
        self.root = Some(root.to_path_buf());
        self.keys.clear();
        if !root.exists() {
            return;
        }
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            if is_image(entry.path()) {
                if let Some(key) = self.key_for(entry.path()) {
                    self.keys.insert(key);
                }
            }
        }
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let root = self.root.as_ref()?;
        let rel = path.strip_prefix(root).ok()?;
        Some(rel.to_string_lossy().replace('\\', "/"))
    }

    pub fn file_changed(&mut self, path: &Path, kind: ChangeKind) {
        if !is_image(path) {
            return;
        }
        let Some(key) = self.key_for(path) else {
            return;
        };
        match kind {
            ChangeKind::Added | ChangeKind::Modified => {
                self.keys.insert(key);
            }
            ChangeKind::Deleted => {
                self.keys.remove(&key);
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
