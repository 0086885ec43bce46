//! Per-project configuration.
//!
//! `exmlProperties.json` at the workspace root selects the UI dialect and
//! the catalog paths. A workspace without it is not an EXML project and
//! completion stays inert.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use super::dialect::Dialect;

pub const PROJECT_FILE: &str = "exmlProperties.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSettings {
    pub ui_library: Option<String>,
    pub manifest: Option<PathBuf>,
    pub properties: Option<PathBuf>,
    pub theme: Option<PathBuf>,
    pub resources: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ProjectModel {
    root: PathBuf,
    settings: ProjectSettings,
}

impl ProjectModel {
    /// Load the project file from `root`. `None` means the workspace is not
    /// an EXML project.
    pub fn load(root: &Path) -> Option<Self> {
        let path = root.join(PROJECT_FILE);
        let text = fs::read_to_string(&path).ok()?;
        let settings = match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), %err, "malformed project file");
                ProjectSettings::default()
            }
        };
        Some(Self {
            root: root.to_path_buf(),
            settings,
        })
    }

    pub fn with_settings(root: &Path, settings: ProjectSettings) -> Self {
        Self {
            root: root.to_path_buf(),
            settings,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dialect(&self) -> Option<Dialect> {
        match self.settings.ui_library.as_deref() {
            Some(name) => Dialect::from_name(name),
            None => Some(Dialect::Eui),
        }
    }

    fn resolve(&self, configured: Option<&PathBuf>, default: &str) -> PathBuf {
        match configured {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.root.join(path),
            None => self.root.join(default),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(self.settings.manifest.as_ref(), "manifest.xml")
    }

    pub fn properties_path(&self) -> PathBuf {
        self.resolve(self.settings.properties.as_ref(), "properties.json")
    }

    pub fn theme_path(&self) -> PathBuf {
        self.resolve(self.settings.theme.as_ref(), "resource/default.thm.json")
    }

    pub fn resources_path(&self) -> PathBuf {
        self.resolve(self.settings.resources.as_ref(), "resource")
    }

    /// Only a change to the project file itself invalidates this model.
    pub fn needs_refresh(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| name == PROJECT_FILE)
            .unwrap_or(false)
    }
}
