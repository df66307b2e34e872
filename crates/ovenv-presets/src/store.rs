//! Filesystem-backed preset store
//!
//! Presets live in two TOML documents: the shipped defaults embedded in the
//! binary, and a user-writable overlay under the store root. The root path
//! is always passed in explicitly so tests can point the store at a
//! temporary directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::preset::Preset;

/// File name of the preset document inside the store root.
pub const PRESETS_FILE: &str = "presets.toml";

/// Reserved section name supplying inherited defaults.
pub const COMMON_PRESET: &str = "common";

const DEFAULT_PRESETS: &str = include_str!("../assets/presets.toml");

/// Loads and merges preset documents from a root directory.
#[derive(Debug, Clone)]
pub struct PresetStore {
    root: PathBuf,
}

impl PresetStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The platform default store root (`~/.local/share/odoo-venv` on
    /// Linux), or `None` when no data directory can be determined.
    pub fn default_root() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("odoo-venv"))
    }

    /// Path of the user-writable overlay document.
    pub fn user_presets_path(&self) -> PathBuf {
        self.root.join(PRESETS_FILE)
    }

    /// Create the store root and materialize the shipped defaults as the
    /// user overlay when no overlay exists yet.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|e| Error::io(&self.root, e))?;
        }
        let user_path = self.user_presets_path();
        if !user_path.exists() {
            fs::write(&user_path, DEFAULT_PRESETS).map_err(|e| Error::io(&user_path, e))?;
        }
        Ok(())
    }

    /// Load all presets, fully resolved.
    ///
    /// The shipped defaults and the user overlay (when present) are merged
    /// shallowly per preset: an overlay field wins outright over the
    /// default's field. If a `common` section exists in the merged
    /// document, every other preset is rebuilt on top of it per the
    /// [`Preset::layered_over_common`] rules. Unknown keys are dropped.
    pub fn load(&self) -> Result<BTreeMap<String, Preset>> {
        let mut document: toml::Table = toml::from_str(DEFAULT_PRESETS)
            .map_err(|e| Error::Parse {
                path: PathBuf::from("<shipped presets>"),
                message: e.to_string(),
            })?;

        let user_path = self.user_presets_path();
        if user_path.exists() {
            let overlay = load_table(&user_path)?;
            merge_overlay(&mut document, overlay);
        }

        let mut presets = BTreeMap::new();
        for (name, section) in document {
            if !section.is_table() {
                tracing::warn!("preset '{name}' is not a table, skipping");
                continue;
            }
            match section.try_into::<Preset>() {
                Ok(preset) => {
                    presets.insert(name, preset);
                }
                Err(e) => {
                    tracing::warn!("preset '{name}' is malformed, skipping: {e}");
                }
            }
        }

        if let Some(common) = presets.get(COMMON_PRESET).cloned() {
            for (name, preset) in presets.iter_mut() {
                if name != COMMON_PRESET {
                    *preset = preset.layered_over_common(&common);
                }
            }
        }

        Ok(presets)
    }

    /// Load one preset by name.
    pub fn get(&self, name: &str) -> Result<Preset> {
        self.load()?
            .remove(name)
            .ok_or_else(|| Error::PresetNotFound {
                name: name.to_string(),
            })
    }
}

fn load_table(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    toml::from_str(&content).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Shallow-merge overlay sections over default sections: for a preset
/// present on both sides, overlay fields win key by key; a preset only in
/// the overlay is added whole.
fn merge_overlay(document: &mut toml::Table, overlay: toml::Table) {
    for (name, value) in overlay {
        let both_tables =
            value.is_table() && matches!(document.get(&name), Some(toml::Value::Table(_)));
        if both_tables {
            if let (Some(toml::Value::Table(base)), toml::Value::Table(fields)) =
                (document.get_mut(&name), value)
            {
                for (key, field) in fields {
                    base.insert(key, field);
                }
            }
        } else {
            document.insert(name, value);
        }
    }
}
