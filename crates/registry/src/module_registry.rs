//! Module Registry — discovers module directories on disk, tracks their
//! enabled/disabled state and config, and persists changes atomically.
//!
//! Every mutation (`enable`, `disable`, `update_config`, `reorder`)
//! writes `module.json` via a temp-file-then-rename so a crash mid-write
//! can never leave a half-written file behind.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::metadata::ModuleMetadata;

const METADATA_FILE: &str = "module.json";

pub struct ModuleRegistry {
    modules_dir: PathBuf,
    modules: RwLock<HashMap<String, ModuleMetadata>>,
}

impl ModuleRegistry {
    /// Discover every module under `modules_dir` (creating the directory
    /// if it doesn't exist yet).
    pub fn discover(modules_dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let modules_dir = modules_dir.into();
        if !modules_dir.exists() {
            fs::create_dir_all(&modules_dir).map_err(|source| RegistryError::ReadMetadata {
                module_id: "<root>".to_string(),
                source,
            })?;
            return Ok(Self {
                modules_dir,
                modules: RwLock::new(HashMap::new()),
            });
        }

        let mut modules = HashMap::new();

        for entry in fs::read_dir(&modules_dir).map_err(|source| RegistryError::ReadMetadata {
            module_id: "<root>".to_string(),
            source,
        })? {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if !entry.path().is_dir() {
                continue;
            }
            let module_id = entry.file_name().to_string_lossy().into_owned();
            let meta_path = entry.path().join(METADATA_FILE);
            if !meta_path.exists() {
                continue;
            }

            match fs::read_to_string(&meta_path) {
                Ok(raw) => match serde_json::from_str::<ModuleMetadata>(&raw) {
                    Ok(mut meta) => {
                        meta.id = module_id.clone();
                        modules.insert(module_id, meta);
                    }
                    Err(_) => warn!("could not decode module.json for '{}'", module_id),
                },
                Err(source) => {
                    return Err(RegistryError::ReadMetadata { module_id, source });
                }
            }
        }

        Ok(Self {
            modules_dir,
            modules: RwLock::new(modules),
        })
    }

    /// All discovered modules, sorted by `order` (low to high).
    pub fn list(&self) -> Vec<ModuleMetadata> {
        let modules = self.modules.read().unwrap();
        let mut list: Vec<ModuleMetadata> = modules.values().cloned().collect();
        list.sort_by_key(|m| m.order);
        list
    }

    pub fn get(&self, module_id: &str) -> Option<ModuleMetadata> {
        self.modules.read().unwrap().get(module_id).cloned()
    }

    pub fn is_enabled(&self, module_id: &str) -> bool {
        self.modules
            .read()
            .unwrap()
            .get(module_id)
            .map(|m| m.enabled)
            .unwrap_or(false)
    }

    pub fn enable(&self, module_id: &str) -> Result<ModuleMetadata, RegistryError> {
        self.set_enabled(module_id, true)
    }

    pub fn disable(&self, module_id: &str) -> Result<ModuleMetadata, RegistryError> {
        self.set_enabled(module_id, false)
    }

    fn set_enabled(&self, module_id: &str, enabled: bool) -> Result<ModuleMetadata, RegistryError> {
        let updated = {
            let mut modules = self.modules.write().unwrap();
            let meta = modules
                .get_mut(module_id)
                .ok_or_else(|| RegistryError::ModuleNotFound(module_id.to_string()))?;
            meta.enabled = enabled;
            meta.clone()
        };

        self.persist(&updated)?;
        info!(module_id, enabled, "module toggled");
        Ok(updated)
    }

    pub fn update_config(&self, module_id: &str, config: Value) -> Result<ModuleMetadata, RegistryError> {
        let updated = {
            let mut modules = self.modules.write().unwrap();
            let meta = modules
                .get_mut(module_id)
                .ok_or_else(|| RegistryError::ModuleNotFound(module_id.to_string()))?;
            meta.config = config;
            meta.clone()
        };

        self.persist(&updated)?;
        Ok(updated)
    }

    /// Assign new `order` values in the given sequence.
    pub fn reorder(&self, ordered_ids: &[String]) -> Result<(), RegistryError> {
        let updated: Vec<ModuleMetadata> = {
            let mut modules = self.modules.write().unwrap();
            let mut changed = Vec::with_capacity(ordered_ids.len());
            for (idx, id) in ordered_ids.iter().enumerate() {
                if let Some(meta) = modules.get_mut(id) {
                    meta.order = idx as i64;
                    changed.push(meta.clone());
                }
            }
            changed
        };

        for meta in &updated {
            self.persist(meta)?;
        }
        Ok(())
    }

    fn module_dir(&self, module_id: &str) -> PathBuf {
        self.modules_dir.join(module_id)
    }

    /// Write `module.json` via temp-file-and-rename so readers never see
    /// a partially-written file.
    fn persist(&self, meta: &ModuleMetadata) -> Result<(), RegistryError> {
        let dir = self.module_dir(&meta.id);
        let final_path = dir.join(METADATA_FILE);
        let tmp_path = dir.join(format!("{METADATA_FILE}.tmp"));

        let body = serde_json::to_vec_pretty(meta).map_err(|source| RegistryError::ParseMetadata {
            module_id: meta.id.clone(),
            source,
        })?;

        fs::write(&tmp_path, body).map_err(|source| RegistryError::PersistMetadata {
            module_id: meta.id.clone(),
            source,
        })?;

        fs::rename(&tmp_path, &final_path).map_err(|source| RegistryError::PersistMetadata {
            module_id: meta.id.clone(),
            source,
        })?;

        Ok(())
    }
}
