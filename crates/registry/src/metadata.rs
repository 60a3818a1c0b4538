//! On-disk shape of a module's `module.json`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata describing one discovered module directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Directory name under the modules root; also the module's id.
    #[serde(skip_deserializing, default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    /// Lower values sort first in listings.
    #[serde(default = "default_order")]
    pub order: i64,
    /// Module-specific free-form configuration.
    #[serde(default)]
    pub config: Value,
    /// Last error encountered while loading this module, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

fn default_order() -> i64 {
    999
}
