use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("module '{0}' not found")]
    ModuleNotFound(String),

    #[error("failed to read module metadata for '{module_id}': {source}")]
    ReadMetadata {
        module_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse module.json for '{module_id}': {source}")]
    ParseMetadata {
        module_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to persist module.json for '{module_id}': {source}")]
    PersistMetadata {
        module_id: String,
        #[source]
        source: std::io::Error,
    },
}
