use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("Invalid construct id {id:?}\n{reason}")]
    InvalidConstructId { id: String, reason: String },

    #[error("Invalid logical id {id:?}\n{reason}")]
    InvalidLogicalId { id: String, reason: String },

    #[error("Logical id {0:?} is already in use within this stack")]
    DuplicateLogicalId(String),

    #[error("Invalid stack name {name}\n{reason}")]
    InvalidStackName { name: String, reason: String },

    #[error("Validation failed on resource '{resource}'\n{reason}")]
    InvalidResource { resource: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Resource '{resource}' is not a {expected}")]
    UnexpectedResourceType { resource: String, expected: &'static str },

    #[error("No resource named '{0}' exists in this stack")]
    MissingResource(String),

    #[error("Cache behavior override was already applied to distribution '{0}'")]
    OverrideAlreadyApplied(String),

    #[error("Asset directory {} does not exist", path.display())]
    MissingAssets { path: PathBuf },

    #[error("Asset path {} is not a directory", path.display())]
    AssetsNotDirectory { path: PathBuf },

    #[error("Failed to read asset path {}\n{source}", path.display())]
    AssetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize template\n{0}")]
    Serialize(#[from] serde_json::Error),
}
