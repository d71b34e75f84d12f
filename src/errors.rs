#[derive(thiserror::Error, Debug)]
pub enum CliArgumentError {
    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),
    #[error("missing subcommand")]
    MissingSubcommand,
}

/// This error will be returned if a dataset file cannot be loaded or does not resolve.
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("file not found: '{0}'")]
    NotFound(std::path::PathBuf),
    #[error(transparent)]
    Deserialization(#[from] serde_json::Error),
    #[error("unknown feature: '{0}'")]
    UnknownFeature(String),
    #[error("duplicate feature: '{0}'")]
    DuplicateFeature(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
