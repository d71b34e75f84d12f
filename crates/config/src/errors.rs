/// This error will be returned if an attempt to load geomatch's configuration file fails.
#[derive(thiserror::Error, Debug)]
pub enum ConfigFileError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("file not found: '{0}'")]
    NotFound(std::path::PathBuf),
    #[error(transparent)]
    Deserialization(#[from] toml::de::Error),
    #[error(transparent)]
    Validation(#[from] validator::ValidationError),
    #[error(transparent)]
    Validations(#[from] validator::ValidationErrors),
    #[error("invalid membership function: {0}")]
    InvalidFunction(#[from] geomatch_evidence::FunctionError),
    #[error("missing parent: '{0}'")]
    MissingParent(String),
    #[error("invalid circular include: '{0}'")]
    CircularInclude(String),
    #[error("duplicate named source: '{0}'")]
    Duplicate(String),
    #[error("invalid decision config: {0}")]
    InvalidDecisionConfig(String),
    #[error("invalid source config: {0}")]
    InvalidSourceConfig(String),
}
