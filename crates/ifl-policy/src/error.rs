use thiserror::Error;

/// Errors produced while loading the policy table.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse policy file: {0}")]
    Parse(#[from] toml::de::Error),
}
