use thiserror::Error;

/// Errors produced when parsing identifier and tag strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid entity id: {0}")]
    InvalidEntityId(String),

    #[error("invalid invoice id: {0}")]
    InvalidInvoiceId(String),

    #[error("unknown risk tier: {0}")]
    UnknownRiskTier(String),

    #[error("unknown milestone: {0}")]
    UnknownMilestone(String),
}
