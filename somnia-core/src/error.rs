use thiserror::Error;

pub type Result<T> = std::result::Result<T, SomniaError>;

#[derive(Error, Debug)]
pub enum SomniaError {
    #[error("Invalid amount: {0}")]
    Amount(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SomniaError {
    pub fn amount(msg: impl Into<String>) -> Self {
        Self::Amount(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
