use thiserror::Error;

pub type Result<T> = std::result::Result<T, SatchelError>;

#[derive(Error, Debug)]
pub enum SatchelError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid account type: {0}")]
    InvalidAccountType(String),

    #[error("Wrong passphrase or corrupt encrypted seed")]
    WrongPassphrase,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Wallet not found: {id}")]
    WalletNotFound { id: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SatchelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_account_type(msg: impl Into<String>) -> Self {
        Self::InvalidAccountType(msg.into())
    }

    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
