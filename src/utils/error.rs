use thiserror::Error;

pub type Result<T> = std::result::Result<T, DptError>;

#[derive(Error, Debug, Clone)]
pub enum DptError {
    #[error("Malformed account RLP: {0}")]
    MalformedAccount(String),

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Invalid length: {0}")]
    LengthError(String),

    #[error("Invalid secp256k1 key: {0}")]
    InvalidKey(String),

    #[error("Peer is banned: {0}")]
    Banned(String),

    #[error("Ping failed: {0}")]
    PingFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<secp256k1::Error> for DptError {
    fn from(err: secp256k1::Error) -> Self {
        DptError::InvalidKey(err.to_string())
    }
}

impl From<std::io::Error> for DptError {
    fn from(err: std::io::Error) -> Self {
        DptError::Transport(err.to_string())
    }
}
