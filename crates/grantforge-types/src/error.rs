/// Validation error for chain-agnostic value types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    InvalidAddress(String),
    InvalidHash(String),
    InvalidAmount(String),
    InvalidChain(String),
}

impl std::fmt::Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAddress(msg) => write!(f, "invalid address: {msg}"),
            Self::InvalidHash(msg) => write!(f, "invalid transaction hash: {msg}"),
            Self::InvalidAmount(msg) => write!(f, "invalid amount: {msg}"),
            Self::InvalidChain(msg) => write!(f, "invalid chain id: {msg}"),
        }
    }
}

impl std::error::Error for TypeError {}
