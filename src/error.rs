use shakmaty::Color;
use thiserror::Error;

/// Everything that can go wrong while driving a game session.
///
/// `Validation`, `TurnViolation`, `Busy` and `PromotionPending` are raised
/// synchronously, before any request leaves the client. `Network` and
/// `RemoteRejection` come back from the remote engine. `StaleResponse` is
/// never shown to the operator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not {actual}'s turn ({expected} to move)")]
    TurnViolation { expected: Color, actual: Color },

    #[error("network error: {0}")]
    Network(String),

    #[error("engine rejected request: {0}")]
    RemoteRejection(String),

    #[error("stale response discarded")]
    StaleResponse,

    #[error("another request is still in flight")]
    Busy,

    #[error("waiting for a promotion piece")]
    PromotionPending,
}

impl SessionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::RemoteRejection(message.into())
    }

    /// Whether the operator should be told about this error.
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::StaleResponse)
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
