/// Result alias that carries the custom [`ArcadeError`] type.
pub type Result<T> = std::result::Result<T, ArcadeError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum ArcadeError {
    /// Raised by a suspension point once the owning module has been torn
    /// down. Step sequences propagate it with `?` until the dispatcher
    /// swallows it.
    #[error("step sequence cancelled")]
    Cancelled,
    /// A domain rule was violated (invalid speed, empty container, ...).
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// The requested module identifier is not part of the registry.
    #[error("module `{0}` is under construction")]
    UnknownModule(String),
    /// Free-form message, mostly used for poisoned shared state.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration files that fail to parse.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl ArcadeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Returns `true` for the cooperative cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<&str> for ArcadeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ArcadeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
