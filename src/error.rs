pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("malformed payload at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("unexpected value {value:?} in field {tag}")]
    UnexpectedValue { tag: &'static str, value: String },
    #[error("checksum mismatch: payload says {found}, computed {expected}")]
    ChecksumMismatch { expected: String, found: String },
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Whether the error was caused by what the caller sent rather than by
    /// how this side is set up.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::MissingConfig(_) | Error::InvalidConfig(_))
    }
}
