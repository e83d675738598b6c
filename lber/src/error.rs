/// Errors from the envelope-only BER primitives.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LberError {
    #[error("malformed BER envelope: {0}")]
    Malformed(&'static str),
    #[error("I/O error while framing a message")]
    Io,
}

impl From<std::io::Error> for LberError {
    fn from(_: std::io::Error) -> Self {
        LberError::Io
    }
}
