use thiserror::Error;

/// Errors surfaced at the boundary of the name codec, packet buffer, resolv.conf
/// loader, search-list generator and hints table.
#[derive(Debug, Error)]
pub enum Error {
    #[error("truncated or reserved-bit-pattern wire data")]
    Malformed,

    #[error("destination buffer too small, or over-length label/name")]
    TooLong,

    #[error("compression-pointer depth exceeded")]
    Loop,

    #[error("packet buffer at capacity")]
    NoBufs,

    #[error("{0}")]
    InvalidName(&'static str),

    #[error("internal error: {0}")]
    Internal(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
