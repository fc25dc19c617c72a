//! Error kinds observable at the core boundary.

use thiserror::Error;

/// Errors surfaced by the feed fetcher, index builder, and loader supervisor.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// One or more feed HTTP requests did not yield 200 within the per-request deadline.
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// An on-disk snapshot file was unreadable while building a staging index.
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// The registry failed during the swap phase after some categories had already swapped.
    #[error("swap failed: {0}")]
    SwapFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the MX resolver.
#[derive(Debug, Error)]
pub enum MxError {
    /// Every resolver's token bucket was empty this second.
    #[error("rate limited")]
    RateLimited,

    /// The DNS query failed (transport, timeout, or malformed response).
    #[error("lookup failed: {0}")]
    LookupFailed(String),

    /// An unexpected failure outside the documented DNS error paths.
    #[error("unexpected resolver failure: {0}")]
    Exception(String),
}

pub type LoaderResult<T> = Result<T, LoaderError>;
pub type MxResult<T> = Result<T, MxError>;
