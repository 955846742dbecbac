use thiserror::Error;

/// Error surfaced by a single [`RangeFetcher`](crate::fetcher::RangeFetcher) attempt.
///
/// These are always local to one mirror: they never abort a download by
/// themselves, they only disqualify the mirror that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected http status: {0}")]
    HttpStatus(u16),
    #[error("size mismatch: expected {expected} bytes, received {received}")]
    SizeMismatch { expected: u64, received: u64 },
    #[error("io error: {0}")]
    Io(String),
}

/// Programming errors detected by [`ChunkStrategy`](crate::strategy::ChunkStrategy).
///
/// Unlike [`FetchError`] these indicate a bug in the caller (bad construction
/// arguments, or a `chunk_finished` call for a range that was never handed
/// out), not a transient condition of the network.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyError {
    #[error("file_size must be greater than 0")]
    InvalidFileSize,
    #[error("chunk_size must be greater than 0")]
    InvalidChunkSize,
    #[error("at least one mirror is required")]
    NoMirrors,
    #[error("chunk [{begin}, {end}] is not currently in flight")]
    NotInFlight { begin: u64, end: u64 },
}

/// Top level error returned synchronously from the public factory functions.
///
/// A [`DownloadError`] is only ever produced before a download starts (bad
/// [`Config`](crate::config::Config) or bad strategy construction arguments);
/// once a download is under way, failure is reported asynchronously as
/// [`Status::Failed`](crate::handle::Status::Failed) through the finish
/// callback, never as a `Result::Err`.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] anyhow::Error),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}
