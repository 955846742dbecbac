//! # mirrordl
//!
//! ## Overview
//!
//! `mirrordl` downloads a single resource that is mirrored byte-identically
//! across several servers, splitting the download into fixed-size byte
//! ranges and fetching them concurrently, one range per mirror. If a mirror
//! fails mid-download, its range is handed to another still-healthy mirror;
//! the download succeeds once every range has landed, and fails only once
//! no mirror remains to serve the outstanding work.
//!
//! This crate provides the dispatch logic only. To actually move bytes over
//! the network, pair it with [`mirrordl_http`], which implements
//! [`fetcher::RangeFetcher`] on top of `reqwest`.
//!
//! ## Usage
//!
//! Three entry points cover the surface:
//!
//! * [`get_chunks`]: multi-mirror, ranged download.
//! * [`get`]: single-URL whole-resource `GET`.
//! * [`post`]: single-URL `POST` with a request body.
//!
//! Each returns a [`handle::DownloadHandle`] immediately; progress and
//! completion are reported through callbacks registered on the handle
//! (`on_progress`, `on_finish`), not by awaiting a future; the download
//! keeps running even if the handle is dropped, unless [`handle::DownloadHandle::cancel`]
//! is called first.
use std::sync::Arc;

use bytes::Bytes;
use url::Url;

pub mod config;
pub mod errors;
pub mod fetcher;
pub mod handle;
mod multi_source;
mod range;
mod simple;
pub mod strategy;
pub mod writer;

pub use config::Config;
pub use errors::{DownloadError, FetchError, StrategyError};
pub use fetcher::{FetchRequest, RangeFetcher};
pub use handle::{DownloadHandle, Status};
pub use range::ByteRange;
pub use writer::{PositionedWriter, VecWriter};

/// Starts a whole-resource `GET` against a single URL.
pub fn get<F: RangeFetcher>(
    url: Url,
    fetcher: Arc<F>,
    writer: Arc<dyn PositionedWriter>,
) -> DownloadHandle {
    simple::fetch(url, None, fetcher, writer)
}

/// Starts a `POST` with `body` against a single URL, sharing the same
/// progress/finish contract as [`get`].
pub fn post<F: RangeFetcher>(
    url: Url,
    body: Bytes,
    fetcher: Arc<F>,
    writer: Arc<dyn PositionedWriter>,
) -> DownloadHandle {
    simple::fetch(url, Some(body), fetcher, writer)
}

/// Starts a chunked download of a `file_size`-byte resource across
/// `mirrors`, using `config` (or `config.chunk_size_bytes` overridden by
/// `chunk_size`, if given) to size each range.
///
/// Fails synchronously only if `config` does not validate or the strategy
/// cannot be constructed (empty `mirrors`, zero `file_size`); once the
/// download is under way every further failure surfaces as
/// [`Status::Failed`] on the returned handle.
pub fn get_chunks<F: RangeFetcher>(
    mirrors: Vec<Url>,
    file_size: u64,
    config: &Config,
    chunk_size: Option<u64>,
    fetcher: Arc<F>,
    writer: Arc<dyn PositionedWriter>,
) -> Result<DownloadHandle, DownloadError> {
    let validated = config.clone().validated()?;
    let handle = multi_source::get_chunks(mirrors, file_size, &validated, chunk_size, fetcher, writer)?;
    Ok(handle)
}
