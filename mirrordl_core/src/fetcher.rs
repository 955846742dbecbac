//! Transport abstraction: "fetch this byte range from this URL into this
//! writer", with the actual HTTP work delegated to a separate crate.
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use url::Url;

use crate::errors::FetchError;
use crate::range::ByteRange;
use crate::writer::PositionedWriter;

/// Everything a [`RangeFetcher`] needs to carry out a single fetch attempt.
pub struct FetchRequest {
    pub url: Url,
    /// `None` means "the whole resource", used by [`crate::simple::SimpleDownload`].
    /// `Some` means "send `Range: bytes=begin-end`", used by chunked downloads.
    pub range: Option<ByteRange>,
    /// Request body for `POST`; absent for `GET`.
    pub body: Option<Bytes>,
    pub writer: Arc<dyn PositionedWriter>,
    /// Absolute offset in `writer` at which the response body should land.
    /// Equal to `range.begin` for chunked downloads, `0` for whole-resource
    /// fetches.
    pub write_offset: u64,
}

impl FetchRequest {
    pub fn new(url: Url, writer: Arc<dyn PositionedWriter>) -> Self {
        Self {
            url,
            range: None,
            body: None,
            writer,
            write_offset: 0,
        }
    }

    pub fn with_range(mut self, range: ByteRange) -> Self {
        self.write_offset = range.begin;
        self.range = Some(range);
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }
}

/// One mirror's ability to serve byte ranges. Implemented by
/// `mirrordl_http::ReqwestFetcher` for real traffic, and by hand-rolled
/// mocks in tests.
///
/// Implementations must treat every error condition (connection failure,
/// DNS failure, non-2xx status, a server that ignores `Range` and returns
/// the whole body) as an `Err(FetchError)` rather than a partial success;
/// the caller relies on "no `Err`" meaning "the full range landed in the
/// writer".
pub trait RangeFetcher: Send + Sync + 'static {
    fn fetch(&self, req: FetchRequest) -> BoxFuture<'static, Result<(), FetchError>>;
}
