//! `reqwest`-backed [`RangeFetcher`] for `mirrordl_core`.
//!
//! This is the transport implementation shipped with `mirrordl`; pair it
//! with `mirrordl_core::get`/`post`/`get_chunks` to actually move bytes
//! over the network. TLS and DNS resolution are delegated entirely to
//! `reqwest`/`hyper`.
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::StreamExt;
use mirrordl_core::{Config, FetchError, FetchRequest, RangeFetcher};
use reqwest::{header::RANGE, redirect::Policy, Client, Method};

/// A [`RangeFetcher`] backed by a single shared `reqwest::Client`.
///
/// Redirects (3xx) are followed transparently up to `Config::max_redirects`;
/// a mirror answering with `301`/`302`/`307`/`308` is not treated as a
/// mirror failure as long as the chain resolves within that bound.
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Builds a fetcher from a `mirrordl_core::Config`, applying its
    /// timeouts, user agent, and redirect bound to the underlying client.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(Policy::limited(config.max_redirects as usize))
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Builds a fetcher from an already-configured `reqwest::Client`, for
    /// callers who need finer control than [`Config`] exposes.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl RangeFetcher for ReqwestFetcher {
    fn fetch(&self, req: FetchRequest) -> BoxFuture<'static, Result<(), FetchError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let method = if req.body.is_some() { Method::POST } else { Method::GET };
            let mut builder = client.request(method, req.url.clone());

            if let Some(range) = req.range {
                builder = builder.header(RANGE, format!("bytes={}-{}", range.begin, range.end));
            }
            if let Some(body) = &req.body {
                builder = builder.body(body.clone());
            }

            tracing::debug!(url = %req.url, range = ?req.range, "fetching");

            let response = builder.send().await.map_err(|err| {
                tracing::warn!(url = %req.url, error = %err, "transport error");
                FetchError::Transport(err.to_string())
            })?;

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(url = %req.url, status = status.as_u16(), "unexpected status");
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            let expected = req.range.map(|r| r.len());

            let mut offset = req.write_offset;
            let mut received = 0u64;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk: Bytes = chunk.map_err(|err| FetchError::Transport(err.to_string()))?;
                req.writer.write_at(offset, &chunk)?;
                offset += chunk.len() as u64;
                received += chunk.len() as u64;
            }

            if let Some(expected) = expected {
                if received != expected {
                    tracing::warn!(url = %req.url, expected, received, "size mismatch");
                    return Err(FetchError::SizeMismatch { expected, received });
                }
            }

            Ok(())
        })
    }
}
