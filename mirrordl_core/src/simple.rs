//! Degenerate single-mirror download: the whole resource in one request, no
//! ranging, sharing the same progress/finish contract as
//! [`crate::multi_source`].
use std::sync::Arc;

use bytes::Bytes;
use url::Url;

use crate::fetcher::{FetchRequest, RangeFetcher};
use crate::handle::{DownloadHandle, Status};
use crate::writer::PositionedWriter;

/// Starts a whole-resource GET (or, with `body: Some`, POST) against a
/// single URL. Returns immediately with a [`DownloadHandle`]; the request
/// runs on a `tokio::spawn`ed task.
pub fn fetch<F: RangeFetcher>(
    url: Url,
    body: Option<Bytes>,
    fetcher: Arc<F>,
    writer: Arc<dyn PositionedWriter>,
) -> DownloadHandle {
    let handle = DownloadHandle::new();
    let handle_for_task = handle.clone();

    tokio::spawn(async move {
        if handle_for_task.is_cancelled() {
            return;
        }

        let mut req = FetchRequest::new(url.clone(), writer);
        if let Some(body) = body {
            req = req.with_body(body);
        }

        let result = fetcher.fetch(req).await;

        if handle_for_task.is_cancelled() {
            return;
        }

        match result {
            Ok(()) => {
                handle_for_task.emit_progress(0);
                handle_for_task.finish(Status::Completed);
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "simple download failed");
                handle_for_task.finish(Status::Failed);
            }
        }
    });

    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use crate::fetcher::test_support::{FetchOutcome, ScriptedFetcher};
    use crate::writer::VecWriter;
    use std::time::Duration;

    async fn wait_for_terminal(handle: &DownloadHandle) {
        for _ in 0..50 {
            if handle.status() != Status::InProgress {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn get_completes_on_success() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![(
            "http://example/",
            vec![FetchOutcome::Succeed(Bytes::from_static(b"hello"))],
        )]));
        let writer = Arc::new(VecWriter::default());

        let handle = fetch(
            "http://example".parse().unwrap(),
            None,
            fetcher,
            writer,
        );
        wait_for_terminal(&handle).await;

        assert_eq!(handle.status(), Status::Completed);
    }

    #[tokio::test]
    async fn get_fails_on_transport_error() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![(
            "http://example/",
            vec![FetchOutcome::Fail(FetchError::HttpStatus(500))],
        )]));
        let writer = Arc::new(VecWriter::default());

        let handle = fetch(
            "http://example".parse().unwrap(),
            None,
            fetcher,
            writer,
        );
        wait_for_terminal(&handle).await;

        assert_eq!(handle.status(), Status::Failed);
    }
}
