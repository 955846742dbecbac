//! Orchestrates a chunked, multi-mirror download: owns the [`ChunkStrategy`]
//! behind a mutex, launches fetch tasks, and drives progress/finish events
//! through a [`DownloadHandle`].
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use url::Url;

use crate::config::Config;
use crate::errors::StrategyError;
use crate::fetcher::{FetchRequest, RangeFetcher};
use crate::handle::{DownloadHandle, Status};
use crate::strategy::{ChunkStrategy, NextChunkOutcome};
use crate::writer::PositionedWriter;

struct Shared<F: RangeFetcher> {
    strategy: Mutex<ChunkStrategy>,
    fetcher: Arc<F>,
    writer: Arc<dyn PositionedWriter>,
    handle: DownloadHandle,
    bytes_received: AtomicU64,
}

/// Starts a chunked download across `mirrors`, partitioning `[0, file_size)`
/// into `chunk_size` byte ranges and dispatching one fetch per mirror at a
/// time, retrying a failed range on any mirror still alive.
///
/// Returns immediately with a [`DownloadHandle`]; all work happens on
/// `tokio::spawn`ed tasks. Fails synchronously only if the strategy cannot
/// be constructed at all (bad arguments); once launched, every further
/// failure is reported through `Status::Failed` on the handle.
pub fn get_chunks<F: RangeFetcher>(
    mirrors: Vec<Url>,
    file_size: u64,
    config: &Config,
    chunk_size_override: Option<u64>,
    fetcher: Arc<F>,
    writer: Arc<dyn PositionedWriter>,
) -> Result<DownloadHandle, StrategyError> {
    let chunk_size = chunk_size_override.unwrap_or(config.chunk_size_bytes);
    let strategy = ChunkStrategy::new(mirrors, file_size, chunk_size)?;
    let handle = DownloadHandle::new();

    let shared = Arc::new(Shared {
        strategy: Mutex::new(strategy),
        fetcher,
        writer,
        handle: handle.clone(),
        bytes_received: AtomicU64::new(0),
    });

    // Initial saturation: launch one fetch per currently idle mirror.
    dispatch_next(&shared);

    Ok(handle)
}

/// Pulls as many `(mirror, range)` pairings as the strategy currently has on
/// offer and spawns a fetch task for each. Called once at launch, and again
/// after every completion.
fn dispatch_next<F: RangeFetcher>(shared: &Arc<Shared<F>>) {
    loop {
        let outcome = {
            let mut strategy = shared.strategy.lock().unwrap();
            strategy.next_chunk()
        };

        match outcome {
            NextChunkOutcome::NextChunk { url, range, .. } => {
                spawn_fetch(Arc::clone(shared), url, range);
            }
            NextChunkOutcome::NoFreeServers => break,
            NextChunkOutcome::DownloadSucceeded => {
                tracing::info!("download complete");
                shared.handle.finish(Status::Completed);
                break;
            }
            NextChunkOutcome::DownloadFailed => {
                tracing::info!("download failed: no mirrors remain");
                shared.handle.finish(Status::Failed);
                break;
            }
        }
    }
}

fn spawn_fetch<F: RangeFetcher>(shared: Arc<Shared<F>>, url: Url, range: crate::range::ByteRange) {
    tokio::spawn(async move {
        if shared.handle.is_cancelled() {
            return;
        }

        let req = FetchRequest::new(url.clone(), Arc::clone(&shared.writer)).with_range(range);
        let result = shared.fetcher.fetch(req).await;

        if shared.handle.is_cancelled() {
            return;
        }

        let success = match &result {
            Ok(()) => {
                let total = shared
                    .bytes_received
                    .fetch_add(range.len(), Ordering::SeqCst)
                    + range.len();
                shared.handle.emit_progress(total);
                true
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "mirror failed, retiring it");
                false
            }
        };

        let report = {
            let mut strategy = shared.strategy.lock().unwrap();
            strategy.chunk_finished(success, range.begin, range.end)
        };

        if let Err(err) = report {
            tracing::error!(error = %err, "chunk_finished called for a range not in flight");
            shared.handle.finish(Status::Failed);
            return;
        }

        dispatch_next(&shared);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use crate::fetcher::test_support::{FetchOutcome, ScriptedFetcher};
    use crate::writer::VecWriter;
    use bytes::Bytes;
    use std::time::Duration;

    fn url(s: &str) -> Url {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn s1_succeeds_after_one_mirror_dies() {
        let mirrors = vec![url("http://a"), url("http://b"), url("http://c")];
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            ("http://a/", vec![FetchOutcome::Succeed(Bytes::from_static(&[1; 250]))]),
            (
                "http://b/",
                vec![
                    FetchOutcome::Succeed(Bytes::from_static(&[2; 250])),
                    FetchOutcome::Fail(FetchError::Transport("reset".into())),
                ],
            ),
            ("http://c/", vec![FetchOutcome::Succeed(Bytes::from_static(&[3; 50]))]),
        ]));
        let writer = Arc::new(VecWriter::with_capacity(800));
        let config = Config::default();

        let handle = get_chunks(mirrors, 800, &config, Some(250), Arc::clone(&fetcher), writer)
            .expect("strategy construction should succeed");

        for _ in 0..50 {
            if handle.status() != Status::InProgress {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(handle.status(), Status::Completed);
    }

    #[tokio::test]
    async fn construction_rejects_empty_mirror_list() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let writer = Arc::new(VecWriter::with_capacity(800));
        let config = Config::default();
        let err = get_chunks(vec![], 800, &config, None, fetcher, writer).unwrap_err();
        assert_eq!(err, StrategyError::NoMirrors);
    }
}
