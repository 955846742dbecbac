//! The chunk-dispatch strategy: a pure, synchronous state machine.
//!
//! This module has no dependency on `tokio`, `reqwest`, or any other I/O
//! facility on purpose; every operation here is `O(mirrors + chunks)` and
//! returns immediately. The orchestrator in [`crate::multi_source`] is the
//! only thing that calls into it, always under a mutex.
use url::Url;

use crate::errors::StrategyError;
use crate::range::{partition, ByteRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MirrorState {
    Idle,
    Busy,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Pending,
    InFlight,
    Done,
}

#[derive(Debug)]
struct MirrorSlot {
    url: Url,
    state: MirrorState,
    assigned_chunk: Option<usize>,
}

#[derive(Debug)]
struct ChunkSlot {
    range: ByteRange,
    state: ChunkState,
}

/// The verdict returned by [`ChunkStrategy::next_chunk`].
///
/// Named after the source's own `ENextChunk` / `ENoFreeServers` /
/// `EDownloadSucceeded` / `EDownloadFailed` enumerators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextChunkOutcome {
    /// An idle mirror was paired with a pending chunk; the pairing has
    /// already been recorded as `Busy`/`InFlight`.
    NextChunk { mirror_index: usize, url: Url, range: ByteRange },
    /// Pending work exists but every mirror is currently `Busy` or `Dead`.
    /// The caller should wait for an outstanding completion and retry.
    NoFreeServers,
    /// Every chunk is `Done`. Terminal; repeated calls keep returning this.
    DownloadSucceeded,
    /// Pending work exists and every mirror is `Dead`; no one is left to
    /// ever complete it. Terminal; repeated calls keep returning this.
    DownloadFailed,
}

/// Deterministic dispatcher answering "which mirror should fetch which
/// range next" for a single download session.
///
/// See the module docs for the concurrency contract: every call must be
/// externally serialized (a mutex, or a single dispatch thread).
#[derive(Debug)]
pub struct ChunkStrategy {
    mirrors: Vec<MirrorSlot>,
    chunks: Vec<ChunkSlot>,
}

impl ChunkStrategy {
    /// Builds the chunk list by partitioning `[0, file_size)` into ranges of
    /// `chunk_size` bytes (the last one possibly shorter), and one mirror
    /// slot per URL in `mirrors`, all starting `Idle`.
    pub fn new<I>(mirrors: I, file_size: u64, chunk_size: u64) -> Result<Self, StrategyError>
    where
        I: IntoIterator<Item = Url>,
    {
        let mirrors: Vec<MirrorSlot> = mirrors
            .into_iter()
            .map(|url| MirrorSlot {
                url,
                state: MirrorState::Idle,
                assigned_chunk: None,
            })
            .collect();
        if mirrors.is_empty() {
            return Err(StrategyError::NoMirrors);
        }

        let chunks = partition(file_size, chunk_size)?
            .into_iter()
            .map(|range| ChunkSlot {
                range,
                state: ChunkState::Pending,
            })
            .collect();

        Ok(Self { mirrors, chunks })
    }

    /// Total number of chunks the resource was partitioned into.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of mirrors still eligible for assignment (`Idle` or `Busy`).
    pub fn live_mirror_count(&self) -> usize {
        self.mirrors
            .iter()
            .filter(|m| m.state != MirrorState::Dead)
            .count()
    }

    /// Hands out the next `(mirror, range)` pairing, or reports why none is
    /// currently available.
    ///
    /// Selection is deterministic first-fit: the first `Idle` mirror in
    /// input order is paired with the lowest-indexed `Pending` chunk.
    pub fn next_chunk(&mut self) -> NextChunkOutcome {
        if let Some(mirror_index) = self.mirrors.iter().position(|m| m.state == MirrorState::Idle)
        {
            if let Some(chunk_index) = self.chunks.iter().position(|c| c.state == ChunkState::Pending) {
                self.mirrors[mirror_index].state = MirrorState::Busy;
                self.mirrors[mirror_index].assigned_chunk = Some(chunk_index);
                self.chunks[chunk_index].state = ChunkState::InFlight;
                return NextChunkOutcome::NextChunk {
                    mirror_index,
                    url: self.mirrors[mirror_index].url.clone(),
                    range: self.chunks[chunk_index].range,
                };
            }
        }

        if self.chunks.iter().all(|c| c.state == ChunkState::Done) {
            return NextChunkOutcome::DownloadSucceeded;
        }

        if self.mirrors.iter().all(|m| m.state == MirrorState::Dead) {
            return NextChunkOutcome::DownloadFailed;
        }

        NextChunkOutcome::NoFreeServers
    }

    /// Reports the outcome of the in-flight chunk covering `[begin, end]`.
    ///
    /// On success the chunk becomes `Done` and its mirror `Idle` again. On
    /// failure the chunk goes back to `Pending` for another mirror to pick
    /// up, and the mirror that failed it is permanently retired (`Dead`);
    /// it is never resurrected, even by a later success elsewhere.
    pub fn chunk_finished(&mut self, success: bool, begin: u64, end: u64) -> Result<(), StrategyError> {
        let chunk_index = self
            .chunks
            .iter()
            .position(|c| c.range.begin == begin && c.range.end == end && c.state == ChunkState::InFlight)
            .ok_or(StrategyError::NotInFlight { begin, end })?;

        let mirror_index = self
            .mirrors
            .iter()
            .position(|m| m.assigned_chunk == Some(chunk_index))
            .ok_or(StrategyError::NotInFlight { begin, end })?;

        self.mirrors[mirror_index].assigned_chunk = None;
        if success {
            self.chunks[chunk_index].state = ChunkState::Done;
            self.mirrors[mirror_index].state = MirrorState::Idle;
        } else {
            self.chunks[chunk_index].state = ChunkState::Pending;
            self.mirrors[mirror_index].state = MirrorState::Dead;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        format!("http://{s}").parse().unwrap()
    }

    fn assigned(outcome: NextChunkOutcome) -> (Url, ByteRange) {
        match outcome {
            NextChunkOutcome::NextChunk { url, range, .. } => (url, range),
            other => panic!("expected NextChunk, got {other:?}"),
        }
    }

    /// `S1` from the spec: round robin assignment across 3 mirrors, then a
    /// failure, then eventual success with only 2 of the 3 mirrors alive.
    #[test]
    fn s1_round_robin_then_retry_then_succeeds() {
        let mirrors = vec![url("a"), url("b"), url("c")];
        let mut strategy = ChunkStrategy::new(mirrors, 800, 250).unwrap();

        let (url_a, r1) = assigned(strategy.next_chunk());
        let (url_b, r2) = assigned(strategy.next_chunk());
        let (url_c, r3) = assigned(strategy.next_chunk());
        assert_eq!(strategy.next_chunk(), NextChunkOutcome::NoFreeServers);

        assert_ne!(url_a, url_b);
        assert_ne!(url_b, url_c);
        assert_ne!(r1, r2);
        assert_ne!(r2, r3);

        strategy.chunk_finished(true, r1.begin, r1.end).unwrap();

        let (url_again, r4) = assigned(strategy.next_chunk());
        assert_eq!(url_again, url_a, "the just-freed mirror is reused first");
        assert_ne!(r4, r1);
        assert_ne!(r4, r2);
        assert_ne!(r4, r3);

        assert_eq!(strategy.next_chunk(), NextChunkOutcome::NoFreeServers);

        // b dies while working on r2; r2 goes back to pending.
        strategy.chunk_finished(false, r2.begin, r2.end).unwrap();
        assert_eq!(strategy.next_chunk(), NextChunkOutcome::NoFreeServers);

        strategy.chunk_finished(true, r4.begin, r4.end).unwrap();

        let (url_reassigned, r5) = assigned(strategy.next_chunk());
        assert_eq!(url_reassigned, url_a);
        assert_eq!(r5, r2, "b's old range is picked up by a");

        assert_eq!(strategy.next_chunk(), NextChunkOutcome::NoFreeServers);

        strategy.chunk_finished(true, r5.begin, r5.end).unwrap();
        assert_eq!(strategy.next_chunk(), NextChunkOutcome::NoFreeServers);

        strategy.chunk_finished(true, r3.begin, r3.end).unwrap();
        assert_eq!(strategy.next_chunk(), NextChunkOutcome::DownloadSucceeded);
        assert_eq!(strategy.next_chunk(), NextChunkOutcome::DownloadSucceeded, "idempotent");
    }

    /// `S2` from the spec: both mirrors die before every chunk lands.
    #[test]
    fn s2_all_mirrors_die_fails() {
        let mirrors = vec![url("a"), url("b")];
        let mut strategy = ChunkStrategy::new(mirrors, 800, 250).unwrap();

        let (_, r1) = assigned(strategy.next_chunk());
        let (_, r2) = assigned(strategy.next_chunk());
        assert_eq!(strategy.next_chunk(), NextChunkOutcome::NoFreeServers);

        strategy.chunk_finished(false, r1.begin, r1.end).unwrap();
        assert_eq!(strategy.next_chunk(), NextChunkOutcome::NoFreeServers);

        strategy.chunk_finished(false, r2.begin, r2.end).unwrap();
        assert_eq!(strategy.next_chunk(), NextChunkOutcome::DownloadFailed);
        assert_eq!(strategy.next_chunk(), NextChunkOutcome::DownloadFailed, "idempotent");
    }

    #[test]
    fn construction_rejects_empty_mirror_list() {
        let err = ChunkStrategy::new(Vec::<Url>::new(), 800, 250).unwrap_err();
        assert_eq!(err, StrategyError::NoMirrors);
    }

    #[test]
    fn construction_rejects_zero_file_size() {
        let err = ChunkStrategy::new(vec![url("a")], 0, 250).unwrap_err();
        assert_eq!(err, StrategyError::InvalidFileSize);
    }

    #[test]
    fn chunk_finished_rejects_unknown_range() {
        let mut strategy = ChunkStrategy::new(vec![url("a")], 800, 250).unwrap();
        let err = strategy.chunk_finished(true, 0, 249).unwrap_err();
        assert_eq!(err, StrategyError::NotInFlight { begin: 0, end: 249 });
    }

    /// Saturating `next_chunk` calls return exactly `min(idle, pending)`
    /// assignments before falling back to `NoFreeServers`/terminal.
    #[test]
    fn saturating_assignment_matches_min_idle_pending() {
        let mirrors = vec![url("a"), url("b"), url("c"), url("d"), url("e")];
        let mut strategy = ChunkStrategy::new(mirrors, 800, 250).unwrap(); // 4 chunks, 5 mirrors

        let mut assignments = 0;
        loop {
            match strategy.next_chunk() {
                NextChunkOutcome::NextChunk { .. } => assignments += 1,
                _ => break,
            }
        }
        assert_eq!(assignments, 4, "min(5 idle mirrors, 4 pending chunks)");
    }

    #[test]
    fn file_size_exact_multiple_of_chunk_size_has_no_short_chunk() {
        let strategy = ChunkStrategy::new(vec![url("a")], 500, 250).unwrap();
        assert_eq!(strategy.chunk_count(), 2);
    }

    #[test]
    fn file_size_smaller_than_chunk_size_is_one_chunk() {
        let strategy = ChunkStrategy::new(vec![url("a")], 5, 250).unwrap();
        assert_eq!(strategy.chunk_count(), 1);
    }
}
