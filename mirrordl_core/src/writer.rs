//! Destinations a [`RangeFetcher`](crate::fetcher::RangeFetcher) can write
//! received bytes into.
use std::sync::{Arc, Mutex};

use crate::errors::FetchError;

/// A sink that accepts bytes at an absolute offset.
///
/// Implementations must be safe to call concurrently from several fetch
/// tasks at once, each writing a disjoint range; no two in-flight chunks
/// ever overlap, so a correct implementation needs no cross-offset locking,
/// only interior mutability for the underlying storage.
pub trait PositionedWriter: Send + Sync + 'static {
    fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), FetchError>;
}

/// An in-memory [`PositionedWriter`], mainly useful for tests and for small
/// downloads where buffering the whole file is acceptable.
#[derive(Clone, Default)]
pub struct VecWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl VecWriter {
    pub fn with_capacity(len: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vec![0u8; len])),
        }
    }

    /// Consumes the writer, returning the buffered bytes. Panics if other
    /// clones of this writer are still alive.
    pub fn into_inner(self) -> Vec<u8> {
        Arc::try_unwrap(self.inner)
            .unwrap_or_else(|_| panic!("VecWriter has outstanding clones"))
            .into_inner()
            .unwrap()
    }

    /// Copies the current contents without consuming the writer.
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }
}

impl PositionedWriter for VecWriter {
    fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), FetchError> {
        let mut buf = self.inner.lock().unwrap();
        let offset = offset as usize;
        let end = offset
            .checked_add(data.len())
            .ok_or_else(|| FetchError::Io("offset overflow".to_string()))?;
        if end > buf.len() {
            buf.resize(end, 0);
        }
        buf[offset..end].copy_from_slice(data);
        Ok(())
    }
}
