//! Runtime configuration.
//!
//! Mirrors the teacher crate's `Config` in spirit: a small, `Clone`able,
//! validated struct with builder style setters and optional loading from
//! environment variables prefixed `MIRRORDL_`.
use std::time::Duration;

use crate::errors::StrategyError;

const ENV_PREFIX: &str = "MIRRORDL";

/// Default size of a chunk handed out by [`ChunkStrategy`](crate::strategy::ChunkStrategy)
/// when the caller does not specify one explicitly.
pub const DEFAULT_CHUNK_SIZE_BYTES: u64 = 2 * 1024 * 1024;

/// Configuration shared by every download started through the public factory
/// functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Size in bytes of a single chunk/range, unless overridden per call.
    pub chunk_size_bytes: u64,
    /// Maximum number of redirects a [`RangeFetcher`](crate::fetcher::RangeFetcher)
    /// implementation should follow before giving up on a mirror.
    pub max_redirects: u32,
    /// Timeout for a single HTTP request (connect + whole response).
    pub request_timeout: Duration,
    /// Timeout for establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            max_redirects: 10,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("mirrordl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    pub fn chunk_size_bytes(mut self, value: u64) -> Self {
        self.chunk_size_bytes = value;
        self
    }

    pub fn max_redirects(mut self, value: u32) -> Self {
        self.max_redirects = value;
        self
    }

    pub fn request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn connect_timeout(mut self, value: Duration) -> Self {
        self.connect_timeout = value;
        self
    }

    pub fn user_agent<T: Into<String>>(mut self, value: T) -> Self {
        self.user_agent = value.into();
        self
    }

    /// Overlay values found in `MIRRORDL_*` environment variables onto this
    /// config. Unset variables leave the current value untouched; a variable
    /// that fails to parse is ignored (the rest are still applied) since this
    /// is meant for optional operator tuning, not strict validation; use
    /// [`Config::validated`] for that.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_u64("CHUNK_SIZE_BYTES") {
            self.chunk_size_bytes = v;
        }
        if let Some(v) = env_u64("MAX_REDIRECTS") {
            self.max_redirects = v as u32;
        }
        if let Some(v) = env_u64("REQUEST_TIMEOUT_SECS") {
            self.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("CONNECT_TIMEOUT_SECS") {
            self.connect_timeout = Duration::from_secs(v);
        }
        self
    }

    /// Checks the config is internally consistent, returning it unchanged if so.
    pub fn validated(self) -> Result<Self, StrategyError> {
        if self.chunk_size_bytes == 0 {
            return Err(StrategyError::InvalidChunkSize);
        }
        Ok(self)
    }
}

fn env_u64(suffix: &str) -> Option<u64> {
    let var_name = format!("{ENV_PREFIX}_{suffix}");
    std::env::var(var_name).ok()?.parse().ok()
}
