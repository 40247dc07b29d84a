//! Run configuration. Nothing in the engine reads process state; only
//! [`Config::default`] consults the host for its parallelism.

use std::thread;

use crate::error::{Error, Result};

pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// What to do with a line that does not match `key;value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Abort the run on the first malformed line or number.
    #[default]
    Strict,
    /// Skip malformed lines and numbers, counting them.
    Permissive,
}

/// How workers obtain the bytes of their range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoMode {
    /// Every worker opens its own handle, seeks to its start and reads.
    #[default]
    Buffered,
    /// The file is mapped once and every worker reads its slice of the map.
    Mmap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub workers: usize,
    pub buffer_size: usize,
    pub strictness: Strictness,
    pub io_mode: IoMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
            buffer_size: DEFAULT_BUFFER_SIZE,
            strictness: Strictness::default(),
            io_mode: IoMode::default(),
        }
    }
}

impl Config {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_io_mode(mut self, io_mode: IoMode) -> Self {
        self.io_mode = io_mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig("worker count must be at least 1".into()));
        }
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig("buffer size must be at least 1 byte".into()));
        }
        Ok(())
    }

    /// Worker count actually used for a file of `file_size` bytes.
    pub fn effective_workers(&self, file_size: u64) -> usize {
        let cap = usize::try_from(file_size.max(1)).unwrap_or(usize::MAX);
        self.workers.min(cap).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_workers() {
        let err = Config::default().with_workers(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_buffer() {
        let err = Config::default().with_buffer_size(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn effective_workers_never_exceed_file_size() {
        let config = Config::default().with_workers(8);
        assert_eq!(config.effective_workers(0), 1);
        assert_eq!(config.effective_workers(3), 3);
        assert_eq!(config.effective_workers(1 << 20), 8);
    }

    #[test]
    fn default_is_strict_and_buffered() {
        let config = Config::default();
        assert!(config.workers >= 1);
        assert_eq!(config.strictness, Strictness::Strict);
        assert_eq!(config.io_mode, IoMode::Buffered);
        config.validate().unwrap();
    }
}
