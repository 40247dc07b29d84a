//! Error type shared by every stage of a run.

use std::io;

use thiserror::Error;

use crate::decimal::ParseDecimalError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal conditions that abort an aggregation run.
#[derive(Debug, Error)]
pub enum Error {
    /// Open, seek, map or read failure other than a clean end of file.
    #[error("I/O failure while {operation} at byte {offset}")]
    Io {
        #[source]
        source: io::Error,
        operation: &'static str,
        offset: u64,
    },

    /// The value after the delimiter is not `-?[0-9]+\.[0-9]`.
    #[error("malformed number {token:?} for key {key:?} at byte {offset}")]
    MalformedNumber {
        token: String,
        key: String,
        offset: u64,
        #[source]
        source: ParseDecimalError,
    },

    /// A non-empty line without a `;` delimiter.
    #[error("malformed line {line:?} at byte {offset}: missing ';' delimiter")]
    MalformedLine { line: String, offset: u64 },

    /// The exact sum of a key's values no longer fits in an `i64`. `offset`
    /// is the line that overflowed it, or `None` when merging partials did.
    #[error("sum of values for key {key:?} overflows{}", at_byte(.offset))]
    SumOverflow { key: String, offset: Option<u64> },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker {0} panicked")]
    WorkerPanicked(usize),

    /// Returned by workers that stopped because another worker failed.
    #[error("run cancelled")]
    Cancelled,
}

impl Error {
    pub fn io(source: io::Error, operation: &'static str, offset: u64) -> Self {
        Self::Io {
            source,
            operation,
            offset,
        }
    }

    pub(crate) fn malformed_line(line: &[u8], offset: u64) -> Self {
        Self::MalformedLine {
            line: String::from_utf8_lossy(line).into_owned(),
            offset,
        }
    }

    pub(crate) fn malformed_number(
        key: &[u8],
        token: &[u8],
        offset: u64,
        source: ParseDecimalError,
    ) -> Self {
        Self::MalformedNumber {
            token: String::from_utf8_lossy(token).into_owned(),
            key: String::from_utf8_lossy(key).into_owned(),
            offset,
            source,
        }
    }

    pub(crate) fn sum_overflow(key: &[u8], offset: Option<u64>) -> Self {
        Self::SumOverflow {
            key: String::from_utf8_lossy(key).into_owned(),
            offset,
        }
    }

    /// Offending byte offset, for errors tied to a position in the input.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Io { offset, .. }
            | Self::MalformedNumber { offset, .. }
            | Self::MalformedLine { offset, .. } => Some(*offset),
            Self::SumOverflow { offset, .. } => *offset,
            _ => None,
        }
    }
}

fn at_byte(offset: &Option<u64>) -> String {
    offset.map_or_else(String::new, |offset| format!(" at byte {offset}"))
}
