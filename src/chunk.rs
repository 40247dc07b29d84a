//! Static partitioning of the input into byte ranges and the buffered
//! scanner each worker runs over its range.
//!
//! Range boundaries almost never fall on line boundaries. A worker other
//! than the first exports everything before its first newline as its
//! *head*; a worker other than the last exports everything after its last
//! newline as its *tail*. Neither is parsed by the worker; the merge stage
//! joins `tail(i) + head(i + 1)` into the one line that straddles the
//! boundary.

use std::io::{ErrorKind, Read};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use memchr::{memchr, memrchr};

use crate::error::{Error, Result};

/// One worker's slice of the input, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub last: bool,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    /// The range as slice indices, or `None` if an offset does not fit in
    /// `usize` (files over 4 GiB on 32-bit targets).
    pub fn to_usize_range(&self) -> Option<Range<usize>> {
        Some(usize::try_from(self.start).ok()?..usize::try_from(self.end).ok()?)
    }
}

/// Splits `[0, file_size)` into `workers` contiguous ranges whose widths
/// differ by at most one byte; the remainder goes to the leading ranges.
pub fn plan(file_size: u64, workers: usize) -> Vec<ByteRange> {
    let workers = workers.max(1);
    let base = file_size / workers as u64;
    let remainder = file_size % workers as u64;

    let mut start = 0;
    (0..workers)
        .map(|index| {
            let width = base + u64::from((index as u64) < remainder);
            let range = ByteRange {
                index,
                start,
                end: start + width,
                last: index == workers - 1,
            };
            start = range.end;
            range
        })
        .collect()
}

/// Partial lines a worker could not parse on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragments {
    pub range: ByteRange,
    /// Bytes before the first newline of the range. Always empty for range 0.
    pub head: Vec<u8>,
    /// The range held no newline: every byte of it is in `head`, and the
    /// line it belongs to continues into the next range.
    pub spans_range: bool,
    /// Bytes after the last newline of the range. Always empty for the last
    /// range, which parses its own unterminated final line.
    pub tail: Vec<u8>,
    /// Absolute offset of `tail[0]`.
    pub tail_offset: u64,
}

/// Reads exactly the bytes of `range` from `reader`, which must be
/// positioned at `range.start`, passing batches of complete lines to `sink`
/// together with the absolute offset of each batch's first byte.
///
/// Stops early with [`Error::Cancelled`] once `cancel` is raised.
pub fn scan_range<R, F>(
    mut reader: R,
    range: ByteRange,
    buffer_size: usize,
    cancel: &AtomicBool,
    mut sink: F,
) -> Result<Fragments>
where
    R: Read,
    F: FnMut(&[u8], u64) -> Result<()>,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut remaining = range.len();
    let mut position = range.start;

    let mut head_pending = !range.is_first();
    let mut head = Vec::new();
    let mut carry = Vec::new();
    let mut carry_offset = range.start;

    while remaining > 0 {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let want = remaining.min(buf.len() as u64) as usize;
        let read = match reader.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(Error::io(
                    ErrorKind::UnexpectedEof.into(),
                    "reading range",
                    position,
                ))
            }
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io(e, "reading range", position)),
        };

        let mut data = &buf[..read];
        let mut data_offset = position;
        remaining -= read as u64;
        position += read as u64;

        if head_pending {
            let Some(newline) = memchr(b'\n', data) else {
                head.extend_from_slice(data);
                continue;
            };
            head.extend_from_slice(&data[..newline]);
            head_pending = false;
            data = &data[newline + 1..];
            data_offset += newline as u64 + 1;
        }

        let Some(last_newline) = memrchr(b'\n', data) else {
            if carry.is_empty() {
                carry_offset = data_offset;
            }
            carry.extend_from_slice(data);
            continue;
        };

        let mut lines_start = 0;
        if !carry.is_empty() {
            // a newline exists in `data`, so the carried fragment ends here
            let first_newline = memchr(b'\n', data).unwrap_or(last_newline);
            carry.extend_from_slice(&data[..first_newline]);
            sink(&carry, carry_offset)?;
            carry.clear();
            lines_start = first_newline + 1;
        }
        if lines_start <= last_newline {
            sink(
                &data[lines_start..last_newline],
                data_offset + lines_start as u64,
            )?;
        }

        carry.extend_from_slice(&data[last_newline + 1..]);
        carry_offset = data_offset + last_newline as u64 + 1;
    }

    // end of file terminates the final line
    if range.last && !head_pending && !carry.is_empty() {
        sink(&carry, carry_offset)?;
        carry.clear();
    }

    Ok(Fragments {
        range,
        head,
        spans_range: head_pending,
        tail: carry,
        tail_offset: carry_offset,
    })
}
