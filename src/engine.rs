//! Fan-out/fan-in pipeline: one worker thread per byte range, a join, then
//! the merge and the stitching of boundary lines.

use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use log::{debug, info};
use memmap2::Mmap;

use crate::aggregate::{Aggregator, PartialMap};
use crate::chunk::{plan, scan_range, ByteRange, Fragments};
use crate::config::{Config, IoMode};
use crate::error::{Error, Result};
use crate::format::format_results;
use crate::merge::{merge, merge_all, stitch, FinalMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub file_size: u64,
    pub workers: usize,
    pub stations: usize,
    /// Lines rebuilt from range-boundary fragments.
    pub boundaries: usize,
    /// Malformed lines dropped in permissive mode.
    pub skipped: u64,
}

#[derive(Debug)]
pub struct Run {
    pub map: FinalMap,
    pub summary: RunSummary,
}

struct WorkerOutput {
    partial: PartialMap,
    fragments: Fragments,
    skipped: u64,
}

/// Aggregates the file at `path` and returns the formatted result.
pub fn run(path: impl AsRef<Path>, config: &Config) -> Result<String> {
    let run = aggregate_file(path, config)?;
    Ok(format_results(&run.map))
}

pub fn aggregate_file(path: impl AsRef<Path>, config: &Config) -> Result<Run> {
    config.validate()?;
    let path = path.as_ref();

    let file = File::open(path).map_err(|e| Error::io(e, "opening input", 0))?;
    let file_size = file
        .metadata()
        .map_err(|e| Error::io(e, "reading metadata", 0))?
        .len();

    let workers = config.effective_workers(file_size);
    let ranges = plan(file_size, workers);
    debug!(
        "{}: {file_size} bytes across {workers} ranges ({:?} IO, {} byte buffers)",
        path.display(),
        config.io_mode,
        config.buffer_size
    );

    let outputs = match config.io_mode {
        IoMode::Buffered => fan_out(&ranges, config, |range| {
            let mut file =
                File::open(path).map_err(|e| Error::io(e, "opening input", range.start))?;
            file.seek(SeekFrom::Start(range.start))
                .map_err(|e| Error::io(e, "seeking", range.start))?;
            Ok(file.take(range.len()))
        })?,
        IoMode::Mmap => {
            // mapping an empty file fails on some platforms
            let mmap = if file_size == 0 {
                None
            } else {
                // SAFETY: the input is opened read-only and assumed not to be
                // modified for the duration of the run.
                Some(unsafe { Mmap::map(&file) }.map_err(|e| Error::io(e, "mapping input", 0))?)
            };
            let bytes: &[u8] = mmap.as_deref().unwrap_or_default();
            fan_out(&ranges, config, |range| {
                let slice = range.to_usize_range().ok_or_else(|| {
                    Error::io(
                        io::Error::new(ErrorKind::InvalidInput, "range exceeds address space"),
                        "mapping input",
                        range.start,
                    )
                })?;
                Ok(&bytes[slice])
            })?
        }
    };

    let mut partials = Vec::with_capacity(outputs.len());
    let mut fragments = Vec::with_capacity(outputs.len());
    let mut skipped = 0;
    for output in outputs {
        partials.push(output.partial);
        fragments.push(output.fragments);
        skipped += output.skipped;
    }

    let mut leftovers = Aggregator::new(config.strictness);
    let boundaries = stitch(&fragments, &mut leftovers)?;
    let (leftover_map, leftover_skipped) = leftovers.into_parts();
    let map = FinalMap::from(merge(merge_all(partials)?, leftover_map)?);

    let summary = RunSummary {
        file_size,
        workers,
        stations: map.len(),
        boundaries,
        skipped: skipped + leftover_skipped,
    };
    info!(
        "aggregated {} stations from {} bytes with {} workers ({} boundary lines, {} skipped)",
        summary.stations, summary.file_size, summary.workers, summary.boundaries, summary.skipped
    );
    Ok(Run { map, summary })
}

/// Runs one scanner thread per range and collects their outputs in range
/// order. The first failure raises the shared cancellation flag; the error
/// returned is always that root cause.
fn fan_out<R, F>(ranges: &[ByteRange], config: &Config, open: F) -> Result<Vec<WorkerOutput>>
where
    R: Read,
    F: Fn(&ByteRange) -> Result<R> + Sync,
{
    let cancel = AtomicBool::new(false);
    let (tx, rx) = crossbeam_channel::bounded(ranges.len());

    thread::scope(|scope| {
        let handles: Vec<_> = ranges
            .iter()
            .map(|range| {
                let tx = tx.clone();
                let (open, cancel) = (&open, &cancel);
                scope.spawn(move || {
                    let result = open(range)
                        .and_then(|reader| scan_worker(reader, *range, config, cancel));
                    if result.is_err() {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    let _ = tx.send((range.index, result));
                })
            })
            .collect();
        drop(tx);

        let mut outputs: Vec<Option<WorkerOutput>> = ranges.iter().map(|_| None).collect();
        let mut failure = None;
        for (index, result) in rx.iter() {
            match result {
                Ok(output) => outputs[index] = Some(output),
                Err(Error::Cancelled) => {}
                Err(error) => {
                    cancel.store(true, Ordering::Relaxed);
                    if failure.is_none() {
                        failure = Some(error);
                    }
                }
            }
        }

        for (index, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() && failure.is_none() {
                failure = Some(Error::WorkerPanicked(index));
            }
        }
        if let Some(error) = failure {
            return Err(error);
        }

        outputs
            .into_iter()
            .enumerate()
            .map(|(index, output)| output.ok_or(Error::WorkerPanicked(index)))
            .collect()
    })
}

fn scan_worker<R: Read>(
    reader: R,
    range: ByteRange,
    config: &Config,
    cancel: &AtomicBool,
) -> Result<WorkerOutput> {
    let mut aggregator = Aggregator::new(config.strictness);
    let fragments = scan_range(reader, range, config.buffer_size, cancel, |batch, offset| {
        aggregator.feed(batch, offset)
    })?;
    let (partial, skipped) = aggregator.into_parts();

    debug!(
        "worker {} finished [{}, {}): {} stations, head {} bytes, tail {} bytes{}",
        range.index,
        range.start,
        range.end,
        partial.len(),
        fragments.head.len(),
        fragments.tail.len(),
        if fragments.spans_range { ", no newline" } else { "" }
    );
    Ok(WorkerOutput {
        partial,
        fragments,
        skipped,
    })
}
