//! Per-key min/mean/max over large `key;value` files.
//!
//! The input is split into one byte range per worker. Each worker scans its
//! range into a private [`PartialMap`]; partials are merged after a join and
//! the lines cut by range boundaries are rebuilt and folded in last. Values
//! are summed as exact integer tenths.
//!
//! ```no_run
//! let config = one_brc::Config::default().with_workers(8);
//! println!("{}", one_brc::run("measurements.txt", &config)?);
//! # Ok::<(), one_brc::Error>(())
//! ```

pub mod aggregate;
pub mod chunk;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod format;
pub mod generate;
pub mod merge;

pub use aggregate::{Aggregator, PartialMap, StationStats};
pub use config::{Config, IoMode, Strictness};
pub use decimal::{FixedDecimal, ParseDecimalError};
pub use engine::{aggregate_file, run, Run, RunSummary};
pub use error::{Error, Result};
pub use format::format_results;
pub use merge::FinalMap;
