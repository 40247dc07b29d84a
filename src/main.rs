use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use one_brc::{Config, IoMode, Strictness};

#[derive(Debug, Parser)]
#[command(version, about = "Per-station min/mean/max over large measurement files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Aggregate a `station;value` file and print the result
    Stats {
        path: PathBuf,

        /// Worker threads (defaults to available parallelism)
        #[arg(short, long, env = "BRC_WORKERS")]
        workers: Option<usize>,

        /// Per-worker read buffer in bytes
        #[arg(short, long, env = "BRC_BUFFER_SIZE", default_value_t = one_brc::config::DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,

        /// Skip malformed lines instead of aborting
        #[arg(long)]
        permissive: bool,

        /// Read through a memory map instead of per-worker file handles
        #[arg(long)]
        mmap: bool,

        /// Print elapsed time to stderr
        #[arg(long)]
        time: bool,
    },
    /// Write a synthetic measurement file
    Generate {
        /// Number of rows; `_` separators are allowed
        #[arg(value_parser = parse_rows)]
        rows: u64,

        #[arg(short, long, default_value = "measurements.txt")]
        output: PathBuf,

        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn parse_rows(value: &str) -> Result<u64, String> {
    value
        .replace('_', "")
        .parse()
        .map_err(|e| format!("invalid row count {value:?}: {e}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let start = Instant::now();
    match Cli::parse().command {
        Command::Stats {
            path,
            workers,
            buffer_size,
            permissive,
            mmap,
            time,
        } => {
            let mut config = Config::default().with_buffer_size(buffer_size);
            if let Some(workers) = workers {
                config = config.with_workers(workers);
            }
            if permissive {
                config = config.with_strictness(Strictness::Permissive);
            }
            if mmap {
                config = config.with_io_mode(IoMode::Mmap);
            }

            let result = one_brc::run(&path, &config)
                .with_context(|| format!("failed to aggregate {}", path.display()))?;
            println!("{result}");
            if time {
                eprintln!("{:?}", start.elapsed());
            }
        }
        Command::Generate { rows, output, seed } => {
            one_brc::generate::generate_file(&output, rows, seed)
                .with_context(|| format!("failed to write {}", output.display()))?;
            eprintln!(
                "wrote {rows} measurements to {} in {:?}",
                output.display(),
                start.elapsed()
            );
        }
    }
    Ok(())
}
