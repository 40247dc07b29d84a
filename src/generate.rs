//! Writes synthetic `station;temperature` measurement files.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::decimal::FixedDecimal;

/// (station, mean temperature)
pub const STATIONS: &[(&str, f64)] = &[
    ("Abha", 18.0),
    ("Abéché", 29.4),
    ("Accra", 26.4),
    ("Addis Ababa", 16.0),
    ("Adelaide", 17.3),
    ("Anadyr", -6.9),
    ("Anchorage", 2.8),
    ("Athens", 19.2),
    ("Baghdad", 22.8),
    ("Bangkok", 28.6),
    ("Berlin", 10.3),
    ("Bouaké", 26.0),
    ("Cabo San Lucas", 23.9),
    ("Cairo", 21.4),
    ("Chișinău", 10.2),
    ("Dikson", -11.1),
    ("Dublin", 9.8),
    ("Flores, Petén", 26.4),
    ("Gjoa Haven", -14.4),
    ("Hamburg", 9.7),
    ("Helsinki", 5.9),
    ("Hong Kong", 23.3),
    ("Iqaluit", -9.3),
    ("Istanbul", 13.9),
    ("Kyoto", 15.8),
    ("Lhasa", 7.6),
    ("Lima", 19.2),
    ("Lomé", 26.9),
    ("Lviv", 7.8),
    ("Malé", 28.0),
    ("Mek'ele", 22.7),
    ("Mexico City", 17.5),
    ("Nuuk", -1.4),
    ("Ouagadougou", 28.3),
    ("Reykjavík", 4.3),
    ("São Paulo", 19.7),
    ("Thiès", 24.0),
    ("Tokyo", 15.4),
    ("Tromsø", 2.9),
    ("Ulaanbaatar", -0.4),
    ("Ürümqi", 7.4),
    ("Washington, D.C.", 14.6),
    ("Wrocław", 9.6),
    ("Yakutsk", -8.8),
    ("Yaoundé", 23.8),
    ("Zürich", 9.3),
];

const STD_DEV: f64 = 10.0;
const LIMIT_TENTHS: i64 = 999;
const WRITE_BUFFER: usize = 4 * 1024 * 1024;

/// Writes `rows` measurement lines. The same `seed` always produces the
/// same output.
pub fn generate<W: Write>(writer: W, rows: u64, seed: Option<u64>) -> io::Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let distributions = STATIONS
        .iter()
        .map(|&(_, mean)| Normal::new(mean, STD_DEV))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))?;

    let mut writer = BufWriter::with_capacity(WRITE_BUFFER, writer);
    for _ in 0..rows {
        let station = rng.gen_range(0..STATIONS.len());
        let sample = distributions[station].sample(&mut rng);
        let tenths = ((sample * 10.0).round() as i64).clamp(-LIMIT_TENTHS, LIMIT_TENTHS);
        writeln!(
            writer,
            "{};{}",
            STATIONS[station].0,
            FixedDecimal::from_tenths(tenths)
        )?;
    }
    writer.flush()
}

pub fn generate_file(path: impl AsRef<Path>, rows: u64, seed: Option<u64>) -> io::Result<()> {
    generate(File::create(path)?, rows, seed)
}
