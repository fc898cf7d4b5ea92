//! The zone-to-zone latency matrix.
//!
//! Parsed from comma-separated text: the first row names the zones (its first
//! cell is ignored), and each following row is a zone name plus one latency
//! in milliseconds per header column. The header order is canonical wherever
//! zones are enumerated.

use std::{fs, io, path::Path};

use rustc_hash::FxHashMap;

/// A named latency-equivalence class of hosts.
pub type Zone = String;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("matrix header declares no zones")]
    NoZones,
    #[error("row on line {line} has {got} latency cells, expected {expected}")]
    ShortRow { line: usize, got: usize, expected: usize },
    #[error("invalid latency {value:?} on line {line}")]
    InvalidLatency { line: usize, value: String },
    #[error("no latency entry for zone pair ({from}, {to})")]
    MissingEntry { from: Zone, to: Zone },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Directional latency between zones, in milliseconds.
///
/// Symmetry is neither assumed nor checked; a lookup for a pair the file
/// never defined fails at use.
#[derive(Debug, Clone)]
pub struct LatencyMatrix {
    zones: Vec<Zone>,
    entries: FxHashMap<Zone, FxHashMap<Zone, u64>>,
}

impl LatencyMatrix {
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut lines = contents.lines().enumerate().filter(|(_, line)| !line.trim().is_empty());

        let Some((_, header)) = lines.next() else { return Err(Error::NoZones) };
        let zones: Vec<Zone> = header.split(',').skip(1).map(|cell| cell.trim().to_string()).collect();
        if zones.is_empty() {
            return Err(Error::NoZones);
        }

        let mut entries: FxHashMap<Zone, FxHashMap<Zone, u64>> = FxHashMap::default();
        for (index, line) in lines {
            let mut cells = line.split(',').map(str::trim);
            let Some(row_zone) = cells.next() else { continue };
            let values: Vec<&str> = cells.collect();
            if values.len() < zones.len() {
                return Err(Error::ShortRow {
                    line: index + 1,
                    got: values.len(),
                    expected: zones.len(),
                });
            }

            // Cells past the header width are ignored, like the extra first
            // header cell.
            let mut row = FxHashMap::default();
            for (zone, value) in zones.iter().zip(values) {
                let ms = value.parse::<u64>().map_err(|_| Error::InvalidLatency {
                    line: index + 1,
                    value: value.to_string(),
                })?;
                row.insert(zone.clone(), ms);
            }
            entries.insert(row_zone.to_string(), row);
        }

        Ok(Self { zones, entries })
    }

    /// Canonical zone order, as declared by the header.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Latency from `from` to `to`, in milliseconds.
    pub fn latency(&self, from: &str, to: &str) -> Result<u64> {
        self.entries.get(from).and_then(|row| row.get(to)).copied().ok_or_else(|| {
            Error::MissingEntry { from: from.to_string(), to: to.to_string() }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_order_and_entries() {
        let matrix = LatencyMatrix::parse(",us-east,eu-west,ap-south\nus-east,0,80,190\neu-west,80,0,120\nap-south,190,120,0\n").unwrap();

        assert_eq!(matrix.zones(), ["us-east", "eu-west", "ap-south"]);
        assert_eq!(matrix.latency("us-east", "ap-south").unwrap(), 190);
        assert_eq!(matrix.latency("ap-south", "us-east").unwrap(), 190);
        assert_eq!(matrix.latency("eu-west", "eu-west").unwrap(), 0);
    }

    #[test]
    fn asymmetric_entries_are_kept_directional() {
        let matrix = LatencyMatrix::parse(",a,b\na,0,10\nb,99,0\n").unwrap();

        assert_eq!(matrix.latency("a", "b").unwrap(), 10);
        assert_eq!(matrix.latency("b", "a").unwrap(), 99);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let matrix = LatencyMatrix::parse("\n,a,b\n\na,0,10\nb,10,0\n\n").unwrap();
        assert_eq!(matrix.zones(), ["a", "b"]);
    }

    #[test]
    fn empty_header_is_an_error() {
        assert!(matches!(LatencyMatrix::parse(""), Err(Error::NoZones)));
        assert!(matches!(LatencyMatrix::parse("ignored\n"), Err(Error::NoZones)));
    }

    #[test]
    fn short_row_is_an_error() {
        let err = LatencyMatrix::parse(",a,b\na,0\n").unwrap_err();
        assert!(matches!(err, Error::ShortRow { line: 2, got: 1, expected: 2 }));
    }

    #[test]
    fn non_integer_latency_is_an_error() {
        let err = LatencyMatrix::parse(",a,b\na,0,fast\n").unwrap_err();
        assert!(matches!(err, Error::InvalidLatency { line: 2, .. }));
    }

    #[test]
    fn negative_latency_is_an_error() {
        let err = LatencyMatrix::parse(",a,b\na,0,-5\n").unwrap_err();
        assert!(matches!(err, Error::InvalidLatency { line: 2, .. }));
    }

    #[test]
    fn missing_pair_fails_at_lookup() {
        let matrix = LatencyMatrix::parse(",a,b\nb,10,0\n").unwrap();
        let err = matrix.latency("a", "b").unwrap_err();
        assert!(matches!(err, Error::MissingEntry { .. }));
    }
}
