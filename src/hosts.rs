//! The ordered list of participating hosts and their zone placement.
//!
//! Hosts carry no topology information of their own: a host's zone is fully
//! determined by its first position in the list, modulo the number of zones.

use std::{fs, io, net::IpAddr, path::Path};

use crate::matrix::Zone;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid address {value:?} on line {line}")]
    InvalidAddress { line: usize, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Ordered host addresses.
///
/// Order is significant (it determines zone placement) and duplicates are
/// kept; a duplicated address resolves to its first occurrence everywhere a
/// position is needed.
#[derive(Debug, Clone)]
pub struct HostList {
    addrs: Vec<IpAddr>,
}

impl HostList {
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Parses one address per line, skipping blank lines.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut addrs = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let addr: IpAddr = line.parse().map_err(|_| Error::InvalidAddress {
                line: index + 1,
                value: line.to_string(),
            })?;
            addrs.push(addr);
        }
        Ok(Self { addrs })
    }

    /// First position of `addr` in the list.
    pub fn position(&self, addr: IpAddr) -> Option<usize> {
        self.addrs.iter().position(|a| *a == addr)
    }

    /// Zone of `addr`: the zone at its first position, modulo the number of
    /// zones. Two hosts landing in the same zone is expected, not an error.
    pub fn zone_of<'z>(&self, zones: &'z [Zone], addr: IpAddr) -> Option<&'z Zone> {
        if zones.is_empty() {
            return None;
        }
        self.position(addr).map(|index| &zones[index % zones.len()])
    }

    pub fn iter(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.addrs.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }
}
