//! Derivation of the ordered shaping operation sequence.

use std::net::IpAddr;

use crate::config::ShaperConfig;
use crate::hosts::HostList;
use crate::matrix::{self, LatencyMatrix};
use crate::tc::handle::{TcHandle, DEFAULT_CLASS, FIRST_ZONE_CLASS, TOP_CLASS};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("local address {0} not present in the host list")]
    AddressNotFound(IpAddr),
    #[error("matrix error: {0}")]
    Matrix(#[from] matrix::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A single step in building the shaping hierarchy.
///
/// The ordered sequence of these is the sole artifact of rule derivation: it
/// is rebuilt from scratch on every run, consumed once by an
/// [`Executor`](crate::tc::shaper::Executor), and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapingOp {
    /// Remove any existing root qdisc. Allowed to fail, since the interface
    /// may carry no previous hierarchy.
    DeleteRoot,
    /// Install the HTB root qdisc, directing unmatched traffic to the class
    /// with minor `default`.
    AddRootQueue { default: u16 },
    /// Install an HTB class capped at the nominal link rate.
    AddClass { parent: TcHandle, class: TcHandle, rate_mbit: u64 },
    /// Attach a stochastic fair queue to a class.
    AddFairQueue { class: TcHandle, perturb_secs: u32 },
    /// Attach a netem qdisc delaying traffic through a class, with jitter
    /// drawn from a normal distribution.
    AddDelayQueue { class: TcHandle, delay_ms: u64, jitter_ms: u64 },
    /// Route traffic addressed to `destination` into a class.
    AddDestinationFilter { class: TcHandle, destination: IpAddr },
}

/// Jitter applied to a netem delay: one twentieth of the delay, truncated,
/// floored to 1 ms so short delays still vary.
pub(crate) fn jitter_ms(delay_ms: u64) -> u64 {
    (delay_ms / 20).max(1)
}

/// Builds the full operation sequence for this host.
///
/// The first five operations are always the same reset/root/default preamble.
/// Zones are then visited in header order; each zone with at least one peer
/// takes the next class minor, starting at [`FIRST_ZONE_CLASS`]. A zone whose
/// latency from the local zone is zero emits no operations but still takes a
/// minor, so the numbering of later zones is independent of which latencies
/// happen to be zero.
pub fn build_plan(
    config: &ShaperConfig,
    matrix: &LatencyMatrix,
    hosts: &HostList,
    local: IpAddr,
) -> Result<Vec<ShapingOp>> {
    let zones = matrix.zones();
    let local_zone = hosts.zone_of(zones, local).ok_or(Error::AddressNotFound(local))?;

    let mut ops = vec![
        ShapingOp::DeleteRoot,
        ShapingOp::AddRootQueue { default: DEFAULT_CLASS },
        ShapingOp::AddClass {
            parent: TcHandle::ROOT,
            class: TcHandle::class(TOP_CLASS),
            rate_mbit: config.rate_mbit,
        },
        ShapingOp::AddClass {
            parent: TcHandle::class(TOP_CLASS),
            class: TcHandle::class(DEFAULT_CLASS),
            rate_mbit: config.rate_mbit,
        },
        ShapingOp::AddFairQueue {
            class: TcHandle::class(DEFAULT_CLASS),
            perturb_secs: config.perturb_secs,
        },
    ];

    let mut minor = FIRST_ZONE_CLASS;
    for zone in zones {
        let peers: Vec<IpAddr> = hosts
            .iter()
            .filter(|addr| *addr != local)
            .filter(|addr| hosts.zone_of(zones, *addr) == Some(zone))
            .collect();

        if peers.is_empty() {
            continue;
        }

        let latency = matrix.latency(local_zone, zone)?;
        if latency > 0 {
            let class = TcHandle::class(minor);
            ops.push(ShapingOp::AddClass {
                parent: TcHandle::class(TOP_CLASS),
                class,
                rate_mbit: config.rate_mbit,
            });
            ops.push(ShapingOp::AddDelayQueue {
                class,
                delay_ms: latency,
                jitter_ms: jitter_ms(latency),
            });
            ops.extend(
                peers
                    .into_iter()
                    .map(|destination| ShapingOp::AddDestinationFilter { class, destination }),
            );
        }
        // A zero-latency zone keeps its minor: its traffic falls through to
        // the default class, but later zones must not shift down.
        minor += 1;
    }

    Ok(ops)
}
