//! Inter-zone latency emulation for benchmark hosts, built on Linux traffic
//! control.
//!
//! Every participating host is placed into a zone by its position in a shared
//! host list; traffic towards each remote zone is delayed according to a
//! zone-to-zone latency matrix, while traffic to anyone else rides an
//! unshaped default path.

pub mod command;
pub mod config;
pub mod hosts;
pub mod matrix;
pub mod tc;
