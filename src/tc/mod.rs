//! Traffic control: the shaping hierarchy and its application.
//!
//! Traffic to every peer in a remote zone is delayed through that zone's own
//! HTB class and netem qdisc, while anything unmatched takes the default
//! class with plain fair queueing:
//!
//! ```text
//! htb root (1:), default -> 1:10
//!   └── class 1:1 (rate cap)
//!         ├── class 1:10 ── sfq 10:      unmatched traffic, no delay
//!         ├── class 1:11 ── netem 11:    first shaped zone
//!         └── class 1:12 ── netem 12:    second shaped zone, ...
//! filter: u32 dst <peer> -> 1:<zone class>
//! ```
//!
//! [`plan`] derives the ordered operation sequence for one host, [`shaper`]
//! renders each operation into a `tc` invocation and applies them in order.

pub mod handle;
pub mod plan;
pub mod shaper;
