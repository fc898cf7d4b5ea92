//! Static configuration of the shaping hierarchy.

/// Describes the link the hierarchy is installed on.
///
/// The interface and rate cap apply to every class; neither varies per zone.
#[derive(Debug, Clone)]
pub struct ShaperConfig {
    /// Outgoing interface to shape.
    pub interface: String,
    /// Nominal link rate cap in mbit/s, applied to every class.
    pub rate_mbit: u64,
    /// Perturbation interval of the default fair queue, in seconds.
    pub perturb_secs: u32,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self { interface: "eth0".to_string(), rate_mbit: 1000, perturb_secs: 10 }
    }
}
