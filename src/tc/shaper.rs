//! Rendering shaping operations into `tc` invocations and applying them.

use std::net::IpAddr;
use std::process::Command;

use crate::command::{self, Runner};
use crate::config::ShaperConfig;
use crate::tc::handle::TcHandle;
use crate::tc::plan::ShapingOp;

impl ShapingOp {
    /// Renders this operation as one `tc` invocation on `interface`.
    ///
    /// Every value is passed as a discrete argument; nothing is ever joined
    /// into a shell string.
    pub fn to_command(&self, interface: &str) -> Command {
        let mut cmd = Command::new("tc");
        match self {
            Self::DeleteRoot => {
                cmd.args(["qdisc", "del", "dev", interface, "root"]);
            }
            Self::AddRootQueue { default } => {
                cmd.args(["qdisc", "add", "dev", interface, "root", "handle", "1:"])
                    .args(["htb", "default"])
                    .arg(default.to_string());
            }
            Self::AddClass { parent, class, rate_mbit } => {
                cmd.args(["class", "add", "dev", interface, "parent"])
                    .arg(parent.to_string())
                    .arg("classid")
                    .arg(class.to_string())
                    .args(["htb", "rate"])
                    .arg(format!("{rate_mbit}mbit"));
            }
            Self::AddFairQueue { class, perturb_secs } => {
                cmd.args(["qdisc", "add", "dev", interface, "parent"])
                    .arg(class.to_string())
                    .arg("handle")
                    .arg(TcHandle::qdisc(class.minor).to_string())
                    .args(["sfq", "perturb"])
                    .arg(perturb_secs.to_string());
            }
            Self::AddDelayQueue { class, delay_ms, jitter_ms } => {
                cmd.args(["qdisc", "add", "dev", interface, "parent"])
                    .arg(class.to_string())
                    .arg("handle")
                    .arg(TcHandle::qdisc(class.minor).to_string())
                    .args(["netem", "delay"])
                    .arg(format!("{delay_ms}ms"))
                    .arg(format!("{jitter_ms}ms"))
                    .args(["distribution", "normal"]);
            }
            Self::AddDestinationFilter { class, destination } => {
                let (protocol, matcher, prefix) = match destination {
                    IpAddr::V4(_) => ("ip", "ip", 32),
                    IpAddr::V6(_) => ("ipv6", "ip6", 128),
                };
                cmd.args(["filter", "add", "dev", interface, "protocol", protocol])
                    .args(["parent", "1:", "prio", "1", "u32", "match", matcher, "dst"])
                    .arg(format!("{destination}/{prefix}"))
                    .arg("flowid")
                    .arg(class.to_string());
            }
        }
        cmd
    }
}

/// Flattens a command into the form it would have on a shell prompt.
fn format_command(cmd: &Command) -> String {
    let mut rendered = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

/// Applies shaping operations one at a time.
///
/// Kept narrow so rule derivation can be exercised against a recording
/// implementation without privileged access to the host.
pub trait Executor {
    fn apply(&mut self, op: &ShapingOp) -> command::Result<()>;
}

/// Applies operations by invoking the system `tc` utility.
#[derive(Debug)]
pub struct TcExecutor {
    config: ShaperConfig,
}

impl TcExecutor {
    pub fn new(config: ShaperConfig) -> Self {
        Self { config }
    }
}

impl Executor for TcExecutor {
    fn apply(&mut self, op: &ShapingOp) -> command::Result<()> {
        Runner::run(op.to_command(&self.config.interface))?;
        Ok(())
    }
}

/// Prints the rendered commands without touching the host.
#[derive(Debug)]
pub struct DryRunExecutor {
    config: ShaperConfig,
}

impl DryRunExecutor {
    pub fn new(config: ShaperConfig) -> Self {
        Self { config }
    }
}

impl Executor for DryRunExecutor {
    fn apply(&mut self, op: &ShapingOp) -> command::Result<()> {
        println!("{}", format_command(&op.to_command(&self.config.interface)));
        Ok(())
    }
}

/// Applies every operation in order, stopping at the first failure.
///
/// Ordering is load-bearing: the root hierarchy must exist before classes are
/// attached, classes before queues, queues before filters. The leading
/// [`ShapingOp::DeleteRoot`] is idempotent cleanup and the one operation
/// whose failure is swallowed; the interface usually carries no prior
/// hierarchy to delete.
pub fn apply_plan<E: Executor>(executor: &mut E, ops: &[ShapingOp]) -> command::Result<()> {
    for op in ops {
        match executor.apply(op) {
            Ok(()) => {}
            Err(err) if matches!(op, ShapingOp::DeleteRoot) => {
                tracing::debug!(%err, "no existing root qdisc to delete");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::tc::handle::{DEFAULT_CLASS, TOP_CLASS};

    fn rendered(op: &ShapingOp) -> String {
        format_command(&op.to_command("eth0"))
    }

    #[test]
    fn renders_preamble_commands() {
        assert_eq!(rendered(&ShapingOp::DeleteRoot), "tc qdisc del dev eth0 root");
        assert_eq!(
            rendered(&ShapingOp::AddRootQueue { default: DEFAULT_CLASS }),
            "tc qdisc add dev eth0 root handle 1: htb default 10"
        );
        assert_eq!(
            rendered(&ShapingOp::AddClass {
                parent: TcHandle::ROOT,
                class: TcHandle::class(TOP_CLASS),
                rate_mbit: 1000,
            }),
            "tc class add dev eth0 parent 1: classid 1:1 htb rate 1000mbit"
        );
        assert_eq!(
            rendered(&ShapingOp::AddClass {
                parent: TcHandle::class(TOP_CLASS),
                class: TcHandle::class(DEFAULT_CLASS),
                rate_mbit: 1000,
            }),
            "tc class add dev eth0 parent 1:1 classid 1:10 htb rate 1000mbit"
        );
        assert_eq!(
            rendered(&ShapingOp::AddFairQueue {
                class: TcHandle::class(DEFAULT_CLASS),
                perturb_secs: 10,
            }),
            "tc qdisc add dev eth0 parent 1:10 handle 10: sfq perturb 10"
        );
    }

    #[test]
    fn renders_zone_commands() {
        assert_eq!(
            rendered(&ShapingOp::AddDelayQueue {
                class: TcHandle::class(11),
                delay_ms: 50,
                jitter_ms: 2,
            }),
            "tc qdisc add dev eth0 parent 1:11 handle 11: netem delay 50ms 2ms distribution normal"
        );
        assert_eq!(
            rendered(&ShapingOp::AddDestinationFilter {
                class: TcHandle::class(11),
                destination: "10.0.0.2".parse().unwrap(),
            }),
            "tc filter add dev eth0 protocol ip parent 1: prio 1 u32 match ip dst 10.0.0.2/32 flowid 1:11"
        );
    }

    #[test]
    fn renders_v6_filters_with_v6_matchers() {
        assert_eq!(
            rendered(&ShapingOp::AddDestinationFilter {
                class: TcHandle::class(12),
                destination: "fd00::2".parse().unwrap(),
            }),
            "tc filter add dev eth0 protocol ipv6 parent 1: prio 1 u32 match ip6 dst fd00::2/128 flowid 1:12"
        );
    }

    /// Records applied operations, failing on request.
    #[derive(Debug, Default)]
    struct Recording {
        applied: Vec<ShapingOp>,
        fail_delete_root: bool,
        fail_at: Option<usize>,
    }

    impl Executor for Recording {
        fn apply(&mut self, op: &ShapingOp) -> command::Result<()> {
            if self.fail_delete_root && matches!(op, ShapingOp::DeleteRoot) {
                return Err(command::Error::Io(io::Error::other("no such qdisc")));
            }
            if self.fail_at == Some(self.applied.len()) {
                return Err(command::Error::Io(io::Error::other("exit status 2")));
            }
            self.applied.push(op.clone());
            Ok(())
        }
    }

    #[test]
    fn delete_root_failure_is_tolerated() {
        let ops = [ShapingOp::DeleteRoot, ShapingOp::AddRootQueue { default: DEFAULT_CLASS }];
        let mut executor = Recording { fail_delete_root: true, ..Recording::default() };

        apply_plan(&mut executor, &ops).unwrap();
        assert_eq!(executor.applied, [ShapingOp::AddRootQueue { default: DEFAULT_CLASS }]);
    }

    #[test]
    fn first_failure_aborts_remaining_operations() {
        let ops = [
            ShapingOp::DeleteRoot,
            ShapingOp::AddRootQueue { default: DEFAULT_CLASS },
            ShapingOp::AddFairQueue { class: TcHandle::class(DEFAULT_CLASS), perturb_secs: 10 },
        ];
        let mut executor = Recording { fail_at: Some(1), ..Recording::default() };

        apply_plan(&mut executor, &ops).unwrap_err();
        assert_eq!(executor.applied, [ShapingOp::DeleteRoot]);
    }
}
