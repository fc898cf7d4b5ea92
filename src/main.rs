use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use zonem::command;
use zonem::config::ShaperConfig;
use zonem::hosts::{self, HostList};
use zonem::matrix::{self, LatencyMatrix};
use zonem::tc::plan::{self, build_plan};
use zonem::tc::shaper::{apply_plan, DryRunExecutor, TcExecutor};

/// Emulate inter-zone latency towards the other hosts of a benchmark setup.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Latency matrix file: a header row of zone names, then one row of
    /// millisecond latencies per zone.
    matrix: PathBuf,

    /// Host list file: one address per line; order determines zone placement.
    hosts: PathBuf,

    /// Address of this host. Must appear in the host list.
    local: IpAddr,

    /// Outgoing interface to shape.
    #[arg(short, long, default_value = "eth0")]
    interface: String,

    /// Nominal link rate cap, in mbit/s.
    #[arg(long, default_value_t = 1000)]
    rate_mbit: u64,

    /// Print the tc commands instead of applying them.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("matrix error: {0}")]
    Matrix(#[from] matrix::Error),
    #[error("host list error: {0}")]
    Hosts(#[from] hosts::Error),
    #[error("plan error: {0}")]
    Plan(#[from] plan::Error),
    #[error("command error: {0}")]
    Command(#[from] command::Error),
}

fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "shaping failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let matrix = LatencyMatrix::load(&args.matrix)?;
    let hosts = HostList::load(&args.hosts)?;

    let config = ShaperConfig {
        interface: args.interface.clone(),
        rate_mbit: args.rate_mbit,
        ..ShaperConfig::default()
    };

    let ops = build_plan(&config, &matrix, &hosts, args.local)?;
    tracing::info!(
        zones = matrix.zones().len(),
        hosts = hosts.len(),
        ops = ops.len(),
        interface = %config.interface,
        "applying shaping plan"
    );

    if args.dry_run {
        apply_plan(&mut DryRunExecutor::new(config), &ops)?;
    } else {
        apply_plan(&mut TcExecutor::new(config), &ops)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
