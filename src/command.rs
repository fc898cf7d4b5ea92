//! Utilities for [`std::process::Command`].

use std::{io, process};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("non-zero exit status: {}", .0.stderr.trim())]
    NonZero(Output),
}

/// Captured outcome of a finished process.
#[derive(Debug, Clone)]
pub struct Output {
    pub status: process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl From<process::Output> for Output {
    fn from(value: process::Output) -> Self {
        Self {
            status: value.status,
            stdout: String::from_utf8_lossy(&value.stdout).to_string(),
            stderr: String::from_utf8_lossy(&value.stderr).to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Runner;

impl Runner {
    /// Runs the command to completion, capturing both output streams.
    pub fn run(mut cmd: process::Command) -> Result<Output> {
        cmd.stderr(process::Stdio::piped()).stdout(process::Stdio::piped());

        tracing::debug!(?cmd, "running command");

        let output: Output = cmd.spawn()?.wait_with_output()?.into();

        if !output.status.success() {
            tracing::debug!(?output.stderr, ?output.status, "command returned non-zero status");
            return Err(Error::NonZero(output));
        }

        Ok(output)
    }
}
