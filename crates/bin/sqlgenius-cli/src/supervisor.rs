//! Liveness and launch control for the tool server process.
//!
//! The trait keeps callers independent of how instances are detected, so
//! the command-line scan can be swapped for a PID file or a socket probe
//! without touching the rest of the client.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use sysinfo::System;

const SERVER_PROGRAM: &str = "sqlgenius-mcpd";

/// How to find and launch the server.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub program: PathBuf,
    /// Substring matched against running command lines.
    pub marker: String,
}

impl ServerIdentity {
    /// Resolves the server executable: an explicit override, a sibling of
    /// the current binary, or the bare name from `PATH`.
    #[must_use]
    pub fn resolve(override_path: Option<PathBuf>) -> Self {
        let program = override_path.unwrap_or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join(SERVER_PROGRAM)))
                .filter(|candidate| candidate.exists())
                .unwrap_or_else(|| PathBuf::from(SERVER_PROGRAM))
        });
        Self {
            program,
            marker: SERVER_PROGRAM.to_string(),
        }
    }

    /// Builds the launch command for a tool session.
    #[must_use]
    pub fn command(&self) -> tokio::process::Command {
        tokio::process::Command::new(&self.program)
    }
}

/// Supervision capability: detect a live instance, start a new one.
pub trait ServerSupervisor {
    /// True when a process with this identity is currently alive.
    fn is_alive(&mut self) -> bool;

    /// Starts a new server instance, returning its pid.
    ///
    /// # Errors
    /// Returns an error if the process fails to spawn.
    fn start(&mut self) -> Result<u32>;
}

/// Detects instances by scanning running command lines.
pub struct CommandLineScan {
    identity: ServerIdentity,
    // Only kept so exited instances get reaped on the next liveness check.
    child: Option<std::process::Child>,
}

impl CommandLineScan {
    #[must_use]
    pub const fn new(identity: ServerIdentity) -> Self {
        Self {
            identity,
            child: None,
        }
    }
}

impl ServerSupervisor for CommandLineScan {
    fn is_alive(&mut self) -> bool {
        if let Some(child) = self.child.as_mut() {
            if matches!(child.try_wait(), Ok(Some(_))) {
                self.child = None;
            }
        }

        let own_pid = sysinfo::get_current_pid().ok();
        let system = System::new_all();
        system.processes().iter().any(|(pid, process)| {
            if Some(*pid) == own_pid {
                return false;
            }
            process
                .cmd()
                .iter()
                .any(|arg| arg.to_string_lossy().contains(&self.identity.marker))
        })
    }

    fn start(&mut self) -> Result<u32> {
        // A detached instance serves streamable HTTP so it does not depend
        // on this process holding its stdin open.
        let child = std::process::Command::new(&self.identity.program)
            .args(["--stdio", "false", "--http-serve", "true"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| {
                format!("failed to start {}", self.identity.program.display())
            })?;
        let pid = child.id();
        tracing::info!(pid, "started server instance");
        self.child = Some(child);
        Ok(pid)
    }
}
