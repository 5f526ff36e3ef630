//! Tunnel daemon restart sequence.
//!
//! Every backend restarts the same way: bring the tunnel down if it is up,
//! wait for the network interface to disappear, then bring it back up. Only
//! the commands differ, so they are described by a [`RestartPlan`] and run
//! through a [`CommandRunner`].

use std::fmt;
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::constants;
use crate::error::{Result, SwitchError};

/// An external command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and combined stdout/stderr of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub output: String,
}

/// Runs external commands to completion.
pub trait CommandRunner: Send + Sync {
    /// # Errors
    ///
    /// Returns an I/O error if the command could not be spawned.
    fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .output()?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            output: combined.trim().to_string(),
        })
    }
}

/// Commands cycling one tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPlan {
    pub interface: String,
    /// Succeeds when the tunnel is up; `stop` is skipped otherwise.
    pub status: CommandSpec,
    pub stop: CommandSpec,
    /// Succeeds while the network interface exists.
    pub present: CommandSpec,
    pub start: CommandSpec,
}

impl RestartPlan {
    /// `wg-quick` toggling of a `WireGuard` interface.
    #[must_use]
    pub fn wireguard(interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
            status: CommandSpec::new("wg", &["show", interface]),
            stop: CommandSpec::new("wg-quick", &["down", interface]),
            present: link_probe(interface),
            start: CommandSpec::new("wg-quick", &["up", interface]),
        }
    }

    /// Init-system managed `OpenVPN` service running the config `name`.
    /// The tunnel counts as up while its interface exists.
    #[must_use]
    pub fn openvpn(service: &str, interface: &str, name: &str) -> Self {
        Self {
            interface: interface.to_string(),
            status: link_probe(interface),
            stop: CommandSpec::new("invoke-rc.d", &[service, "stop"]),
            present: link_probe(interface),
            start: CommandSpec::new("invoke-rc.d", &[service, "start", name]),
        }
    }
}

fn link_probe(interface: &str) -> CommandSpec {
    CommandSpec::new("ip", &["link", "list", "dev", interface])
}

/// Executes restart plans.
#[derive(Clone)]
pub struct Restarter {
    runner: Arc<dyn CommandRunner>,
    poll_interval: Duration,
    max_polls: u32,
}

impl Default for Restarter {
    fn default() -> Self {
        Self::new(
            Arc::new(SystemRunner),
            constants::TEARDOWN_POLL_INTERVAL,
            constants::TEARDOWN_MAX_POLLS,
        )
    }
}

impl Restarter {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, poll_interval: Duration, max_polls: u32) -> Self {
        Self {
            runner,
            poll_interval,
            max_polls: max_polls.max(1),
        }
    }

    /// Stops the tunnel if it is up, waits for its interface to vanish,
    /// then starts it again.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Command`] if stopping or starting fails and
    /// [`SwitchError::Timeout`] if the interface is still present after
    /// the configured number of checks.
    pub fn restart(&self, plan: &RestartPlan) -> Result<()> {
        if self.succeeds(&plan.status) {
            info!("stopping {}", plan.interface);
            self.must_run(&plan.stop)?;
        }

        self.wait_for_teardown(plan)?;

        info!("starting {}", plan.interface);
        self.must_run(&plan.start)
    }

    fn wait_for_teardown(&self, plan: &RestartPlan) -> Result<()> {
        for attempt in 1..=self.max_polls {
            if !self.succeeds(&plan.present) {
                debug!("{} gone after {attempt} check(s)", plan.interface);
                return Ok(());
            }
            debug!("{} still present ({attempt}/{})", plan.interface, self.max_polls);
            thread::sleep(self.poll_interval);
        }
        Err(SwitchError::Timeout {
            interface: plan.interface.clone(),
            attempts: self.max_polls,
        })
    }

    fn succeeds(&self, command: &CommandSpec) -> bool {
        matches!(self.runner.run(command), Ok(output) if output.success)
    }

    fn must_run(&self, command: &CommandSpec) -> Result<()> {
        let failed = |output: String| SwitchError::Command {
            command: command.to_string(),
            output,
        };
        let result = self.runner.run(command).map_err(|e| failed(e.to_string()))?;
        if result.success {
            Ok(())
        } else {
            Err(failed(format!("{} - {}", result.status, result.output)))
        }
    }
}
