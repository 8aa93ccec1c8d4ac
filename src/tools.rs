//! Adapters highway bodies use to reach the outside world.
//!
//! Bodies receive these explicitly, usually by capturing an adapter in the
//! closure passed to [`TaskNode::run`](crate::TaskNode::run), so tests can
//! swap in a fake.

use std::cell::RefCell;
use std::process::{Command, Stdio};

use anyhow::{Context, bail};

/// A command to run: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocable {
    pub program: String,
    pub arguments: Vec<String>,
}

impl Invocable {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            arguments: Vec::new(),
        }
    }

    pub fn arg(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn args(mut self, arguments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }
}

impl std::fmt::Display for Invocable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for argument in &self.arguments {
            write!(f, " {argument}")?;
        }
        Ok(())
    }
}

/// Runs external processes. Calls block until the process exits.
pub trait System {
    /// Runs the command with inherited stdio and fails on a non-zero exit.
    fn execute(&self, command: &Invocable) -> anyhow::Result<()>;

    /// Runs the command and returns its captured stdout.
    fn capture(&self, command: &Invocable) -> anyhow::Result<String>;
}

/// Spawns real processes on this machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSystem;

impl System for LocalSystem {
    fn execute(&self, command: &Invocable) -> anyhow::Result<()> {
        tracing::debug!(%command, "execute");

        let status = Command::new(&command.program)
            .args(&command.arguments)
            .status()
            .with_context(|| format!("couldn't launch `{command}`"))?;

        if !status.success() {
            bail!("`{command}` exited with {status}");
        }

        Ok(())
    }

    fn capture(&self, command: &Invocable) -> anyhow::Result<String> {
        tracing::debug!(%command, "capture");

        let output = Command::new(&command.program)
            .args(&command.arguments)
            .stderr(Stdio::inherit())
            .output()
            .with_context(|| format!("couldn't launch `{command}`"))?;

        if !output.status.success() {
            bail!("`{command}` exited with {}", output.status);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Records commands instead of running them.
#[derive(Debug, Default)]
pub struct DryRun {
    commands: RefCell<Vec<Invocable>>,
}

impl DryRun {
    pub fn commands(&self) -> Vec<Invocable> {
        self.commands.borrow().clone()
    }
}

impl System for DryRun {
    fn execute(&self, command: &Invocable) -> anyhow::Result<()> {
        self.commands.borrow_mut().push(command.clone());
        Ok(())
    }

    fn capture(&self, command: &Invocable) -> anyhow::Result<String> {
        self.commands.borrow_mut().push(command.clone());
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let command = Invocable::new("cargo").arg("build").args(["--release", "--locked"]);
        assert_eq!(command.to_string(), "cargo build --release --locked");
    }

    #[test]
    fn test_dry_run_records() {
        let system = DryRun::default();
        system.execute(&Invocable::new("git").arg("status")).unwrap();
        assert_eq!(system.commands(), [Invocable::new("git").arg("status")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_local_failure() {
        let err = LocalSystem.execute(&Invocable::new("false")).unwrap_err();
        assert!(err.to_string().starts_with("`false` exited with"));
    }

    #[cfg(unix)]
    #[test]
    fn test_local_capture() {
        let out = LocalSystem.capture(&Invocable::new("echo").arg("hello")).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_missing_program() {
        let err = LocalSystem
            .execute(&Invocable::new("definitely-not-a-real-program-4711"))
            .unwrap_err();
        assert!(err.to_string().contains("couldn't launch"));
    }
}
