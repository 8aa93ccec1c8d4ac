use std::process::ExitCode;

use clap::Parser;

/// Command line of a highway pipeline binary.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(about = "Runs a highway and everything it depends on")]
pub struct Args {
    /// Name of the highway to run. Lists all highways when omitted.
    #[arg(index = 1)]
    pub task: Option<String>,

    /// Print diagnostic output.
    #[arg(short, long, env = "HIGHWAY_VERBOSE")]
    pub verbose: bool,

    /// List all highways and exit.
    #[arg(long)]
    pub list: bool,

    /// Print the dependency graph as a Mermaid flowchart and exit.
    #[arg(long)]
    pub graph: bool,

    /// Extra arguments handed to the highway bodies.
    #[arg(index = 2, last = true)]
    pub arguments: Vec<String>,
}

/// What the process reports back to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure(u8),
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure(code) => code,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}
