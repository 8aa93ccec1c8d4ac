#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod cli;
mod config;
mod error;
mod executor;
mod highway;
mod invocation;
pub mod manifest;
mod registry;
mod resolver;
mod task;
pub mod tools;
mod ui;
mod utils;

pub use crate::cli::{Args, ExitStatus};
pub use crate::config::Settings;
pub use crate::error::*;
pub use crate::executor::{Diagnostics, ExecutionReport, RunState, TaskExecution, run_once};
pub use crate::highway::Highway;
pub use crate::invocation::{Environment, Invocation};
pub use crate::registry::Registry;
pub use crate::resolver::{ExecutionPlan, resolve};
pub use crate::task::{Body, TaskContext, TaskDescriptor, TaskId, TaskNode};
pub use crate::ui::{Level, Recorder, Terminal, Ui};
