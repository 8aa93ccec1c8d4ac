pub use anyhow::Error as RuntimeError;
use thiserror::Error;

use crate::task::TaskDescriptor;

#[derive(Debug, Error)]
pub enum HighwayError {
    #[error("Highway '{0}' is registered more than once")]
    DuplicateTask(String),

    #[error("Highway '{name}' not found, available highways: {}", list_names(.available))]
    UnknownTask {
        name: String,
        available: Vec<TaskDescriptor>,
    },

    #[error("Cycle detected between highways: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    #[error("Highway '{task}' failed:\n{source}")]
    TaskExecution {
        task: String,
        #[source]
        source: RuntimeError,
    },

    #[error(transparent)]
    Cli(#[from] clap::Error),
}

impl HighwayError {
    /// Process exit code reported for this error.
    ///
    /// | code | meaning                                  |
    /// |------|------------------------------------------|
    /// | 1    | a highway body failed                    |
    /// | 2    | the requested highway does not exist     |
    /// | 3    | the dependency graph contains a cycle    |
    /// | 4    | the pipeline definition is invalid       |
    /// | 64   | the command line could not be parsed     |
    pub fn exit_code(&self) -> u8 {
        match self {
            HighwayError::TaskExecution { .. } => 1,
            HighwayError::UnknownTask { .. } => 2,
            HighwayError::CycleDetected(_) => 3,
            HighwayError::DuplicateTask(_) => 4,
            HighwayError::Cli(_) => 64,
        }
    }

    pub(crate) fn unknown(name: impl Into<String>, available: Vec<TaskDescriptor>) -> Self {
        HighwayError::UnknownTask {
            name: name.into(),
            available,
        }
    }
}

fn list_names(available: &[TaskDescriptor]) -> String {
    if available.is_empty() {
        return String::from("<none>");
    }

    available
        .iter()
        .map(|desc| desc.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure while exporting the highway manifest. Never fatal to a run.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Couldn't write manifest.\n{0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't serialize manifest.\n{0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_task_lists_available() {
        let err = HighwayError::unknown(
            "deploy",
            vec![
                TaskDescriptor::new("build", None),
                TaskDescriptor::new("compile", None),
            ],
        );

        assert_eq!(
            err.to_string(),
            "Highway 'deploy' not found, available highways: build, compile"
        );
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_cycle_message() {
        let err = HighwayError::CycleDetected(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Cycle detected between highways: a -> b -> a");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            HighwayError::TaskExecution {
                task: "x".into(),
                source: anyhow::anyhow!("boom"),
            }
            .exit_code(),
            HighwayError::unknown("x", vec![]).exit_code(),
            HighwayError::CycleDetected(vec![]).exit_code(),
            HighwayError::DuplicateTask("x".into()).exit_code(),
        ];

        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
        assert!(codes.iter().all(|&code| code != 0));
    }
}
