use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt::Write;

use camino::Utf8PathBuf;

/// Prefix of environment variables that belong to highway itself.
const HIGHWAY_PREFIX: &str = "HIGHWAY_";

/// The per-process request: which highway to run, with which arguments.
///
/// An invocation is built once from the command line and then shared by
/// reference with every highway body of the run.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Name of the requested highway, as typed by the user.
    pub task: String,
    /// Extra arguments passed after the highway name.
    pub arguments: Vec<String>,
    /// Whether diagnostic output was requested.
    pub verbose: bool,
    /// Snapshot of the process environment at startup.
    pub environment: Environment,
    /// Working directory at startup, if it is valid UTF-8.
    pub cwd: Option<Utf8PathBuf>,
}

impl Invocation {
    /// Creates an invocation with an empty environment.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }

    /// Creates an invocation capturing the environment of this process.
    pub fn capture(task: impl Into<String>, arguments: Vec<String>, verbose: bool) -> Self {
        let cwd = std::env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());

        Self {
            task: task.into(),
            arguments,
            verbose,
            environment: Environment::capture(),
            cwd,
        }
    }

    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Diagnostic dump printed in verbose mode: environment, search paths,
    /// arguments, working directory and version.
    pub fn describe(&self, version: Option<&str>) -> String {
        let mut text = String::new();

        // Writing into a String never fails.
        let _ = writeln!(text, "Other Environment Variables");
        let _ = writeln!(text, "{}", format_vars(&self.environment.other));
        let _ = writeln!(text);
        let _ = writeln!(text, "Highway Environment Variables");
        let _ = writeln!(text, "{}", format_vars(&self.environment.highway));
        let _ = writeln!(text);

        let path = self.environment.get("PATH");
        let _ = writeln!(text, "PATH: {}", path.unwrap_or("<not set>"));
        let _ = writeln!(text, "Search Urls:");
        for url in self.environment.search_paths() {
            let _ = writeln!(text, "{}", url.display());
        }

        let _ = writeln!(text, "Arguments:");
        let _ = writeln!(text, "{}", self.task);
        for argument in &self.arguments {
            let _ = writeln!(text, "{argument}");
        }

        match &self.cwd {
            Some(cwd) => {
                let _ = writeln!(text, "cwd: {cwd}");
            }
            None => {
                let _ = writeln!(text, "cwd: <unknown>");
            }
        }

        if let Some(version) = version {
            let _ = writeln!(text, "Version: {version}");
        }

        text
    }
}

fn format_vars(vars: &BTreeMap<String, String>) -> String {
    vars.iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Process environment split into highway specific and other variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Variables starting with `HIGHWAY_`, compared case-insensitively.
    pub highway: BTreeMap<String, String>,
    pub other: BTreeMap<String, String>,
}

impl Environment {
    pub fn capture() -> Self {
        Self::from_vars(unicode_vars(std::env::vars_os()))
    }

    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut environment = Self::default();

        for (key, value) in vars {
            let key = key.into();
            let target = if is_highway_variable(&key) {
                &mut environment.highway
            } else {
                &mut environment.other
            };
            target.insert(key, value.into());
        }

        environment
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.highway
            .get(key)
            .or_else(|| self.other.get(key))
            .map(String::as_str)
    }

    /// Directories listed in `PATH`, in lookup order.
    pub fn search_paths(&self) -> Vec<std::path::PathBuf> {
        match self.get("PATH") {
            Some(path) => std::env::split_paths(path).collect(),
            None => Vec::new(),
        }
    }
}

/// Keeps the variables whose key and value are valid UTF-8. The others are
/// legal on Unix but cannot be shown or matched, so they are skipped.
pub(crate) fn unicode_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                tracing::debug!(key = ?key, "skipping non UTF-8 environment variable");
                None
            }
        })
}

fn is_highway_variable(key: &str) -> bool {
    key.to_uppercase().starts_with(HIGHWAY_PREFIX)
}
