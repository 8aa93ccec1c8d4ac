use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

use crate::cli::{Args, ExitStatus};
use crate::config::Settings;
use crate::error::HighwayError;
use crate::executor::{ExecutionReport, format_duration, run_once};
use crate::invocation::Invocation;
use crate::registry::Registry;
use crate::task::TaskId;
use crate::ui::{Terminal, Ui};

/// A configured pipeline, ready to be launched from the command line.
///
/// A [`Highway`] is created from a [`Registry`] with [`Registry::finish`].
pub struct Highway<T: TaskId, R = ()> {
    registry: Registry<T, R>,
    settings: Settings,
}

impl<T: TaskId, R> Highway<T, R> {
    pub(crate) fn new(registry: Registry<T, R>) -> Self {
        Self {
            registry,
            settings: Settings::from_env(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &Registry<T, R> {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs a single invocation without touching the terminal or the manifest.
    pub fn run(&mut self, invocation: &Invocation, ui: &dyn Ui) -> Result<ExecutionReport<T>, HighwayError> {
        run_once(&mut self.registry, invocation, ui)
    }

    /// Parses the process arguments, runs the requested highway and returns
    /// the exit code for `main`.
    ///
    /// ```rust,no_run
    /// use std::process::ExitCode;
    /// use highway::Registry;
    ///
    /// highway::highways! {
    ///     enum Lane {
    ///         Build => "build",
    ///     }
    /// }
    ///
    /// fn main() -> ExitCode {
    ///     let mut registry: Registry<Lane> = Registry::new();
    ///     if let Err(err) = registry.register(Lane::Build, None) {
    ///         eprintln!("{err}");
    ///         return ExitCode::from(err.exit_code());
    ///     }
    ///     registry.finish().go()
    /// }
    /// ```
    pub fn go(mut self) -> ExitCode {
        let args = match Args::try_parse() {
            Ok(args) => args,
            Err(err) => {
                let _ = err.print();
                return match err.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                    _ => ExitCode::from(HighwayError::from(err).exit_code()),
                };
            }
        };

        if let Err(err) = crate::utils::init_logging(&self.settings.log_filter, args.verbose) {
            eprintln!("Couldn't initialize logging: {err}");
        }

        let ui = Terminal::new(args.verbose);
        self.launch(args, &ui).into()
    }

    /// Everything [`Highway::go`] does after argument parsing.
    pub fn launch(&mut self, args: Args, ui: &dyn Ui) -> ExitStatus {
        if let Err(err) = self.registry.validate() {
            tracing::warn!("pipeline definition has problems: {err}");
        }

        if let Some(path) = &self.settings.manifest {
            crate::manifest::export(path, &self.registry.descriptors());
        }

        if args.graph {
            ui.output(&self.registry.to_mermaid());
            return ExitStatus::Success;
        }

        let Some(task) = args.task.filter(|_| !args.list) else {
            self.list(ui);
            return ExitStatus::Success;
        };

        let invocation = Invocation::capture(task, args.arguments, args.verbose);
        if invocation.verbose {
            ui.verbose(&invocation.describe(self.settings.version.as_deref()));
        }

        match run_once(&mut self.registry, &invocation, ui).and_then(ExecutionReport::into_result) {
            Ok(report) => {
                ui.success(&format!(
                    "{} finished in {}",
                    report.requested.name(),
                    format_duration(report.diagnostics.total())
                ));
                ui.verbose(&report.diagnostics.render_table());
                ui.verbose(&report.diagnostics.render_mermaid(&self.registry));
                ExitStatus::Success
            }
            Err(err) => {
                ui.error(&format!("{err:#}"));
                if let HighwayError::UnknownTask { available, .. } = &err {
                    ui.message("Available highways:");
                    for line in format_list(available) {
                        ui.message(&line);
                    }
                }
                ExitStatus::Failure(err.exit_code())
            }
        }
    }

    fn list(&self, ui: &dyn Ui) {
        let descriptors = self.registry.descriptors();
        if descriptors.is_empty() {
            ui.message("No highways registered");
            return;
        }

        ui.message("Available highways:");
        for line in format_list(&descriptors) {
            ui.message(&line);
        }
    }
}

fn format_list(descriptors: &[crate::task::TaskDescriptor]) -> Vec<String> {
    let width = descriptors.iter().map(|d| d.name.len()).max().unwrap_or(0);

    descriptors
        .iter()
        .map(|d| match &d.usage {
            Some(usage) => format!("  {:<width$}  {}", d.name, usage, width = width),
            None => format!("  {}", d.name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{Level, Recorder};

    crate::highways! {
        enum Lane {
            Build => "build",
            Compile => "compile",
            Deploy => "deploy",
        }
    }

    fn highway(fail: bool) -> Highway<Lane> {
        let mut registry: Registry<Lane> = Registry::new();
        registry
            .register(Lane::Compile, None)
            .unwrap()
            .run(move |_| -> anyhow::Result<()> {
                if fail {
                    anyhow::bail!("missing semicolon");
                }
                Ok(())
            });
        registry
            .register(Lane::Build, Some("builds the app"))
            .unwrap()
            .depends([Lane::Compile]);

        registry
            .finish()
            .with_settings(Settings::default().manifest(None::<camino::Utf8PathBuf>))
    }

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("highway").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_success() {
        let ui = Recorder::default();
        let status = highway(false).launch(args(&["build"]), &ui);

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(ui.texts(Level::Message), ["Running compile", "Running build"]);
        assert!(ui.texts(Level::Success)[0].starts_with("build finished in "));
    }

    #[test]
    fn test_failure_exit_code() {
        let ui = Recorder::default();
        let status = highway(true).launch(args(&["build"]), &ui);

        assert_eq!(status, ExitStatus::Failure(1));
        let errors = ui.texts(Level::Error);
        assert!(errors[0].contains("compile"));
        assert!(errors[0].contains("missing semicolon"));
    }

    #[test]
    fn test_unknown_task_suggests() {
        let ui = Recorder::default();
        let status = highway(false).launch(args(&["deploy"]), &ui);

        assert_eq!(status, ExitStatus::Failure(2));
        let messages = ui.texts(Level::Message);
        assert_eq!(
            messages,
            [
                "Available highways:",
                "  build    builds the app",
                "  compile",
            ]
        );
    }

    #[test]
    fn test_list_without_task() {
        let ui = Recorder::default();
        let status = highway(false).launch(args(&[]), &ui);

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(ui.texts(Level::Message).len(), 3);
    }

    #[test]
    fn test_graph_goes_through_ui() {
        let ui = Recorder::default();
        let status = highway(false).launch(args(&["--graph"]), &ui);

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(
            ui.texts(Level::Output),
            ["graph LR\n    n0[\"compile\"]\n    n1[\"build\"]\n    n0 --> n1\n"]
        );
        assert!(ui.texts(Level::Message).is_empty());
    }

    #[test]
    fn test_verbose_timing_graph() {
        let ui = Recorder::default();
        highway(false).launch(args(&["build", "--verbose"]), &ui);

        let verbose = ui.texts(Level::Verbose);
        let timing = verbose
            .iter()
            .find(|text| text.starts_with("graph LR"))
            .expect("timing graph in verbose output");
        assert!(timing.contains("    n0[\"compile\\n"));
        assert!(timing.contains("    n0 --> n1\n"));
    }

    #[test]
    fn test_manifest_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::try_from(dir.path().join("highways.json")).unwrap();

        let mut highway = highway(false).with_settings(Settings::default().manifest(Some(path.clone())));
        highway.launch(args(&["--list"]), &Recorder::default());

        let descriptors = crate::manifest::read(&path).unwrap();
        assert_eq!(descriptors, highway.registry().descriptors());
    }
}
