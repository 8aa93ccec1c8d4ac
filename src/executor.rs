mod diagnostics;

use std::time::Instant;

use indicatif::ProgressStyle;
use tracing::Level;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::error::HighwayError;
use crate::invocation::Invocation;
use crate::registry::Registry;
use crate::resolver::{ExecutionPlan, resolve};
use crate::task::{TaskContext, TaskId};
use crate::ui::Ui;

pub use diagnostics::{Diagnostics, TaskExecution};
pub(crate) use diagnostics::format_duration;

/// Lifecycle of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Resolving,
    Executing,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(!self.is_terminal(), "run already finished as {self:?}");
        tracing::trace!(from = ?*self, to = ?next, "run state");
        *self = next;
    }
}

/// Outcome of one invocation.
#[derive(Debug)]
pub struct ExecutionReport<T> {
    /// The highway that was asked for.
    pub requested: T,
    /// Resolved order of the run.
    pub plan: ExecutionPlan<T>,
    /// Highways that finished successfully, in execution order.
    pub succeeded: Vec<T>,
    /// The highway whose body failed, if any.
    pub failed_task: Option<T>,
    /// The error returned by `failed_task`.
    pub error: Option<anyhow::Error>,
    pub diagnostics: Diagnostics<T>,
    state: RunState,
}

impl<T: TaskId> ExecutionReport<T> {
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_success(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// Converts a failed report into [`HighwayError::TaskExecution`].
    pub fn into_result(mut self) -> Result<Self, HighwayError> {
        match self.failed_task {
            Some(task) => Err(HighwayError::TaskExecution {
                task: task.name().to_string(),
                source: self
                    .error
                    .take()
                    .unwrap_or_else(|| anyhow::anyhow!("highway failed without an error")),
            }),
            None => Ok(self),
        }
    }
}

pub(crate) fn get_style_run() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

pub(crate) fn get_style_task() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Runs the highway named by `invocation` together with all of its
/// dependencies.
///
/// The steps are:
/// 1. Look the requested name up in the registry.
/// 2. Resolve the execution plan.
/// 3. Clear results left over from an earlier invocation.
/// 4. Invoke each highway of the plan in order, stopping at the first failure.
///
/// Lookup and resolution problems are returned as `Err`. A failing highway
/// body does not make this function fail; it is recorded in the returned
/// [`ExecutionReport`].
pub fn run_once<T, R>(
    registry: &mut Registry<T, R>,
    invocation: &Invocation,
    ui: &dyn Ui,
) -> Result<ExecutionReport<T>, HighwayError>
where
    T: TaskId,
{
    let mut state = RunState::NotStarted;

    let requested = registry
        .find(&invocation.task)
        .map(|node| node.id())
        .ok_or_else(|| HighwayError::unknown(&invocation.task, registry.descriptors()))?;

    state.advance(RunState::Resolving);
    let plan = resolve(registry, requested)?;

    state.advance(RunState::Executing);
    registry.reset();
    let registry = &*registry;

    let root_span = tracing::span!(Level::INFO, "highway", name = requested.name());
    root_span.pb_set_length(plan.len() as u64);
    root_span.pb_set_style(&get_style_run());
    root_span.pb_set_message(&format!("Running {}", requested.name()));
    let _enter = root_span.enter();

    let task_style = get_style_task();

    let mut succeeded = Vec::with_capacity(plan.len());
    let mut failure = None;
    let mut diagnostics = Diagnostics::default();

    for id in plan.iter() {
        let Some(node) = registry.get(id) else {
            return Err(HighwayError::unknown(id.name(), registry.descriptors()));
        };

        let span = tracing::span!(Level::INFO, "task", name = id.name());
        span.pb_set_style(&task_style);
        span.pb_set_message(&format!("Running {}", id.name()));
        let _task = span.enter();

        let context = TaskContext::new(invocation, ui, registry).with_span(span.clone());

        ui.message(&format!("Running {}", id.name()));
        let start = Instant::now();

        // A panicking body only owns data borrowed from this run, and the run
        // stops right after, so nothing observes a broken invariant.
        let outcome = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            node.invoke(&context).map(|_| ())
        })) {
            Ok(result) => result,
            Err(panic) => {
                let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                    format!("Highway panicked: {s}")
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    format!("Highway panicked: {s}")
                } else {
                    String::from("Highway panicked with unknown payload")
                };

                Err(HighwayError::TaskExecution {
                    task: id.name().to_string(),
                    source: anyhow::anyhow!(msg),
                })
            }
        };

        diagnostics.record(id, start);
        root_span.pb_inc(1);

        match outcome {
            Ok(()) => {
                tracing::debug!(highway = id.name(), "finished");
                succeeded.push(id);
            }
            Err(HighwayError::TaskExecution { source, .. }) => {
                tracing::error!(highway = id.name(), "{source:#}");
                failure = Some((id, source));
                break;
            }
            Err(other) => return Err(other),
        }
    }

    let (failed_task, error) = match failure {
        Some((id, source)) => {
            state.advance(RunState::Failed);
            (Some(id), Some(source))
        }
        None => {
            state.advance(RunState::Succeeded);
            tracing::info!(highway = requested.name(), "run complete");
            (None, None)
        }
    };

    Ok(ExecutionReport {
        requested,
        plan,
        succeeded,
        failed_task,
        error,
        diagnostics,
        state,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ui::{Level as UiLevel, Recorder};

    crate::highways! {
        enum Lane {
            Top => "top",
            Left => "left",
            Right => "right",
            Base => "base",
            Build => "build",
            Compile => "compile",
        }
    }

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn logging(registry: &mut Registry<Lane, u32>, id: Lane, deps: &[Lane], log: &Log) {
        let log = log.clone();
        registry
            .register(id, None)
            .unwrap()
            .depends(deps.iter().copied())
            .run(move |_| {
                log.borrow_mut().push(id.name());
                Ok(1u32)
            });
    }

    fn diamond(log: &Log) -> Registry<Lane, u32> {
        let mut registry = Registry::new();
        logging(&mut registry, Lane::Top, &[Lane::Left, Lane::Right], log);
        logging(&mut registry, Lane::Left, &[Lane::Base], log);
        logging(&mut registry, Lane::Right, &[Lane::Base], log);
        logging(&mut registry, Lane::Base, &[], log);
        registry
    }

    #[test]
    fn test_diamond_runs_base_once() {
        let log = Log::default();
        let mut registry = diamond(&log);
        let ui = Recorder::default();

        let report = run_once(&mut registry, &Invocation::new("top"), &ui).unwrap();

        assert!(report.is_success());
        assert_eq!(*log.borrow(), ["base", "left", "right", "top"]);
        assert_eq!(report.succeeded, [Lane::Base, Lane::Left, Lane::Right, Lane::Top]);
        assert_eq!(report.diagnostics.execution_times.len(), 4);
        assert_eq!(ui.texts(UiLevel::Message).len(), 4);
    }

    #[test]
    fn test_unknown_task_lists_sorted() {
        let mut registry: Registry<Lane> = Registry::new();
        registry.register(Lane::Compile, None).unwrap();
        registry.register(Lane::Build, None).unwrap().depends([Lane::Compile]);

        let err = run_once(&mut registry, &Invocation::new("deploy"), &Recorder::default()).unwrap_err();

        match err {
            HighwayError::UnknownTask { name, available } => {
                assert_eq!(name, "deploy");
                let names: Vec<_> = available.iter().map(|d| d.name.as_str()).collect();
                assert_eq!(names, ["build", "compile"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_declared_but_unregistered_is_unknown() {
        let mut registry: Registry<Lane> = Registry::new();
        registry.register(Lane::Build, None).unwrap();

        let err = run_once(&mut registry, &Invocation::new("compile"), &Recorder::default()).unwrap_err();
        assert!(matches!(err, HighwayError::UnknownTask { .. }));
    }

    #[test]
    fn test_failure_short_circuits() {
        let built = Rc::new(RefCell::new(false));
        let flag = built.clone();

        let mut registry: Registry<Lane> = Registry::new();
        registry
            .register(Lane::Compile, None)
            .unwrap()
            .run(|_| -> anyhow::Result<()> { anyhow::bail!("syntax error") });
        registry
            .register(Lane::Build, None)
            .unwrap()
            .depends([Lane::Compile])
            .run(move |_| {
                *flag.borrow_mut() = true;
                Ok(())
            });

        let report = run_once(&mut registry, &Invocation::new("build"), &Recorder::default()).unwrap();

        assert_eq!(report.state(), RunState::Failed);
        assert_eq!(report.failed_task, Some(Lane::Compile));
        assert!(report.succeeded.is_empty());
        assert_eq!(report.error.as_ref().map(ToString::to_string).as_deref(), Some("syntax error"));
        assert!(!*built.borrow());

        match report.into_result() {
            Err(HighwayError::TaskExecution { task, .. }) => assert_eq!(task, "compile"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_panic_is_reported_as_failure() {
        let mut registry: Registry<Lane> = Registry::new();
        registry
            .register(Lane::Compile, None)
            .unwrap()
            .run(|_| -> anyhow::Result<()> { panic!("linker crashed") });

        let report = run_once(&mut registry, &Invocation::new("compile"), &Recorder::default()).unwrap();

        assert_eq!(report.failed_task, Some(Lane::Compile));
        let message = report.error.map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(message, "Highway panicked: linker crashed");
    }

    #[test]
    fn test_cycle_propagates() {
        let mut registry: Registry<Lane> = Registry::new();
        registry.register(Lane::Left, None).unwrap().depends([Lane::Right]);
        registry.register(Lane::Right, None).unwrap().depends([Lane::Left]);

        let err = run_once(&mut registry, &Invocation::new("left"), &Recorder::default()).unwrap_err();
        assert!(matches!(err, HighwayError::CycleDetected(path) if path == ["left", "right", "left"]));
    }

    #[test]
    fn test_results_are_visible_downstream() {
        let mut registry: Registry<Lane, u32> = Registry::new();
        registry.register(Lane::Compile, None).unwrap().run(|_| Ok(41u32));
        registry
            .register(Lane::Build, None)
            .unwrap()
            .depends([Lane::Compile])
            .run(|ctx| {
                let compiled = ctx.result(Lane::Compile).copied().unwrap_or_default();
                Ok(compiled + 1)
            });

        let report = run_once(&mut registry, &Invocation::new("build"), &Recorder::default()).unwrap();

        assert!(report.is_success());
        assert_eq!(registry.get(Lane::Build).and_then(|n| n.result()), Some(&42));
    }

    #[test]
    fn test_repeated_runs_are_fresh_and_deterministic() {
        let log = Log::default();
        let mut registry = diamond(&log);
        let ui = Recorder::default();

        let first = run_once(&mut registry, &Invocation::new("left"), &ui).unwrap();
        let second = run_once(&mut registry, &Invocation::new("left"), &ui).unwrap();

        assert_eq!(first.plan, second.plan);
        assert_eq!(*log.borrow(), ["base", "left", "base", "left"]);
    }

    #[test]
    fn test_aggregate_node_without_body() {
        let log = Log::default();
        let mut registry = Registry::new();
        logging(&mut registry, Lane::Compile, &[], &log);
        registry
            .register(Lane::Build, Some("everything"))
            .unwrap()
            .depends([Lane::Compile]);

        let report = run_once(&mut registry, &Invocation::new("build"), &Recorder::default()).unwrap();

        assert!(report.is_success());
        assert_eq!(report.succeeded, [Lane::Compile, Lane::Build]);
        assert_eq!(registry.get(Lane::Build).and_then(|n| n.result()), None);
    }
}
