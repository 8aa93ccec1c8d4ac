use std::fmt::Write;
use std::time::{Duration, Instant};

use crate::registry::{Registry, mermaid_ids, mermaid_label};
use crate::task::TaskId;

#[derive(Debug, Clone)]
pub struct TaskExecution<T> {
    pub task: T,
    pub start: Instant,
    pub duration: Duration,
}

/// Timings of the highways executed during one run, in execution order.
#[derive(Debug, Clone)]
pub struct Diagnostics<T> {
    pub execution_times: Vec<TaskExecution<T>>,
}

impl<T> Default for Diagnostics<T> {
    fn default() -> Self {
        Self {
            execution_times: Vec::new(),
        }
    }
}

impl<T: TaskId> Diagnostics<T> {
    pub(crate) fn record(&mut self, task: T, start: Instant) {
        self.execution_times.push(TaskExecution {
            task,
            start,
            duration: start.elapsed(),
        });
    }

    pub fn get(&self, task: T) -> Option<&TaskExecution<T>> {
        self.execution_times.iter().find(|exec| exec.task == task)
    }

    /// Wall time from the first start to the last finish.
    pub fn total(&self) -> Duration {
        let Some(first) = self.execution_times.first() else {
            return Duration::ZERO;
        };

        self.execution_times
            .iter()
            .map(|exec| exec.start + exec.duration)
            .max()
            .map(|end| end.duration_since(first.start))
            .unwrap_or_default()
    }

    /// One line per executed highway: name padded to the longest one, then
    /// the duration.
    pub fn render_table(&self) -> String {
        let width = self
            .execution_times
            .iter()
            .map(|exec| exec.task.name().len())
            .max()
            .unwrap_or(0);

        let mut output = String::new();

        for exec in &self.execution_times {
            let _ = writeln!(
                output,
                "{:<width$}  {}",
                exec.task.name(),
                format_duration(exec.duration),
                width = width
            );
        }

        output
    }

    /// Mermaid flowchart of the registry with executed highways colored from
    /// green (fastest) to red (slowest). Highways that did not run are grey.
    pub fn render_mermaid<R>(&self, registry: &Registry<T, R>) -> String {
        let mut f = String::new();
        let _ = writeln!(f, "graph LR");

        let mut min_time = f64::MAX;
        let mut max_time = f64::MIN;

        for exec in &self.execution_times {
            let secs = exec.duration.as_secs_f64();
            min_time = min_time.min(secs);
            max_time = max_time.max(secs);
        }

        if min_time > max_time {
            min_time = 0.0;
            max_time = 0.0;
        }

        // Avoid divide by zero if all highways took the same time
        if (max_time - min_time).abs() < f64::EPSILON {
            max_time = min_time + 1.0;
        }

        let ids = mermaid_ids(&registry.graph());

        for node in registry.nodes() {
            let (label_extra, color_code) = match self.get(node.id()) {
                Some(exec) => {
                    let t = (exec.duration.as_secs_f64() - min_time) / (max_time - min_time);
                    (format_duration(exec.duration), gradient(t))
                }
                None => ("skipped".to_string(), "#D3D3D3".to_string()),
            };

            let id = &ids[&node.id()];
            let _ = writeln!(f, "    {}[\"{}\\n{}\"]", id, mermaid_label(node.name()), label_extra);
            let _ = writeln!(f, "    style {} fill:{}", id, color_code);
        }

        for node in registry.nodes() {
            for dependency in node.dependencies() {
                let _ = writeln!(f, "    {} --> {}", ids[dependency], ids[&node.id()]);
            }
        }

        f
    }
}

/// 0.0 is green, 0.5 yellow, 1.0 red.
fn gradient(t: f64) -> String {
    let (r, g, b) = if t < 0.5 {
        let r = (255.0 * t * 2.0) as u8;
        (r, 255, 0)
    } else {
        let g = (255.0 * (1.0 - (t - 0.5) * 2.0)) as u8;
        (255, g, 0)
    };

    format!("#{r:02X}{g:02X}{b:02X}")
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros() as f64;
    if micros < 1000.0 {
        format!("{micros:.0}µs")
    } else if micros < 1_000_000.0 {
        format!("{:.2}ms", micros / 1000.0)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
