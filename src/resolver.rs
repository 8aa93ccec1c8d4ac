//! Turns a requested highway into an ordered execution plan.
//!
//! The resolver walks the dependency lists depth first, in the order they were
//! declared, and appends every highway after all of its dependencies. A highway
//! reachable along several paths is scheduled once, at its first completion.
//! For a fixed registry the resulting order is always the same.

use std::collections::HashMap;

use crate::error::HighwayError;
use crate::registry::Registry;
use crate::task::TaskId;

/// Ordered, duplicate free list of highways for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan<T> {
    order: Vec<T>,
}

impl<T: TaskId> ExecutionPlan<T> {
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.order.iter().copied()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn position(&self, id: T) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    pub fn contains(&self, id: T) -> bool {
        self.order.contains(&id)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.order.iter().map(TaskId::name).collect()
    }
}

impl<T: TaskId> std::fmt::Display for ExecutionPlan<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.names().join(" -> "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

struct Walk<'a, T: TaskId, R> {
    registry: &'a Registry<T, R>,
    marks: HashMap<T, Mark>,
    /// Highways currently being visited, outermost first.
    stack: Vec<T>,
    order: Vec<T>,
}

impl<T: TaskId, R> Walk<'_, T, R> {
    fn visit(&mut self, id: T) -> Result<(), HighwayError> {
        match self.marks.get(&id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Active) => return Err(self.cycle(id)),
            None => {}
        }

        let node = self
            .registry
            .get(id)
            .ok_or_else(|| HighwayError::unknown(id.name(), self.registry.descriptors()))?;

        self.marks.insert(id, Mark::Active);
        self.stack.push(id);

        for &dependency in node.dependencies() {
            self.visit(dependency)?;
        }

        self.stack.pop();
        self.marks.insert(id, Mark::Done);
        self.order.push(id);

        Ok(())
    }

    /// Path from the first occurrence of `repeated` on the stack back to
    /// itself, both ends included.
    fn cycle(&self, repeated: T) -> HighwayError {
        let start = self
            .stack
            .iter()
            .position(|&id| id == repeated)
            .unwrap_or_default();

        let path = self.stack[start..]
            .iter()
            .chain(std::iter::once(&repeated))
            .map(|id| id.name().to_string())
            .collect();

        HighwayError::CycleDetected(path)
    }
}

/// Resolves `requested` and all of its transitive dependencies.
pub fn resolve<T: TaskId, R>(registry: &Registry<T, R>, requested: T) -> Result<ExecutionPlan<T>, HighwayError> {
    let mut walk = Walk {
        registry,
        marks: HashMap::new(),
        stack: Vec::new(),
        order: Vec::new(),
    };

    walk.visit(requested)?;

    tracing::debug!(highway = requested.name(), plan = ?walk.order, "resolved");

    Ok(ExecutionPlan { order: walk.order })
}
