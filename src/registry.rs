use std::collections::HashMap;

use petgraph::graphmap::DiGraphMap;

use crate::error::HighwayError;
use crate::highway::Highway;
use crate::task::{TaskDescriptor, TaskId, TaskNode};

/// The blueprint of a pipeline.
///
/// `Registry` owns every [`TaskNode`] of one pipeline. Highways are registered
/// once at startup and configured through the builder methods on the returned
/// node. Once configured, convert it into a [`Highway`] with
/// [`Registry::finish`] to run it from the command line.
///
/// # Example
///
/// ```rust
/// use highway::Registry;
///
/// highway::highways! {
///     enum Lane {
///         Build => "build",
///         Compile => "compile",
///     }
/// }
///
/// let mut registry: Registry<Lane> = Registry::new();
/// registry.register(Lane::Compile, None)?.run(|_| Ok(()));
/// registry
///     .register(Lane::Build, Some("builds the app"))?
///     .depends([Lane::Compile]);
/// # Ok::<(), highway::HighwayError>(())
/// ```
pub struct Registry<T: TaskId, R = ()> {
    nodes: Vec<TaskNode<T, R>>,
    index: HashMap<T, usize>,
}

impl<T: TaskId, R> Registry<T, R> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn finish(self) -> Highway<T, R> {
        Highway::new(self)
    }

    /// Creates a node with no dependencies and no body.
    ///
    /// Fails when the identifier, or another identifier with the same raw
    /// name, has been registered before.
    pub fn register(&mut self, id: T, usage: Option<&str>) -> Result<&mut TaskNode<T, R>, HighwayError> {
        let taken = self.index.contains_key(&id) || self.nodes.iter().any(|node| node.name() == id.name());
        if taken {
            return Err(HighwayError::DuplicateTask(id.name().to_string()));
        }

        tracing::trace!(highway = id.name(), "registered");

        let position = self.nodes.len();
        self.nodes.push(TaskNode::new(id, usage));
        self.index.insert(id, position);

        Ok(&mut self.nodes[position])
    }

    pub fn get(&self, id: T) -> Option<&TaskNode<T, R>> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    /// Looks a node up by its command line name.
    pub fn find(&self, name: &str) -> Option<&TaskNode<T, R>> {
        self.nodes.iter().find(|node| node.name() == name)
    }

    pub fn contains(&self, id: T) -> bool {
        self.index.contains_key(&id)
    }

    /// Nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode<T, R>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Descriptors of every registered highway, sorted by name.
    pub fn descriptors(&self) -> Vec<TaskDescriptor> {
        let mut descriptors: Vec<_> = self.nodes.iter().map(TaskNode::descriptor).collect();
        descriptors.sort();
        descriptors
    }

    /// Checks the whole pipeline up front: every dependency must be
    /// registered and no highway may reach itself.
    pub fn validate(&self) -> Result<(), HighwayError> {
        for node in &self.nodes {
            if let Some(missing) = node.dependencies().iter().find(|dep| !self.contains(**dep)) {
                return Err(HighwayError::unknown(missing.name(), self.descriptors()));
            }
        }

        for node in &self.nodes {
            crate::resolver::resolve(self, node.id())?;
        }

        Ok(())
    }

    /// Dependency graph of the registered highways. Edges point from a
    /// dependency to the highway that needs it.
    pub fn graph(&self) -> DiGraphMap<T, ()> {
        let mut graph = DiGraphMap::new();

        for node in &self.nodes {
            graph.add_node(node.id());
        }

        for node in &self.nodes {
            for &dependency in node.dependencies() {
                graph.add_edge(dependency, node.id(), ());
            }
        }

        graph
    }

    /// Renders the dependency graph as a Mermaid flowchart.
    pub fn to_mermaid(&self) -> String {
        use std::fmt::Write;

        let graph = self.graph();
        let ids = mermaid_ids(&graph);
        let mut f = String::new();

        // Writing into a String never fails.
        let _ = writeln!(f, "graph LR");

        for id in graph.nodes() {
            let label = match self.get(id) {
                Some(_) => mermaid_label(id.name()),
                None => format!("{} (missing)", mermaid_label(id.name())),
            };
            let _ = writeln!(f, "    {}[\"{}\"]", ids[&id], label);
        }

        for (source, target, _) in graph.all_edges() {
            let _ = writeln!(f, "    {} --> {}", ids[&source], ids[&target]);
        }

        f
    }

    /// Forgets every result of the previous invocation.
    pub(crate) fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
    }
}

/// Mermaid node ids for every node of `graph`. Raw names may contain spaces
/// or dots, so nodes are numbered in graph order and names only go into
/// labels.
pub(crate) fn mermaid_ids<T: TaskId>(graph: &DiGraphMap<T, ()>) -> HashMap<T, String> {
    graph
        .nodes()
        .enumerate()
        .map(|(i, id)| (id, format!("n{i}")))
        .collect()
}

pub(crate) fn mermaid_label(name: &str) -> String {
    name.replace('"', "#quot;")
}

impl<T: TaskId, R> Default for Registry<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TaskId, R> std::fmt::Debug for Registry<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}
