//! Directed acyclic graph of named boot stages.
//!
//! The graph only records names, kinds, and predecessor edges; any
//! conforming scheduler can execute it. Validation happens at
//! construction so a bad graph never starts anything.

use std::collections::{HashMap, HashSet, VecDeque};

/// How a stage satisfies its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Runs to completion. Dependents wait for a successful exit.
    Task,
    /// Long-running process. Dependents wait only for the process start,
    /// not for readiness.
    Service,
}

#[derive(Debug, Clone)]
pub struct StageSpec {
    pub name: &'static str,
    pub kind: StageKind,
    pub after: Vec<&'static str>,
}

impl StageSpec {
    pub fn task(name: &'static str, after: &[&'static str]) -> Self {
        Self {
            name,
            kind: StageKind::Task,
            after: after.to_vec(),
        }
    }

    pub fn service(name: &'static str, after: &[&'static str]) -> Self {
        Self {
            name,
            kind: StageKind::Service,
            after: after.to_vec(),
        }
    }
}

#[derive(Debug)]
pub enum GraphError {
    DuplicateStage(String),
    UnknownPredecessor { stage: String, predecessor: String },
    Cycle(String),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::DuplicateStage(name) => {
                write!(f, "stage '{}' is declared twice", name)
            }
            GraphError::UnknownPredecessor { stage, predecessor } => {
                write!(
                    f,
                    "stage '{}' depends on unknown stage '{}'",
                    stage, predecessor
                )
            }
            GraphError::Cycle(name) => {
                write!(f, "dependency cycle involving stage '{}'", name)
            }
        }
    }
}

impl std::error::Error for GraphError {}

pub struct StageGraph {
    stages: Vec<StageSpec>,
    order: Vec<&'static str>,
}

impl StageGraph {
    pub fn new(stages: Vec<StageSpec>) -> Result<Self, GraphError> {
        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert(stage.name) {
                return Err(GraphError::DuplicateStage(stage.name.to_string()));
            }
        }
        for stage in &stages {
            for pred in &stage.after {
                if !seen.contains(pred) {
                    return Err(GraphError::UnknownPredecessor {
                        stage: stage.name.to_string(),
                        predecessor: pred.to_string(),
                    });
                }
            }
        }

        let order = topological_order(&stages)?;
        Ok(Self { stages, order })
    }

    /// Stage names in a valid start order (Kahn's algorithm, declaration
    /// order preserved among ready stages).
    pub fn start_order(&self) -> &[&'static str] {
        &self.order
    }

    pub fn stage(&self, name: &str) -> Option<&StageSpec> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }
}

fn topological_order(stages: &[StageSpec]) -> Result<Vec<&'static str>, GraphError> {
    let mut indegree: HashMap<&'static str, usize> = stages
        .iter()
        .map(|stage| (stage.name, stage.after.len()))
        .collect();
    let mut dependents: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for stage in stages {
        for &pred in &stage.after {
            dependents.entry(pred).or_default().push(stage.name);
        }
    }

    let mut ready: VecDeque<&'static str> = stages
        .iter()
        .filter(|stage| stage.after.is_empty())
        .map(|stage| stage.name)
        .collect();
    let mut order = Vec::with_capacity(stages.len());

    while let Some(name) = ready.pop_front() {
        order.push(name);
        for &dependent in dependents.get(name).map(Vec::as_slice).unwrap_or(&[]) {
            let count = indegree
                .get_mut(dependent)
                .unwrap_or_else(|| unreachable!("dependent '{dependent}' was validated"));
            *count -= 1;
            if *count == 0 {
                ready.push_back(dependent);
            }
        }
    }

    if order.len() != stages.len() {
        let stuck = stages
            .iter()
            .find(|stage| !order.contains(&stage.name))
            .map(|stage| stage.name.to_string())
            .unwrap_or_default();
        return Err(GraphError::Cycle(stuck));
    }
    Ok(order)
}
