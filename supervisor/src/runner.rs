//! Built-in executor for a stage graph.
//!
//! A stand-in for an external process supervisor: service stages are
//! spawned as OS processes and restarted when they exit; task stages run
//! as futures. Dependents of a task wait for its completion; dependents
//! of a service wait only for its first process start.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::graph::{StageGraph, StageKind};

const RESTART_DELAY: Duration = Duration::from_secs(1);

pub type StageError = Box<dyn std::error::Error + Send + Sync>;

/// A long-running external process.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// What actually runs when a stage starts.
pub enum StageBody {
    Task(BoxFuture<'static, Result<(), StageError>>),
    Process(ProcessSpec),
}

impl StageBody {
    pub fn task<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), StageError>> + Send + 'static,
    {
        StageBody::Task(Box::pin(future))
    }

    pub fn process(spec: ProcessSpec) -> Self {
        StageBody::Process(spec)
    }
}

#[derive(Debug)]
pub enum RunnerError {
    MissingBody(String),
    BodyKindMismatch(String),
    TaskFailed { stage: String, message: String },
}

impl std::fmt::Display for RunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerError::MissingBody(name) => {
                write!(f, "no body supplied for stage '{}'", name)
            }
            RunnerError::BodyKindMismatch(name) => {
                write!(f, "body kind does not match stage kind for '{}'", name)
            }
            RunnerError::TaskFailed { stage, message } => {
                write!(f, "stage '{}' failed: {}", stage, message)
            }
        }
    }
}

impl std::error::Error for RunnerError {}

pub struct Runner {
    graph: StageGraph,
    bodies: HashMap<&'static str, StageBody>,
}

impl Runner {
    pub fn new(
        graph: StageGraph,
        bodies: HashMap<&'static str, StageBody>,
    ) -> Result<Self, RunnerError> {
        for stage in graph.stages() {
            match (stage.kind, bodies.get(stage.name)) {
                (_, None) => return Err(RunnerError::MissingBody(stage.name.to_string())),
                (StageKind::Task, Some(StageBody::Task(_))) => {}
                (StageKind::Service, Some(StageBody::Process(_))) => {}
                _ => return Err(RunnerError::BodyKindMismatch(stage.name.to_string())),
            }
        }
        Ok(Self { graph, bodies })
    }

    /// Execute the whole graph. Returns once every task stage has finished
    /// and every service stage has exited its restart loop (for the real
    /// addon, services never do — this future effectively runs forever).
    ///
    /// A failed task aborts the run before any dependent starts.
    pub async fn run(mut self) -> Result<(), RunnerError> {
        let mut task_handles: HashMap<&'static str, JoinHandle<Result<(), StageError>>> =
            HashMap::new();
        let mut finished_tasks: HashSet<&'static str> = HashSet::new();
        let mut service_handles: Vec<JoinHandle<()>> = Vec::new();

        let order: Vec<&'static str> = self.graph.start_order().to_vec();
        for name in order {
            // Block on every task predecessor that has not finished yet.
            // Service predecessors were already awaited for their start
            // signal when they were spawned, so order alone covers them.
            let preds = self
                .graph
                .stage(name)
                .map(|stage| stage.after.clone())
                .unwrap_or_default();
            for pred in preds {
                if finished_tasks.contains(pred) {
                    continue;
                }
                if let Some(handle) = task_handles.remove(pred) {
                    join_task(pred, handle).await?;
                    finished_tasks.insert(pred);
                }
            }

            let body = self
                .bodies
                .remove(name)
                .unwrap_or_else(|| unreachable!("bodies were validated in Runner::new"));
            match body {
                StageBody::Task(future) => {
                    info!(stage = name, "Starting task stage");
                    task_handles.insert(name, tokio::spawn(future));
                }
                StageBody::Process(spec) => {
                    let (started_tx, started_rx) = oneshot::channel();
                    service_handles.push(tokio::spawn(supervise(name, spec, started_tx)));
                    // Hold the start order: later stages may only start
                    // after this process has been spawned once.
                    let _ = started_rx.await;
                }
            }
        }

        for (name, handle) in task_handles {
            join_task(name, handle).await?;
        }
        for handle in service_handles {
            let _ = handle.await;
        }
        Ok(())
    }
}

async fn join_task(
    name: &'static str,
    handle: JoinHandle<Result<(), StageError>>,
) -> Result<(), RunnerError> {
    match handle.await {
        Ok(Ok(())) => {
            info!(stage = name, "Task stage complete");
            Ok(())
        }
        Ok(Err(err)) => Err(RunnerError::TaskFailed {
            stage: name.to_string(),
            message: err.to_string(),
        }),
        Err(err) => Err(RunnerError::TaskFailed {
            stage: name.to_string(),
            message: format!("task panicked: {err}"),
        }),
    }
}

/// Spawn-and-restart loop for one service. Signals `started` after the
/// first successful spawn so dependents can proceed.
async fn supervise(name: &'static str, spec: ProcessSpec, started: oneshot::Sender<()>) {
    let mut started = Some(started);
    loop {
        info!(stage = name, program = %spec.program, "Starting service");
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        match command.spawn() {
            Ok(mut child) => {
                if let Some(tx) = started.take() {
                    let _ = tx.send(());
                }
                match child.wait().await {
                    Ok(status) => {
                        warn!(stage = name, %status, "Service exited, restarting")
                    }
                    Err(err) => {
                        warn!(stage = name, error = %err, "Lost track of service process")
                    }
                }
            }
            Err(err) => {
                error!(stage = name, error = %err, "Failed to spawn service, retrying");
            }
        }
        tokio::time::sleep(RESTART_DELAY).await;
    }
}
