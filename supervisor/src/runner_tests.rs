#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use tokio::sync::oneshot;

    use crate::graph::{StageGraph, StageSpec};
    use crate::runner::{Runner, RunnerError, StageBody};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recording_task(log: &Log, name: &'static str) -> StageBody {
        let log = Arc::clone(log);
        StageBody::task(async move {
            log.lock().unwrap().push(name);
            Ok(())
        })
    }

    #[tokio::test]
    async fn tasks_run_in_dependency_order() {
        let log: Log = Arc::default();
        let graph = StageGraph::new(vec![
            StageSpec::task("first", &[]),
            StageSpec::task("second", &["first"]),
            StageSpec::task("third", &["second"]),
        ])
        .unwrap();

        let mut bodies = HashMap::new();
        bodies.insert("first", recording_task(&log, "first"));
        bodies.insert("second", recording_task(&log, "second"));
        bodies.insert("third", recording_task(&log, "third"));

        Runner::new(graph, bodies).unwrap().run().await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn failed_task_aborts_before_dependents_run() {
        let log: Log = Arc::default();
        let graph = StageGraph::new(vec![
            StageSpec::task("boom", &[]),
            StageSpec::task("after", &["boom"]),
        ])
        .unwrap();

        let mut bodies = HashMap::new();
        bodies.insert(
            "boom",
            StageBody::task(async { Err("options missing".into()) }),
        );
        bodies.insert("after", recording_task(&log, "after"));

        let result = Runner::new(graph, bodies).unwrap().run().await;

        assert!(matches!(
            result,
            Err(RunnerError::TaskFailed { stage, .. }) if stage == "boom"
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sibling_task_does_not_block_stages_that_skip_it() {
        // Mirrors the addon graph: keymint may still be polling while
        // headplane starts, because headplane does not depend on it.
        let (blocker_tx, blocker_rx) = oneshot::channel::<()>();
        let (ran_tx, ran_rx) = oneshot::channel::<()>();
        let log: Log = Arc::default();

        let graph = StageGraph::new(vec![
            StageSpec::task("init", &[]),
            StageSpec::task("slow-sibling", &["init"]),
            StageSpec::task("independent", &["init"]),
        ])
        .unwrap();

        let mut bodies = HashMap::new();
        bodies.insert("init", recording_task(&log, "init"));
        bodies.insert(
            "slow-sibling",
            StageBody::task(async move {
                // Parks until the test releases it.
                let _ = blocker_rx.await;
                Ok(())
            }),
        );
        bodies.insert(
            "independent",
            StageBody::task(async move {
                let _ = ran_tx.send(());
                Ok(())
            }),
        );

        let runner = tokio::spawn(Runner::new(graph, bodies).unwrap().run());

        // The independent stage completes while the sibling is parked.
        ran_rx.await.unwrap();

        let _ = blocker_tx.send(());
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn missing_body_is_rejected_up_front() {
        let graph = StageGraph::new(vec![StageSpec::task("only", &[])]).unwrap();
        let result = Runner::new(graph, HashMap::new());
        assert!(matches!(result, Err(RunnerError::MissingBody(_))));
    }

    #[tokio::test]
    async fn service_stage_with_task_body_is_rejected() {
        let graph = StageGraph::new(vec![StageSpec::service("svc", &[])]).unwrap();
        let mut bodies = HashMap::new();
        bodies.insert("svc", StageBody::task(async { Ok(()) }));
        let result = Runner::new(graph, bodies);
        assert!(matches!(result, Err(RunnerError::BodyKindMismatch(_))));
    }
}
