//! Boot sequencing for the addon.
//!
//! The stage graph is `init` → `headscale` → { `headplane`, `keymint` }.
//! `headplane` deliberately depends on headscale's process start only, not
//! on the API key existing: gating it on `keymint` would make every first
//! boot wait for the full readiness poll. The cost is a possible UI
//! connection error on a slow first start, remedied by a restart.

pub mod graph;
pub mod runner;

#[cfg(test)]
mod runner_tests;

pub use graph::{GraphError, StageGraph, StageKind, StageSpec};
pub use runner::{ProcessSpec, Runner, RunnerError, StageBody, StageError};

pub const STAGE_INIT: &str = "init";
pub const STAGE_HEADSCALE: &str = "headscale";
pub const STAGE_HEADPLANE: &str = "headplane";
pub const STAGE_KEYMINT: &str = "keymint";

/// The addon's boot graph. See the module docs for why `headplane` does
/// not wait on `keymint`.
pub fn addon_graph() -> Result<StageGraph, GraphError> {
    StageGraph::new(vec![
        StageSpec::task(STAGE_INIT, &[]),
        StageSpec::service(STAGE_HEADSCALE, &[STAGE_INIT]),
        StageSpec::service(STAGE_HEADPLANE, &[STAGE_HEADSCALE]),
        StageSpec::task(STAGE_KEYMINT, &[STAGE_HEADSCALE]),
    ])
}
