//! Key-minting stage: once headscale answers its own CLI, mint the API key
//! headplane uses to administer it.
//!
//! Runs in the background after headscale's process start, racing with
//! headplane's startup. Nothing here is fatal to the boot: a timeout or a
//! failed mint leaves the addon running in a degraded state the operator
//! can remedy with a restart.

use bootstrap::paths::AddonPaths;
use tracing::{debug, error, info};

pub mod control;
pub mod poller;


use control::ControlCli;
use poller::{PollOutcome, ReadinessPoller};

/// Effectively non-expiring. There is no rotation workflow, so a short
/// expiration would only schedule a future outage.
pub const API_KEY_EXPIRATION: &str = "100y";

/// What the stage ended up doing, mostly for tests and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintOutcome {
    Minted,
    AlreadyPresent,
    NotReady,
    MintFailed,
}

/// Stage body: poll for readiness, then mint the key at most once.
pub async fn run(paths: &AddonPaths, cli: &impl ControlCli) -> MintOutcome {
    run_with(paths, cli, &ReadinessPoller::new()).await
}

pub async fn run_with(
    paths: &AddonPaths,
    cli: &impl ControlCli,
    poller: &ReadinessPoller,
) -> MintOutcome {
    match poller.wait_ready(cli).await {
        PollOutcome::TimedOut { attempts } => {
            error!(
                attempts,
                "headscale never became ready; API key not minted. Restart the addon to retry"
            );
            MintOutcome::NotReady
        }
        PollOutcome::Ready { .. } => mint_api_key_if_absent(paths, cli).await,
    }
}

/// Mint at most once per lifetime of the data directory. The existence
/// check makes accidental re-invocation a no-op, and the key is never
/// rotated automatically.
pub async fn mint_api_key_if_absent(paths: &AddonPaths, cli: &impl ControlCli) -> MintOutcome {
    let path = paths.api_key();
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        debug!(path = %path.display(), "API key already present, skipping mint");
        return MintOutcome::AlreadyPresent;
    }

    match cli.create_api_key(API_KEY_EXPIRATION).await {
        Ok(key) => {
            if let Err(err) = tokio::fs::write(&path, &key).await {
                error!(error = %err, path = %path.display(), "Minted an API key but could not persist it");
                return MintOutcome::MintFailed;
            }
            info!(path = %path.display(), "Minted headplane API key");
            MintOutcome::Minted
        }
        Err(err) => {
            error!(error = %err, "API key creation failed; headplane will run without a key");
            MintOutcome::MintFailed
        }
    }
}
