use std::collections::HashMap;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bootstrap::paths::AddonPaths;
use keymint::control::HeadscaleCommand;
use supervisor::{
    ProcessSpec, Runner, STAGE_HEADPLANE, STAGE_HEADSCALE, STAGE_INIT, STAGE_KEYMINT, StageBody,
    StageError,
};

#[derive(Debug, Parser)]
#[command(name = "headscale-ha", version)]
#[command(about = "Bootstrap orchestrator for the headscale addon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Synthesize both service configs and the cookie secret
    Init,
    /// Wait for headscale to come up, then mint the headplane API key
    MintKey,
    /// Run the whole stage graph with the built-in runner
    Run,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .log_internal_errors(true)
                .with_target(false)
                .flatten_event(true)
                .with_span_list(false),
        )
        .init();

    let cli = Cli::parse();
    let paths = AddonPaths::default();

    match cli.command {
        Commands::Init => {
            // Fatal: a failed init must stop the supervisor from starting
            // either service.
            if let Err(err) = bootstrap::run(&paths).await {
                tracing::error!(error = %err, "Init failed");
                std::process::exit(1);
            }
        }
        Commands::MintKey => {
            // Never fatal; the outcome is already logged.
            let control = HeadscaleCommand::new(paths.headscale_config());
            let outcome = keymint::run(&paths, &control).await;
            tracing::info!(?outcome, "Key-minting stage finished");
        }
        Commands::Run => {
            if let Err(err) = run_stages(paths).await {
                tracing::error!(error = %err, "Stage runner failed");
                std::process::exit(1);
            }
        }
    }
}

/// Wire the stage bodies into the boot graph and hand it to the built-in
/// runner. External supervisors skip this and call the subcommands above.
async fn run_stages(paths: AddonPaths) -> Result<(), StageError> {
    let graph = supervisor::addon_graph()?;

    let init_paths = paths.clone();
    let mint_paths = paths.clone();
    let headscale_config = paths.headscale_config();

    let mut bodies: HashMap<&'static str, StageBody> = HashMap::new();
    bodies.insert(
        STAGE_INIT,
        StageBody::task(async move {
            bootstrap::run(&init_paths).await?;
            Ok(())
        }),
    );
    bodies.insert(
        STAGE_HEADSCALE,
        StageBody::process(
            ProcessSpec::new("headscale")
                .arg("serve")
                .arg("-c")
                .arg(paths.headscale_config().display().to_string()),
        ),
    );
    bodies.insert(
        STAGE_HEADPLANE,
        StageBody::process(ProcessSpec::new("headplane").env(
            "HEADPLANE_CONFIG_PATH",
            paths.headplane_config().display().to_string(),
        )),
    );
    bodies.insert(
        STAGE_KEYMINT,
        StageBody::task(async move {
            let control = HeadscaleCommand::new(headscale_config);
            // Timeouts and mint failures are contained, not boot failures.
            let outcome = keymint::run(&mint_paths, &control).await;
            tracing::info!(?outcome, "Key-minting stage finished");
            Ok(())
        }),
    );

    Runner::new(graph, bodies)?.run().await?;
    Ok(())
}
