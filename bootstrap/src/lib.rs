//! Init stage of the headscale addon: derive both services' configuration
//! from the addon options and make sure the cookie secret exists.
//!
//! Runs synchronously before either service starts. The only fatal path is
//! a missing or scheme-less `server_url`; everything else defaults.

use tracing::info;

pub mod options;
pub mod paths;
pub mod secrets;
pub mod synth;

#[cfg(test)]
mod init_tests;
#[cfg(test)]
mod options_tests;

use options::{AddonOptions, OptionsError};
use paths::AddonPaths;
use synth::{SynthError, Synthesizer};

#[derive(Debug)]
pub enum BootstrapError {
    Options(OptionsError),
    Secret(std::io::Error),
    Synth(SynthError),
}

impl std::fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapError::Options(err) => write!(f, "{}", err),
            BootstrapError::Secret(err) => write!(f, "IO error during init: {}", err),
            BootstrapError::Synth(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for BootstrapError {}

impl From<OptionsError> for BootstrapError {
    fn from(err: OptionsError) -> Self {
        BootstrapError::Options(err)
    }
}

impl From<SynthError> for BootstrapError {
    fn from(err: SynthError) -> Self {
        BootstrapError::Synth(err)
    }
}

/// The init stage body: load options, ensure the cookie secret, render and
/// write both config documents. Must complete before headscale starts.
pub async fn run(paths: &AddonPaths) -> Result<(), BootstrapError> {
    let source = options::load_source(paths).await?;
    let opts = AddonOptions::from_source(&source)?;
    info!(
        server_url = %opts.server_url(),
        listen_port = opts.listen_port(),
        log_level = %opts.log_level(),
        "Addon options loaded"
    );

    tokio::fs::create_dir_all(paths.data_dir())
        .await
        .map_err(BootstrapError::Secret)?;
    let cookie_secret = secrets::ensure_cookie_secret(paths)
        .await
        .map_err(BootstrapError::Secret)?;

    let synthesizer = Synthesizer::new(paths.clone());
    let rendered = synthesizer.render(&opts, &cookie_secret)?;
    synthesizer.write(&rendered).await?;

    info!("Init stage complete");
    Ok(())
}
