//! Thin wrapper around the headscale binary's own CLI.
//!
//! The running server has no health endpoint we can rely on, so the CLI
//! (over the unix socket named in the config) is both the liveness probe
//! and the credential-creation channel.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

#[derive(Debug, Clone)]
pub enum CliError {
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
    Io(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::CommandFailed {
                command,
                exit_code,
                stderr,
            } => {
                write!(
                    f,
                    "Command '{}' failed with exit code {}: {}",
                    command, exit_code, stderr
                )
            }
            CliError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err.to_string())
    }
}

/// Control channel into the running headscale process.
///
/// Trait seam so the poller and minting logic can be exercised with
/// scripted fakes.
pub trait ControlCli {
    /// Liveness probe: listing existing API keys succeeds once the server
    /// is up and answering on its socket.
    fn list_api_keys(&self) -> impl Future<Output = Result<(), CliError>> + Send;

    /// Create a new API key with the given expiration and return the token.
    fn create_api_key(
        &self,
        expiration: &str,
    ) -> impl Future<Output = Result<String, CliError>> + Send;
}

pub struct HeadscaleCommand {
    binary: String,
    config_path: PathBuf,
}

impl HeadscaleCommand {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: "headscale".to_string(),
            config_path: config_path.into(),
        }
    }

    async fn execute(&self, args: &[&str]) -> Result<String, CliError> {
        let mut command = Command::new(&self.binary);
        command.arg("-c").arg(&self.config_path);
        command.args(args);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let output = command.output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if exit_code != 0 {
            return Err(CliError::CommandFailed {
                command: format!("{} {}", self.binary, args.join(" ")),
                exit_code,
                stderr,
            });
        }

        Ok(stdout)
    }
}

impl ControlCli for HeadscaleCommand {
    async fn list_api_keys(&self) -> Result<(), CliError> {
        self.execute(&["apikeys", "list", "--output", "json"])
            .await
            .map(|_| ())
    }

    async fn create_api_key(&self, expiration: &str) -> Result<String, CliError> {
        let stdout = self
            .execute(&["apikeys", "create", "--expiration", expiration])
            .await?;

        // headscale prints the token on the last non-empty line.
        stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CliError::CommandFailed {
                command: format!("{} apikeys create", self.binary),
                exit_code: 0,
                stderr: "no token in output".to_string(),
            })
    }
}
