//! Renders the headscale config, the headplane config, and the default ACL
//! policy from the addon options.
//!
//! `render` is a pure function of options + cookie secret: identical inputs
//! produce byte-identical documents. `write` is the only part that touches
//! the filesystem.

use serde::Serialize;
use tracing::{debug, info};

use crate::options::AddonOptions;
use crate::paths::{
    AddonPaths, BIND_HOST, GRPC_LISTEN_ADDR, HEADPLANE_HOST, HEADPLANE_PORT, IPV4_PREFIX,
    IPV6_PREFIX, METRICS_LISTEN_ADDR,
};

#[derive(Debug)]
pub enum SynthError {
    Io(std::io::Error),
    Render(String),
}

impl std::fmt::Display for SynthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthError::Io(err) => write!(f, "IO error writing config: {}", err),
            SynthError::Render(msg) => write!(f, "Failed to render config: {}", msg),
        }
    }
}

impl std::error::Error for SynthError {}

impl From<std::io::Error> for SynthError {
    fn from(err: std::io::Error) -> Self {
        SynthError::Io(err)
    }
}

// ─── Headscale config document ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HeadscaleConfig {
    server_url: String,
    listen_addr: String,
    metrics_listen_addr: String,
    grpc_listen_addr: String,
    grpc_allow_insecure: bool,
    noise: NoiseConfig,
    prefixes: PrefixConfig,
    derp: DerpConfig,
    database: DatabaseConfig,
    log: LogConfig,
    dns: DnsConfig,
    unix_socket: String,
    policy: PolicyConfig,
}

#[derive(Debug, Serialize)]
struct NoiseConfig {
    private_key_path: String,
}

#[derive(Debug, Serialize)]
struct PrefixConfig {
    v4: String,
    v6: String,
}

#[derive(Debug, Serialize)]
struct DerpConfig {
    urls: Vec<String>,
    auto_update_enabled: bool,
    update_frequency: String,
}

#[derive(Debug, Serialize)]
struct DatabaseConfig {
    #[serde(rename = "type")]
    kind: String,
    sqlite: SqliteConfig,
}

#[derive(Debug, Serialize)]
struct SqliteConfig {
    path: String,
}

#[derive(Debug, Serialize)]
struct LogConfig {
    level: String,
    format: String,
}

#[derive(Debug, Serialize)]
struct DnsConfig {
    magic_dns: bool,
    base_domain: String,
    nameservers: NameserverConfig,
}

#[derive(Debug, Serialize)]
struct NameserverConfig {
    global: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PolicyConfig {
    mode: String,
    path: String,
}

// ─── Headplane config document ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HeadplaneConfig {
    server: HeadplaneServer,
    headscale: HeadplaneHeadscale,
}

#[derive(Debug, Serialize)]
struct HeadplaneServer {
    host: String,
    port: u16,
    cookie_secret: String,
    cookie_secure: bool,
}

#[derive(Debug, Serialize)]
struct HeadplaneHeadscale {
    url: String,
    public_url: String,
    config_path: String,
    config_strict: bool,
}

// ─── Synthesizer ───────────────────────────────────────────────────────────

/// The three documents, rendered but not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub headscale_yaml: String,
    pub headplane_yaml: String,
    pub policy_json: String,
}

pub struct Synthesizer {
    paths: AddonPaths,
}

impl Synthesizer {
    pub fn new(paths: AddonPaths) -> Self {
        Self { paths }
    }

    /// Render all three documents. Deterministic: unchanged options and an
    /// unchanged cookie secret reproduce the output byte for byte.
    pub fn render(
        &self,
        options: &AddonOptions,
        cookie_secret: &str,
    ) -> Result<Rendered, SynthError> {
        let headscale = HeadscaleConfig {
            server_url: options.server_url().to_string(),
            listen_addr: format!("{}:{}", BIND_HOST, options.listen_port()),
            metrics_listen_addr: METRICS_LISTEN_ADDR.to_string(),
            grpc_listen_addr: GRPC_LISTEN_ADDR.to_string(),
            grpc_allow_insecure: false,
            noise: NoiseConfig {
                private_key_path: self.paths.noise_private_key().display().to_string(),
            },
            prefixes: PrefixConfig {
                v4: IPV4_PREFIX.to_string(),
                v6: IPV6_PREFIX.to_string(),
            },
            derp: DerpConfig {
                urls: vec!["https://controlplane.tailscale.com/derpmap/default".to_string()],
                auto_update_enabled: true,
                update_frequency: "24h".to_string(),
            },
            database: DatabaseConfig {
                kind: "sqlite".to_string(),
                sqlite: SqliteConfig {
                    path: self.paths.database().display().to_string(),
                },
            },
            log: LogConfig {
                // Passed through verbatim; headscale owns validation.
                level: options.log_level().to_string(),
                format: "text".to_string(),
            },
            dns: DnsConfig {
                magic_dns: true,
                base_domain: options.dns_base_domain().to_string(),
                nameservers: NameserverConfig {
                    global: options.dns_nameservers().to_vec(),
                },
            },
            unix_socket: self.paths.unix_socket().display().to_string(),
            policy: PolicyConfig {
                mode: "file".to_string(),
                path: self.paths.acl_policy().display().to_string(),
            },
        };

        let headplane = HeadplaneConfig {
            server: HeadplaneServer {
                host: HEADPLANE_HOST.to_string(),
                port: HEADPLANE_PORT,
                cookie_secret: cookie_secret.to_string(),
                cookie_secure: false,
            },
            headscale: HeadplaneHeadscale {
                url: format!("http://127.0.0.1:{}", options.listen_port()),
                public_url: options.server_url().to_string(),
                config_path: self.paths.headscale_config().display().to_string(),
                config_strict: false,
            },
        };

        Ok(Rendered {
            headscale_yaml: to_yaml(&headscale)?,
            headplane_yaml: to_yaml(&headplane)?,
            policy_json: default_policy()?,
        })
    }

    /// Write the rendered documents into the data directory.
    ///
    /// The directory trees are created if absent and never truncated. Both
    /// YAML documents are fully derived and overwritten on every run; the
    /// ACL policy is written only if no file exists yet, because the
    /// operator owns it from then on.
    pub async fn write(&self, rendered: &Rendered) -> Result<(), SynthError> {
        tokio::fs::create_dir_all(self.paths.data_dir()).await?;
        tokio::fs::create_dir_all(self.paths.run_dir()).await?;

        tokio::fs::write(self.paths.headscale_config(), &rendered.headscale_yaml).await?;
        tokio::fs::write(self.paths.headplane_config(), &rendered.headplane_yaml).await?;

        let policy_path = self.paths.acl_policy();
        if tokio::fs::try_exists(&policy_path).await.unwrap_or(false) {
            debug!(path = %policy_path.display(), "ACL policy already exists, leaving it untouched");
        } else {
            tokio::fs::write(&policy_path, &rendered.policy_json).await?;
            info!(path = %policy_path.display(), "Wrote default allow-all ACL policy");
        }

        // Echo the final headscale document so the operator can see exactly
        // what the server was started with.
        info!(config = %rendered.headscale_yaml, "Wrote headscale config");
        Ok(())
    }
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String, SynthError> {
    serde_yaml_ng::to_string(value).map_err(|err| SynthError::Render(err.to_string()))
}

/// Allow-all default: every node may reach every node. Deliberately
/// permissive; the operator is expected to tighten it.
fn default_policy() -> Result<String, SynthError> {
    let policy = serde_json::json!({
        "acls": [
            {
                "action": "accept",
                "src": ["*"],
                "dst": ["*:*"],
            }
        ]
    });
    serde_json::to_string_pretty(&policy).map_err(|err| SynthError::Render(err.to_string()))
}
