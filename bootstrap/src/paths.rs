//! Fixed filesystem layout and listen addresses for the addon.

use std::path::{Path, PathBuf};

/// Bind host for headscale's public listener.
pub const BIND_HOST: &str = "0.0.0.0";
/// Internal metrics listener, never exposed outside the container.
pub const METRICS_LISTEN_ADDR: &str = "127.0.0.1:9090";
/// Internal gRPC listener.
pub const GRPC_LISTEN_ADDR: &str = "127.0.0.1:50443";
/// Local bind address for the headplane UI; the ingress proxy sits in front.
pub const HEADPLANE_HOST: &str = "127.0.0.1";
pub const HEADPLANE_PORT: u16 = 3000;
/// Tailnet address pools. Fixed, not user-configurable.
pub const IPV4_PREFIX: &str = "100.64.0.0/10";
pub const IPV6_PREFIX: &str = "fd7a:115c:a1e0::/48";
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Every path the orchestrator reads or writes.
///
/// The data directory is the unit of backup/restore: all state that must
/// survive a reinstall lives under it. Injected everywhere instead of
/// inlining path strings.
#[derive(Debug, Clone)]
pub struct AddonPaths {
    data_dir: PathBuf,
    run_dir: PathBuf,
}

impl Default for AddonPaths {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/data"),
            run_dir: PathBuf::from("/var/run/headscale"),
        }
    }
}

impl AddonPaths {
    /// Root everything under one directory. Used by tests and local runs.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.join("data"),
            run_dir: root.join("run"),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// The synthesized headscale config. Overwritten on every init.
    pub fn headscale_config(&self) -> PathBuf {
        self.data_dir.join("config.yaml")
    }

    /// The synthesized headplane config. Overwritten on every init.
    pub fn headplane_config(&self) -> PathBuf {
        self.data_dir.join("headplane.yaml")
    }

    /// Default ACL policy. Written once, user-owned afterwards.
    pub fn acl_policy(&self) -> PathBuf {
        self.data_dir.join("acl.json")
    }

    /// Noise identity key, created by headscale itself on first launch.
    pub fn noise_private_key(&self) -> PathBuf {
        self.data_dir.join("noise_private.key")
    }

    /// Sqlite database, owned entirely by headscale.
    pub fn database(&self) -> PathBuf {
        self.data_dir.join("db.sqlite")
    }

    pub fn cookie_secret(&self) -> PathBuf {
        self.data_dir.join(".cookie_secret")
    }

    pub fn api_key(&self) -> PathBuf {
        self.data_dir.join(".headplane_api_key")
    }

    /// Static options document, the fallback when no supervisor API is up.
    pub fn options_fallback(&self) -> PathBuf {
        self.data_dir.join("options.json")
    }

    /// Unix socket the headscale CLI uses to reach the running server.
    pub fn unix_socket(&self) -> PathBuf {
        self.run_dir.join("headscale.sock")
    }
}
