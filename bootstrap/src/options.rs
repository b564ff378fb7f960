//! Addon options and the two sources they can come from.
//!
//! Options are exposed through [`OptionSource`], a read-only key/value and
//! key/list view. Two variants exist: the supervisor management API (when a
//! session token is present in the environment) and the static
//! `options.json` document. Both deliver the same object, so callers never
//! care which one answered.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::paths::{AddonPaths, DEFAULT_LISTEN_PORT};

const SUPERVISOR_TOKEN_ENV: &str = "SUPERVISOR_TOKEN";
const SUPERVISOR_INFO_URL: &str = "http://supervisor/addons/self/info";

const DEFAULT_BASE_DOMAIN: &str = "tailnet.local";
const DEFAULT_NAMESERVERS: [&str; 2] = ["1.1.1.1", "1.0.0.1"];
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug)]
pub enum OptionsError {
    /// `server_url` is the one option the addon cannot default.
    MissingServerUrl,
    /// `server_url` was given without a scheme.
    InvalidServerUrl(String),
    Io(std::io::Error),
    Parse(String),
    Api(String),
}

impl std::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionsError::MissingServerUrl => {
                write!(f, "required option 'server_url' is missing or empty")
            }
            OptionsError::InvalidServerUrl(url) => {
                write!(f, "option 'server_url' must include a scheme, got '{}'", url)
            }
            OptionsError::Io(err) => write!(f, "IO error reading options: {}", err),
            OptionsError::Parse(msg) => write!(f, "Failed to parse options: {}", msg),
            OptionsError::Api(msg) => write!(f, "Supervisor API error: {}", msg),
        }
    }
}

impl std::error::Error for OptionsError {}

impl From<std::io::Error> for OptionsError {
    fn from(err: std::io::Error) -> Self {
        OptionsError::Io(err)
    }
}

/// Read-only view over the addon's options.
pub trait OptionSource {
    /// Scalar lookup. Numbers and booleans are stringified, so `8080` and
    /// `"8080"` are the same observable value.
    fn get(&self, key: &str) -> Option<String>;

    /// List lookup, preserving document order.
    fn get_list(&self, key: &str) -> Option<Vec<String>>;
}

/// Options held as one parsed JSON object. Both source variants produce
/// this, which is what makes them observably equivalent per key.
#[derive(Debug, Clone)]
pub struct JsonOptions {
    values: serde_json::Map<String, Value>,
}

impl JsonOptions {
    pub fn new(values: serde_json::Map<String, Value>) -> Self {
        Self { values }
    }
}

impl OptionSource for JsonOptions {
    fn get(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn get_list(&self, key: &str) -> Option<Vec<String>> {
        let Value::Array(items) = self.values.get(key)? else {
            return None;
        };
        Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )
    }
}

/// Load the options object from whichever source is available.
///
/// A supervisor session token in the environment selects the live
/// management API. Without one, or when the API cannot be reached, the
/// static document is read instead; both carry the same content.
pub async fn load_source(paths: &AddonPaths) -> Result<JsonOptions, OptionsError> {
    if let Ok(token) = std::env::var(SUPERVISOR_TOKEN_ENV) {
        match fetch_supervisor_options(&token).await {
            Ok(values) => {
                debug!("Options loaded from the supervisor API");
                return Ok(JsonOptions::new(values));
            }
            Err(err) => {
                warn!(error = %err, "Supervisor API unavailable, falling back to the options file");
            }
        }
    }
    read_options_file(&paths.options_fallback()).await
}

async fn fetch_supervisor_options(
    token: &str,
) -> Result<serde_json::Map<String, Value>, OptionsError> {
    let response = reqwest::Client::new()
        .get(SUPERVISOR_INFO_URL)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|err| OptionsError::Api(err.to_string()))?;

    if !response.status().is_success() {
        return Err(OptionsError::Api(format!(
            "supervisor returned {}",
            response.status()
        )));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|err| OptionsError::Api(err.to_string()))?;

    match body.pointer("/data/options") {
        Some(Value::Object(map)) => Ok(map.clone()),
        _ => Err(OptionsError::Api(
            "no options object in supervisor response".to_string(),
        )),
    }
}

pub(crate) async fn read_options_file(path: &Path) -> Result<JsonOptions, OptionsError> {
    let contents = tokio::fs::read(path).await?;
    let value: Value =
        serde_json::from_slice(&contents).map_err(|err| OptionsError::Parse(err.to_string()))?;
    match value {
        Value::Object(map) => Ok(JsonOptions::new(map)),
        _ => Err(OptionsError::Parse(
            "options document is not an object".to_string(),
        )),
    }
}

/// The orchestrator's sole input, read once per invocation.
#[derive(Debug, Clone)]
pub struct AddonOptions {
    server_url: String,
    listen_port: u16,
    dns_base_domain: String,
    dns_nameservers: Vec<String>,
    log_level: String,
}

impl AddonOptions {
    /// Parse options from a source.
    ///
    /// `server_url` is the one required field and the one validation the
    /// addon performs. Every other field has a total default: absent or
    /// malformed values fall back silently. Log levels are passed through
    /// verbatim (headscale accepts trace/debug/info/warn/error and is
    /// authoritative over what is valid).
    pub fn from_source(source: &impl OptionSource) -> Result<Self, OptionsError> {
        let server_url = source
            .get("server_url")
            .filter(|url| !url.is_empty())
            .ok_or(OptionsError::MissingServerUrl)?;
        if !server_url.contains("://") {
            return Err(OptionsError::InvalidServerUrl(server_url));
        }

        let listen_port = source
            .get("listen_port")
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_LISTEN_PORT);

        let dns_base_domain = source
            .get("dns_base_domain")
            .filter(|domain| !domain.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_DOMAIN.to_string());

        let dns_nameservers = source.get_list("dns_nameservers").unwrap_or_else(|| {
            DEFAULT_NAMESERVERS.iter().map(|ns| ns.to_string()).collect()
        });

        let log_level = source
            .get("log_level")
            .filter(|level| !level.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Self {
            server_url,
            listen_port,
            dns_base_domain,
            dns_nameservers,
            log_level,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    pub fn dns_base_domain(&self) -> &str {
        &self.dns_base_domain
    }

    pub fn dns_nameservers(&self) -> &[String] {
        &self.dns_nameservers
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}
