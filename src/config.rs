//
//  config.rs
//  RouteLinter
//

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::{LintError, Result};
use crate::model::HttpMethod;

/// Top-level configuration, passed by value into every extractor and matcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinterConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub routes: RouteConfig,
    #[serde(default)]
    pub calls: CallConfig,
}

/// Similarity matcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum score for a near-miss.
    #[serde(default = "default_near_miss_threshold")]
    pub near_miss_threshold: f64,
    /// Contribution of a call-side parameter against a route literal.
    #[serde(default = "default_literal_vs_param_credit")]
    pub literal_vs_param_credit: f64,
}

/// Recognized HTTP verbs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_verbs")]
    pub verbs: Vec<HttpMethod>,
}

/// Route extractor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Receivers that are routers by name.
    #[serde(default = "default_router_names")]
    pub router_names: Vec<String>,
    /// Receiver name suffixes that mark a router (`apiRouter`, `adminApp`).
    #[serde(default = "default_router_suffixes")]
    pub router_suffixes: Vec<String>,
    /// Calls whose result is a router (`express()`, `express.Router()`).
    #[serde(default = "default_router_factories")]
    pub router_factories: Vec<String>,
}

/// Call-site extractor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// Free functions with fetch semantics: `fetch(path, options?)`.
    #[serde(default = "default_fetch_functions")]
    pub fetch_functions: Vec<String>,
    /// Objects exposing verb-named methods: `axios.get(path)`.
    #[serde(default = "default_client_names")]
    pub client_names: Vec<String>,
    /// Calls that build a configured client: `axios.create({ baseURL })`.
    #[serde(default = "default_client_factories")]
    pub client_factories: Vec<String>,
    /// Hosts treated as the analysed backend when a URL is absolute.
    #[serde(default = "default_local_hosts")]
    pub local_hosts: Vec<String>,
}

fn default_near_miss_threshold() -> f64 {
    0.8
}

fn default_literal_vs_param_credit() -> f64 {
    0.5
}

fn default_verbs() -> Vec<HttpMethod> {
    HttpMethod::ALL.to_vec()
}

fn default_router_names() -> Vec<String> {
    to_strings(&["app", "router", "server"])
}

fn default_router_suffixes() -> Vec<String> {
    to_strings(&["Router", "router", "App", "app"])
}

fn default_router_factories() -> Vec<String> {
    to_strings(&["express", "express.Router", "Router", "fastify", "Hono"])
}

fn default_fetch_functions() -> Vec<String> {
    to_strings(&["fetch"])
}

fn default_client_names() -> Vec<String> {
    to_strings(&["axios", "http", "api", "client", "ky", "got", "request", "$http"])
}

fn default_client_factories() -> Vec<String> {
    to_strings(&["axios.create", "ky.create", "ky.extend", "got.extend"])
}

fn default_local_hosts() -> Vec<String> {
    to_strings(&["localhost", "127.0.0.1", "0.0.0.0"])
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            near_miss_threshold: default_near_miss_threshold(),
            literal_vs_param_credit: default_literal_vs_param_credit(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            verbs: default_verbs(),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            router_names: default_router_names(),
            router_suffixes: default_router_suffixes(),
            router_factories: default_router_factories(),
        }
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            fetch_functions: default_fetch_functions(),
            client_names: default_client_names(),
            client_factories: default_client_factories(),
            local_hosts: default_local_hosts(),
        }
    }
}

impl LinterConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Load a config file the user asked for explicitly. Unlike [`load`],
    /// a missing or malformed file is an error.
    ///
    /// [`load`]: LinterConfig::load
    pub fn load_strict(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| LintError::Config(path.to_path_buf(), e.to_string()))
    }

    /// Parse a verb token, honouring the configured verb set.
    pub fn recognized_verb(&self, token: &str) -> Option<HttpMethod> {
        HttpMethod::parse(token).filter(|m| self.http.verbs.contains(m))
    }
}
