use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::errors::ConfigError;

const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEFAULT_IPFS_API: &str = "http://127.0.0.1:5001";

/// Runtime environment used by the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    fn from_str(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

/// Which content-addressed store the node writes governance objects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Ipfs,
    Memory,
}

/// Basic-auth credentials for a hosted IPFS gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfuraCredentials {
    pub project_id: String,
    pub project_secret: String,
}

/// Node configuration loaded from the process environment.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub node_id: String,
    pub http_bind: String,
    pub environment: Environment,
    pub log_level: Option<String>,
    pub store: StoreBackend,
    pub ipfs_api_url: Url,
    pub infura: Option<InfuraCredentials>,
    pub request_timeout: Duration,
    pub advisor_timeout: Duration,
    pub max_span_days: u64,
    pub revocation_rules: Option<PathBuf>,
}

impl NodeConfig {
    /// Loads configuration from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let node_id = read("EGP_NODE_ID")
            .or_else(|| read("NODE_ID"))
            .unwrap_or_else(|| "unknown".to_string());

        let http_bind = match (read("EGP_HTTP_BIND"), read("PORT")) {
            (Some(bind), _) => bind,
            (None, Some(port)) => {
                let port: u16 = parse_number("PORT", &port)?;
                format!("0.0.0.0:{port}")
            }
            (None, None) => DEFAULT_BIND.to_string(),
        };

        let environment = read("EGP_ENV")
            .map(|raw| Environment::from_str(&raw))
            .unwrap_or_default();

        let store = match read("EGP_STORE").as_deref() {
            None | Some("ipfs") => StoreBackend::Ipfs,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "EGP_STORE",
                    value: other.to_string(),
                    reason: "expected `ipfs` or `memory`".into(),
                })
            }
        };

        let raw_ipfs = read("IPFS_API_URL").unwrap_or_else(|| DEFAULT_IPFS_API.to_string());
        let ipfs_api_url = Url::parse(&raw_ipfs).map_err(|err| ConfigError::InvalidValue {
            key: "IPFS_API_URL",
            value: raw_ipfs.clone(),
            reason: err.to_string(),
        })?;

        let infura = match (read("INFURA_PROJECT_ID"), read("INFURA_PROJECT_SECRET")) {
            (Some(project_id), Some(project_secret)) => Some(InfuraCredentials {
                project_id,
                project_secret,
            }),
            _ => None,
        };

        let request_timeout = match read("EGP_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("EGP_REQUEST_TIMEOUT_SECS", &raw)?),
            None => Duration::from_secs(30),
        };
        let advisor_timeout = match read("EGP_ADVISOR_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse_number("EGP_ADVISOR_TIMEOUT_MS", &raw)?),
            None => Duration::from_millis(250),
        };
        let max_span_days = match read("EGP_MAX_SPAN_DAYS") {
            Some(raw) => parse_number("EGP_MAX_SPAN_DAYS", &raw)?,
            None => 730,
        };

        Ok(Self {
            node_id,
            http_bind,
            environment,
            log_level: read("LOG_LEVEL"),
            store,
            ipfs_api_url,
            infura,
            request_timeout,
            advisor_timeout,
            max_span_days,
            revocation_rules: read("EGP_REVOCATION_RULES").map(PathBuf::from),
        })
    }

    /// Whether the node is running in production.
    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: err.to_string(),
        })
}
