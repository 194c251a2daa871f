use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

use crate::config::NodeConfig;
use crate::errors::{EgpError, Result};

/// Used when neither `RUST_LOG` nor a level is given. Keeps the HTTP stack quiet.
const DEFAULT_DIRECTIVES: &str = "info,tower_http=warn,hyper=warn";

/// Filter precedence: `RUST_LOG`, then `level`, then [`DEFAULT_DIRECTIVES`].
/// An unparsable `level` falls through to the default.
pub fn env_filter(level: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the fmt subscriber with development defaults.
pub fn init_tracing(level: Option<&str>) -> Result<()> {
    install(env_filter(level), false)
}

/// Installs the fmt subscriber for a loaded node configuration. Production
/// output drops module targets and colour.
pub fn init_for(config: &NodeConfig) -> Result<()> {
    install(env_filter(config.log_level.as_deref()), config.is_production())
}

fn install(filter: EnvFilter, production: bool) -> Result<()> {
    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(!production)
        .with_ansi(!production && atty::is(atty::Stream::Stdout))
        .try_init()
        .map_err(|err| EgpError::LoggingError(err.to_string()))
}
