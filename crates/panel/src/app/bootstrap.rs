use std::sync::Arc;

use mirror::{AuthorityError, ClientConfig, ConfigError, MirrorState, TcpAuthority};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub(crate) enum StartupError {
    #[error("configuration failed: {0}")]
    Config(#[from] ConfigError),
    #[error("could not reach the authority: {0}")]
    Connect(#[from] AuthorityError),
}

pub(crate) struct AppWiring {
    pub(crate) authority: Arc<TcpAuthority>,
    pub(crate) state: MirrorState,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "panel_startup");

    let config = ClientConfig::resolve().map_err(|err| {
        error!(error = %err, "config_resolve_failed");
        StartupError::from(err)
    })?;
    info!(
        addr = %config.authority_addr(),
        connect_timeout_ms = config.connect_timeout_ms,
        "authority_connecting"
    );

    let authority = TcpAuthority::connect(&config).map_err(|err| {
        error!(error = %err, "authority_connect_failed");
        StartupError::from(err)
    })?;

    Ok(AppWiring {
        authority: Arc::new(authority),
        state: MirrorState::default(),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
