use anyhow::{Context, Result};
use std::path::Path;
use teevexa_core::config::TeevexaConfig;
use teevexa_core::{init_logging, PortalServer};

/// Load config, apply command line overrides, then serve until Ctrl-C.
pub fn run(config_path: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = resolve(config_path, host, port)?;
    init_logging(&config.logging)?;

    log::info!(
        "Teevexa gate starting on {} (backend {})",
        config.server.bind_address(),
        config.backend.url
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async move { PortalServer::with_supabase(config)?.serve().await })
}

fn resolve(config_path: &Path, host: Option<String>, port: Option<u16>) -> Result<TeevexaConfig> {
    let mut config = TeevexaConfig::load_from(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("teevexa.toml");
        std::fs::write(&path, "[server]\nhost = \"0.0.0.0\"\nport = 9000\n").unwrap();

        let config = resolve(&path, None, Some(9100)).unwrap();
        assert_eq!(config.server.bind_address(), "0.0.0.0:9100");
    }

    #[test]
    fn invalid_override_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve(&tmp.path().join("absent.toml"), Some("  ".into()), None).unwrap_err();
        assert!(format!("{:#}", err).contains("[server]"));
    }
}
