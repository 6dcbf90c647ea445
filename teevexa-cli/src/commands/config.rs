use anyhow::Result;
use std::path::Path;
use teevexa_core::config::TeevexaConfig;

/// Print the resolved configuration, or only validate it with `check`.
pub fn run(config_path: &Path, check: bool) -> Result<()> {
    let config = TeevexaConfig::load_from(config_path)?;
    config.validate()?;

    if check {
        return Ok(());
    }
    print!("{}", render(&config)?);
    Ok(())
}

fn render(config: &TeevexaConfig) -> Result<String> {
    let mut shown = config.clone();
    if !shown.backend.anon_key.is_empty() {
        shown.backend.anon_key = "***".to_string();
    }
    shown.to_toml()
}
