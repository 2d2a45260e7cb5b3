//! Show or initialize the config file.

use std::path::Path;

use speedcue_common::config::AppConfig;

pub fn run(config: &AppConfig, path: &Path, init: bool, force: bool) -> anyhow::Result<()> {
    if init {
        if path.exists() && !force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        config.save_to(path)?;
        println!("Wrote config: {}", path.display());
        return Ok(());
    }

    let status = if path.exists() { "" } else { " (not present, using defaults)" };
    println!("Config file: {}{status}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
