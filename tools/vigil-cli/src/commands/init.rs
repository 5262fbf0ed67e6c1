//! Write a default configuration file.

use std::path::Path;

use vigil_common::config::{default_config_path, AppConfig};

pub fn run(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    if target.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            target.display()
        );
    }

    let config = AppConfig::default();
    config.save(Some(&target))?;

    println!("Wrote default configuration to {}", target.display());
    println!("  {}", config.summary());
    Ok(())
}
