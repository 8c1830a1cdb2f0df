use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load, parse and validate a planning configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open config file {:?}", config_path))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse config file {:?}", config_path))?;

    config.validate()?;

    info!(
        "Configuration: {} routers, {} VLAN ids, {} links",
        config.routers,
        config.vlans.len(),
        config.links.len()
    );

    Ok(config)
}

/// Apply a seed given on the command line over the one in the file
pub fn apply_seed_override(config: &mut Config, seed: Option<u64>) {
    if let Some(seed) = seed {
        info!("Using seed {} from the command line", seed);
        config.seed = Some(seed);
    }
}
