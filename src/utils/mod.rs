use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::core::config::{ConfigFormat, ConfigManager, ConfigProvider};

pub fn initialize_repository(config_path: Option<PathBuf>) -> Result<()> {
    let config_manager = get_config_manager(config_path)?;
    let path = config_manager.get_config_path()?;
    if config_manager.initialize()? {
        println!("✓ Wrote starter configuration to {}", path.display());
        println!("Add a [[suite]] per component, then run 'git-build-trigger validate'");
    } else {
        println!("✓ Configuration already present at {}", path.display());
    }
    Ok(())
}

pub fn validate_configuration(config_path: Option<PathBuf>) -> Result<()> {
    get_config_manager(config_path)?.validate_config()
}

pub fn export_configuration(
    config_path: Option<PathBuf>,
    output: &Path,
    format: Option<&str>,
) -> Result<()> {
    let format = match format {
        Some(name) => ConfigFormat::from_name(name),
        None => ConfigFormat::from_path(output),
    };
    get_config_manager(config_path)?.export_config(output, format)?;
    println!("✓ Exported configuration to {}", output.display());
    Ok(())
}

// Helper function to create ConfigManager instance
pub fn get_config_manager(config_path: Option<PathBuf>) -> Result<ConfigManager> {
    let manager = ConfigManager::new()?;
    Ok(match config_path {
        Some(path) => manager.with_config_path(path),
        None => manager,
    })
}
