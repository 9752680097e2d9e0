//! CLI subcommands.

pub mod batch;
pub mod process;

use std::path::Path;

use tavla_core::TavlaConfig;

/// Load configuration from a file, or fall back to defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<TavlaConfig> {
    match path {
        Some(path) => Ok(TavlaConfig::from_file(Path::new(path))?),
        None => Ok(TavlaConfig::default()),
    }
}
