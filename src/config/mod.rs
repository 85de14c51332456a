mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config.cache.dir = expand_path(&config.cache.dir);

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./lazyhls.toml",
        "./config.toml",
        "~/.config/lazyhls/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.cache.dir.as_os_str().is_empty() {
        anyhow::bail!("Cache directory cannot be empty");
    }

    if config.transcode.gop_size == 0 {
        anyhow::bail!("Transcode gop_size must be at least 1");
    }

    if config.transcode.timeout_secs == Some(0) {
        anyhow::bail!("Transcode timeout_secs cannot be 0; omit it for no limit");
    }

    for (name, path) in [
        ("ffmpeg", config.tools.ffmpeg_path.as_ref()),
        ("ffprobe", config.tools.ffprobe_path.as_ref()),
    ] {
        if let Some(p) = path {
            if !p.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, p);
            }
        }
    }

    Ok(())
}
