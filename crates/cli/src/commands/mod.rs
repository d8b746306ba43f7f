//! Command implementations.

mod info;
mod replay;
mod run;
mod validate;

use std::path::{Path, PathBuf};

use contracts::TrackerConfig;
use tracing::info;

use crate::error::{CliError, Result};

pub use info::run_info;
pub use replay::run_replay;
pub use run::run_relay;
pub use validate::run_validate;

/// Load the configuration file, or the built-in defaults when none is given
pub(crate) fn load_config(path: Option<&Path>) -> Result<TrackerConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            info!(config = %path.display(), "Loading configuration");
            Ok(config_loader::ConfigLoader::load_from_path(path)?)
        }
        None => {
            info!("No configuration file given, using defaults");
            Ok(TrackerConfig::default())
        }
    }
}

/// Apply command-line overrides, then re-check the result
pub(crate) fn apply_overrides(
    config: &mut TrackerConfig,
    input: Option<&PathBuf>,
    queue_dir: Option<&PathBuf>,
) -> Result<()> {
    if let Some(input) = input {
        info!(input = %input.display(), "Overriding input path from CLI");
        config.input.path = input.clone();
    }
    if let Some(dir) = queue_dir {
        info!(queue = %dir.display(), "Overriding queue directory from CLI");
        config.queue.path = dir.clone();
    }
    config_loader::ConfigLoader::validate(config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported() {
        let err = load_config(Some(Path::new("/nonexistent/gnss-relay.toml"))).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
    }

    #[test]
    fn defaults_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.queue.workers, 2);
    }

    #[test]
    fn overrides_are_applied_and_checked() {
        let mut config = TrackerConfig::default();
        apply_overrides(
            &mut config,
            Some(&PathBuf::from("-")),
            Some(&PathBuf::from("/var/spool/relay")),
        )
        .unwrap();
        assert_eq!(config.input.path, PathBuf::from("-"));
        assert_eq!(config.queue.path, PathBuf::from("/var/spool/relay"));

        assert!(apply_overrides(&mut config, None, Some(&PathBuf::new())).is_err());
    }
}
