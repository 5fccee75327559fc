//! Change detection for `config.ron` while the viewer runs.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::{CliArgs, Config, ConfigError};

/// Watches one config file by modification time.
///
/// Command-line overrides are re-applied to every reloaded config, so a flag
/// given at startup keeps winning over the file.
#[derive(Debug)]
pub struct ConfigReloader {
    path: PathBuf,
    overrides: CliArgs,
    modified: Option<SystemTime>,
    /// Last config read from disk, before overrides.
    on_disk: Config,
}

impl ConfigReloader {
    /// Start watching `config.ron` in `config_dir`. `on_disk` is what was
    /// last read from it (the defaults if loading failed).
    pub fn new(config_dir: &Path, on_disk: Config, overrides: CliArgs) -> Self {
        let path = Config::file_path(config_dir);
        let modified = modified_time(&path);
        Self {
            path,
            overrides,
            modified,
            on_disk,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file if it was touched since the last poll.
    ///
    /// Returns the new effective config (overrides applied) when the file's
    /// contents changed. A file that is missing, or saved without changes,
    /// yields `Ok(None)`. A broken file is reported once per modification and
    /// the previous config stays in effect.
    pub fn poll(&mut self) -> Result<Option<Config>, ConfigError> {
        let modified = modified_time(&self.path);
        if modified.is_none() || modified == self.modified {
            return Ok(None);
        }
        self.modified = modified;

        let on_disk = Config::read_file(&self.path)?;
        if on_disk == self.on_disk {
            return Ok(None);
        }
        self.on_disk = on_disk.clone();

        let mut config = on_disk;
        config.apply_cli_overrides(&self.overrides);
        log::info!("Reloaded {}", self.path.display());
        Ok(Some(config))
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Rewrite the file with a modification time the poller cannot miss,
    /// even on filesystems with coarse timestamps.
    fn touch_forward(path: &Path, step: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        let time = SystemTime::now() + Duration::from_secs(step);
        file.set_modified(time).unwrap();
    }

    fn write(dir: &Path, config: &Config, step: u64) {
        config.save(dir).unwrap();
        touch_forward(&Config::file_path(dir), step);
    }

    #[test]
    fn test_unchanged_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        let mut reloader = ConfigReloader::new(dir.path(), config, CliArgs::default());
        assert!(reloader.poll().unwrap().is_none());
    }

    #[test]
    fn test_edit_is_picked_up_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        let mut reloader = ConfigReloader::new(dir.path(), config.clone(), CliArgs::default());

        let mut edited = config;
        edited.scene.cloud_opacity = 0.5;
        write(dir.path(), &edited, 10);

        let reloaded = reloader.poll().unwrap().unwrap();
        assert_eq!(reloaded.scene.cloud_opacity, 0.5);
        assert!(reloader.poll().unwrap().is_none());
    }

    #[test]
    fn test_touch_without_changes_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        let mut reloader = ConfigReloader::new(dir.path(), config.clone(), CliArgs::default());
        write(dir.path(), &config, 10);
        assert!(reloader.poll().unwrap().is_none());
    }

    #[test]
    fn test_overrides_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        let overrides = CliArgs {
            stars: Some(42),
            ..CliArgs::default()
        };
        let mut reloader = ConfigReloader::new(dir.path(), config.clone(), overrides);

        let mut edited = config;
        edited.scene.num_stars = 9000;
        edited.scene.earth_spin = 0.01;
        write(dir.path(), &edited, 10);

        let reloaded = reloader.poll().unwrap().unwrap();
        assert_eq!(reloaded.scene.num_stars, 42);
        assert_eq!(reloaded.scene.earth_spin, 0.01);
    }

    #[test]
    fn test_broken_edit_reports_path_then_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        let mut reloader = ConfigReloader::new(dir.path(), config.clone(), CliArgs::default());

        let path = Config::file_path(dir.path());
        std::fs::write(&path, "(scene: (").unwrap();
        touch_forward(&path, 10);
        let err = reloader.poll().unwrap_err();
        assert_eq!(err.path(), reloader.path());
        // Same broken file is not re-reported.
        assert!(reloader.poll().unwrap().is_none());

        let mut fixed = config;
        fixed.scene.cloud_spin = 0.004;
        write(dir.path(), &fixed, 20);
        assert_eq!(reloader.poll().unwrap().unwrap().scene.cloud_spin, 0.004);
    }

    #[test]
    fn test_missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut reloader =
            ConfigReloader::new(dir.path(), Config::default(), CliArgs::default());
        assert!(reloader.poll().unwrap().is_none());
    }
}
