//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Rendering settings.
    pub render: RenderConfig,
    /// Camera and orbit control settings.
    pub camera: CameraConfig,
    /// Earth, clouds, glow, starfield and sun settings.
    pub scene: SceneConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Start in fullscreen mode.
    pub fullscreen: bool,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Icosphere subdivision level for the earth layers.
    pub sphere_detail: u32,
    /// Background clear color (linear RGB).
    pub clear_color: [f64; 3],
    /// Render the globe layers as wireframe (needs `POLYGON_MODE_LINE`).
    pub wireframe: bool,
}

/// Perspective camera and orbit control configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
    /// Initial distance from the orbit target along +Z.
    pub distance: f32,
    /// Closest allowed orbit distance.
    pub min_distance: f32,
    /// Farthest allowed orbit distance.
    pub max_distance: f32,
    /// Fraction of orbit velocity removed each tick (0 disables damping).
    pub damping_factor: f32,
    /// Radians of orbit per pixel of drag.
    pub rotate_speed: f32,
    /// Zoom multiplier applied per scroll line.
    pub zoom_speed: f32,
}

/// Scene content configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Number of starfield points. Signed so bad values from files or the
    /// command line reach the starfield validator instead of failing to parse.
    pub num_stars: i64,
    /// Seed for the starfield RNG. `None` draws a fresh seed from the OS.
    pub star_seed: Option<u64>,
    /// Directory containing the earth and star textures.
    pub texture_dir: PathBuf,
    /// Axial tilt of the earth group in degrees.
    pub axial_tilt_deg: f32,
    /// Surface, lights and glow spin per simulation tick (radians).
    pub earth_spin: f32,
    /// Cloud layer spin per simulation tick (radians).
    pub cloud_spin: f32,
    /// Starfield spin per simulation tick (radians).
    pub star_spin: f32,
    /// Cloud layer opacity.
    pub cloud_opacity: f32,
    /// Optional alpha-test threshold for the cloud layer (disabled by default).
    pub cloud_alpha_test: Option<f32>,
    /// Fresnel glow rim color as `0xRRGGBB`.
    pub glow_rim_hex: u32,
    /// Fresnel glow facing color as `0xRRGGBB`.
    pub glow_facing_hex: u32,
    /// Directional sun light.
    pub sun: SunConfig,
}

/// Directional light configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SunConfig {
    /// Light color as `0xRRGGBB`.
    pub color_hex: u32,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Light position; the light shines from here toward the origin.
    pub position: [f32; 3],
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log frames-per-second once a second.
    pub show_fps: bool,
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
            title: "Terra".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sphere_detail: 6,
            clear_color: [0.0, 0.0, 0.0],
            wireframe: false,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            distance: 5.0,
            min_distance: 1.5,
            max_distance: 50.0,
            damping_factor: 0.05,
            rotate_speed: 0.005,
            zoom_speed: 0.95,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            num_stars: 2000,
            star_seed: None,
            texture_dir: PathBuf::from("textures"),
            axial_tilt_deg: 23.4,
            earth_spin: 0.002,
            cloud_spin: 0.0023,
            star_spin: -0.0002,
            cloud_opacity: 0.8,
            cloud_alpha_test: None,
            glow_rim_hex: 0x0088ff,
            glow_facing_hex: 0x000000,
            sun: SunConfig::default(),
        }
    }
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            color_hex: 0xffffff,
            intensity: 2.0,
            position: [-2.0, 0.5, 1.5],
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            show_fps: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Location of `config.ron` inside `config_dir`.
    pub fn file_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE)
    }

    /// Parse a config file.
    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::file_path(config_dir);
        if !path.exists() {
            let config = Self::default();
            config.save(config_dir)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }
        let config = Self::read_file(&path)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write `config.ron` into `config_dir`, creating the directory.
    ///
    /// The file is written beside the target and renamed over it, so a
    /// running viewer polling for changes never parses half a file.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = Self::file_path(config_dir);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };

        let text = ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::new()
                .depth_limit(3)
                .separate_tuple_members(true)
                .enumerate_arrays(false),
        )
        .map_err(|source| ConfigError::Serialize {
            path: path.clone(),
            source,
        })?;

        std::fs::create_dir_all(config_dir).map_err(write_err)?;
        let staging = path.with_extension("ron.tmp");
        std::fs::write(&staging, text).map_err(write_err)?;
        std::fs::rename(&staging, &path).map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("width: 1280"));
        assert!(ron_str.contains("num_stars: 2000"));
    }

    #[test]
    fn test_scene_defaults_match_demo() {
        let scene = SceneConfig::default();
        assert_eq!(scene.num_stars, 2000);
        assert!((scene.axial_tilt_deg - 23.4).abs() < 1e-6);
        assert!((scene.earth_spin - 0.002).abs() < 1e-9);
        assert!((scene.cloud_spin - 0.0023).abs() < 1e-9);
        assert!((scene.star_spin + 0.0002).abs() < 1e-9);
        assert_eq!(scene.glow_rim_hex, 0x0088ff);
        assert_eq!(scene.glow_facing_hex, 0x000000);
        assert!(scene.cloud_alpha_test.is_none());
        assert_eq!(scene.sun.position, [-2.0, 0.5, 1.5]);
    }

    #[test]
    fn test_camera_defaults_match_demo() {
        let camera = CameraConfig::default();
        assert_eq!(camera.fov_y_deg, 75.0);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 1000.0);
        assert_eq!(camera.distance, 5.0);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(window: (), render: (), camera: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.scene, SceneConfig::default());
        assert_eq!(config.debug, DebugConfig::default());
    }

    #[test]
    fn test_negative_star_count_still_parses() {
        let config: Config = ron::from_str("(scene: (num_stars: -5))").unwrap();
        assert_eq!(config.scene.num_stars, -5);
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.window.width = 1920;
        config.scene.num_stars = 500;
        config.scene.star_seed = Some(7);

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_save_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        Config::default().save(dir.path()).unwrap();
        Config::default().save(dir.path()).unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(CONFIG_FILE)]);
    }

    #[test]
    fn test_save_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        Config::default().save(&nested).unwrap();
        assert!(Config::file_path(&nested).is_file());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), Config::file_path(dir.path()));
        assert!(
            err.to_string()
                .contains(&Config::file_path(dir.path()).display().to_string())
        );
    }

    #[test]
    fn test_unreadable_path_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as text.
        std::fs::create_dir(dir.path().join(CONFIG_FILE)).unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
