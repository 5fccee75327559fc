//! Command-line argument parsing for the Terra viewer.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Terra command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "terra", about = "Rotating textured Earth with clouds, glow and stars")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Number of stars in the starfield.
    #[arg(long, allow_negative_numbers = true)]
    pub stars: Option<i64>,

    /// Seed for the starfield generator.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory holding the earth and star textures.
    #[arg(long)]
    pub textures: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(fs) = args.fullscreen {
            self.window.fullscreen = fs;
        }
        if let Some(stars) = args.stars {
            self.scene.num_stars = stars;
        }
        if let Some(seed) = args.seed {
            self.scene.star_seed = Some(seed);
        }
        if let Some(ref dir) = args.textures {
            self.scene.texture_dir = dir.clone();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            width: Some(1920),
            stars: Some(10_000),
            seed: Some(42),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.scene.num_stars, 10_000);
        assert_eq!(config.scene.star_seed, Some(42));
        // Non-overridden fields retain defaults
        assert_eq!(config.window.height, 720);
        assert_eq!(config.scene.texture_dir, PathBuf::from("textures"));
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_negative_star_count() {
        let args = CliArgs::try_parse_from(["terra", "--stars", "-3"]).unwrap();
        assert_eq!(args.stars, Some(-3));
    }

    #[test]
    fn test_cli_parses_paths_and_level() {
        let args = CliArgs::try_parse_from([
            "terra",
            "--textures",
            "assets/tex",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let mut config = Config::default();
        config.apply_cli_overrides(&args);
        assert_eq!(config.scene.texture_dir, PathBuf::from("assets/tex"));
        assert_eq!(config.debug.log_level, "debug");
    }
}
