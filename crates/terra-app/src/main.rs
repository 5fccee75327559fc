//! `terra`: a rotating textured earth with clouds, night lights, an
//! atmospheric glow and a starfield.
//!
//! Run with: `cargo run -p terra-app -- --stars 20000 --textures assets/textures`

use std::path::PathBuf;

use clap::Parser;
use terra_app::platform::PlatformDirs;
use terra_app::run_with_config;
use terra_config::{CliArgs, Config, ConfigReloader};
use tracing::{error, info, warn};

fn main() {
    let args = CliArgs::parse();

    let dirs = PlatformDirs::resolve_and_create();
    let config_dir = match (&args.config, &dirs) {
        (Some(dir), _) => dir.clone(),
        (None, Ok(dirs)) => dirs.config_dir.clone(),
        (None, Err(_)) => PathBuf::from("."),
    };

    let loaded = Config::load_or_create(&config_dir);
    let on_disk = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };
    let mut config = on_disk.clone();
    config.apply_cli_overrides(&args);

    let log_dir = dirs.as_ref().ok().map(|d| d.log_dir.as_path());
    terra_log::init_logging(log_dir, cfg!(debug_assertions), Some(&config));

    if let Err(e) = &dirs {
        warn!("Platform directories unavailable: {e}");
    }
    if let Err(e) = &loaded {
        error!("Failed to load config: {e}; using defaults");
    }

    info!("Terra viewer");
    info!(
        "Window: {}x{} | fullscreen: {} | stars: {} | textures: {}",
        config.window.width,
        config.window.height,
        config.window.fullscreen,
        config.scene.num_stars,
        config.scene.texture_dir.display()
    );

    let reloader = ConfigReloader::new(&config_dir, on_disk, args);
    if let Err(e) = run_with_config(config, Some(reloader)) {
        error!("{e}");
        eprintln!("terra: {e}");
        std::process::exit(1);
    }
}
