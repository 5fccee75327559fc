//! Configuration system for the Terra Earth viewer.
//!
//! Settings persist to disk as RON and can be overridden from the command
//! line via clap. [`ConfigReloader`] picks up edits to the file while the
//! viewer runs. Every section uses `#[serde(default)]` so older or partial
//! files keep loading.

mod cli;
mod config;
mod error;
mod reload;

pub use cli::CliArgs;
pub use config::{
    CameraConfig, Config, DebugConfig, RenderConfig, SceneConfig, SunConfig, WindowConfig,
};
pub use error::ConfigError;
pub use reload::ConfigReloader;
