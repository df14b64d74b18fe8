//! Settings loaded from `config.toml`.
//!
//! Every section has defaults, so a missing file or a partial file is fine.

use anyhow::{Context, Result};
use ash::vk;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

cfg_if::cfg_if! {
    if #[cfg(debug_assertions)] {
        const DEFAULT_VALIDATION: bool = true;
    } else {
        const DEFAULT_VALIDATION: bool = false;
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub assets: AssetConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Engine".to_string(),
            width: 1700,
            height: 900,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub present_mode: String,
    pub max_frames_in_flight: usize,
    /// Timeout for fence waits and image acquisition, in nanoseconds.
    pub timeout_ns: u64,
    /// Number of frames per radian of the clear color flash.
    pub flash_period: f32,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            present_mode: "fifo".to_string(),
            max_frames_in_flight: 2,
            timeout_ns: 1_000_000_000,
            flash_period: 120.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub root: PathBuf,
    pub mesh: String,
    pub triangle_vertex_shader: String,
    pub mesh_vertex_shader: String,
    pub fragment_shader: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            mesh: "monkey_smooth.obj".to_string(),
            triangle_vertex_shader: "shaders/tri.vert.spv".to_string(),
            mesh_vertex_shader: "shaders/tri_mesh.vert.spv".to_string(),
            fragment_shader: "shaders/mesh.frag.spv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_layers: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: DEFAULT_VALIDATION,
            log_layers: true,
        }
    }
}

impl Config {
    /// Loads `config.toml` from the working directory, falling back to defaults on any error.
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE).unwrap_or_else(|e| {
            log::warn!("Failed to load {}: {:#}. Using defaults.", CONFIG_FILE, e);
            Config::default()
        })
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        match self.graphics.present_mode.to_lowercase().as_str() {
            "immediate" => vk::PresentModeKHR::IMMEDIATE,
            "mailbox" => vk::PresentModeKHR::MAILBOX,
            "fifo" => vk::PresentModeKHR::FIFO,
            "fifo_relaxed" => vk::PresentModeKHR::FIFO_RELAXED,
            other => {
                log::warn!("Unknown present mode '{}', defaulting to FIFO", other);
                vk::PresentModeKHR::FIFO
            }
        }
    }

    pub fn frames_in_flight(&self) -> usize {
        self.graphics.max_frames_in_flight.clamp(1, MAX_FRAMES_IN_FLIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tutorial_setup() {
        let config = Config::default();
        assert_eq!(config.window.width, 1700);
        assert_eq!(config.window.height, 900);
        assert_eq!(config.present_mode(), vk::PresentModeKHR::FIFO);
        assert_eq!(config.frames_in_flight(), 2);
        assert_eq!(config.graphics.timeout_ns, 1_000_000_000);
        assert_eq!(config.assets.mesh, "monkey_smooth.obj");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [window]
            title = "Monkey"

            [graphics]
            present_mode = "Mailbox"
            "#,
        )
        .unwrap();
        assert_eq!(config.window.title, "Monkey");
        assert_eq!(config.window.width, 1700);
        assert_eq!(config.present_mode(), vk::PresentModeKHR::MAILBOX);
        assert_eq!(config.assets.root, PathBuf::from("assets"));
    }

    #[test]
    fn unknown_present_mode_falls_back_to_fifo() {
        let config = Config::from_toml("[graphics]\npresent_mode = \"vsync-ish\"").unwrap();
        assert_eq!(config.present_mode(), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn frames_in_flight_is_clamped() {
        let zero = Config::from_toml("[graphics]\nmax_frames_in_flight = 0").unwrap();
        assert_eq!(zero.frames_in_flight(), 1);
        let many = Config::from_toml("[graphics]\nmax_frames_in_flight = 16").unwrap();
        assert_eq!(many.frames_in_flight(), MAX_FRAMES_IN_FLIGHT);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::from_toml("[window\nwidth = ").is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load_from_path("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.window.title, "Vulkan Engine");
    }
}
