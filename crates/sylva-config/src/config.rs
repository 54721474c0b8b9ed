//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration inside the config directory.
const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Biome asset residency settings.
    pub residency: ResidencyConfig,
    /// Biome catalog location.
    pub catalog: CatalogConfig,
    /// Projected overlay settings.
    pub overlay: OverlayConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Residency manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResidencyConfig {
    /// Pixel scale at which a full model hands over to its impostor.
    pub lod_transition_pixel_scale: f32,
}

/// Where to find the biome catalog and the assets it references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the RON catalog manifest.
    pub path: PathBuf,
    /// Base directory for relative model and billboard URIs.
    /// Defaults to the directory containing the manifest.
    pub asset_root: Option<PathBuf>,
}

/// Projected overlay (render-to-texture) configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    /// Width and height of the square overlay texture in texels.
    pub texture_size: u32,
    /// Texture unit the projected texture is bound to.
    pub texture_unit: u32,
    /// Equatorial radius of the reference ellipsoid in meters.
    pub ellipsoid_radius_equator: f64,
    /// Polar radius of the reference ellipsoid in meters.
    pub ellipsoid_radius_polar: f64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for ResidencyConfig {
    fn default() -> Self {
        Self {
            lod_transition_pixel_scale: 8.0,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("biomes.ron"),
            asset_root: None,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            texture_size: 1024,
            texture_unit: 1,
            ellipsoid_radius_equator: 6_378_137.0,
            ellipsoid_radius_polar: 6_356_752.314_245,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl CatalogConfig {
    /// Directory that relative asset URIs resolve against.
    pub fn resolved_asset_root(&self) -> PathBuf {
        match &self.asset_root {
            Some(root) => root.clone(),
            None => self
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Platform config directory for sylva, if the platform defines one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sylva"))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
