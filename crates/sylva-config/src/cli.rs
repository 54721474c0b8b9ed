//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Sylva command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "sylva", about = "Biome asset residency driver")]
pub struct CliArgs {
    /// Path to the biome catalog manifest.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Base directory for relative asset URIs.
    #[arg(long)]
    pub asset_root: Option<PathBuf>,

    /// LOD transition pixel scale between models and impostors.
    #[arg(long)]
    pub lod_scale: Option<f32>,

    /// Overlay texture size in texels.
    #[arg(long)]
    pub texture_size: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of simulated frames to run.
    #[arg(long, default_value_t = 8)]
    pub frames: u32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref path) = args.catalog {
            self.catalog.path = path.clone();
        }
        if let Some(ref root) = args.asset_root {
            self.catalog.asset_root = Some(root.clone());
        }
        if let Some(scale) = args.lod_scale {
            self.residency.lod_transition_pixel_scale = scale;
        }
        if let Some(size) = args.texture_size {
            self.overlay.texture_size = size;
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
            catalog: Some(PathBuf::from("alpine.ron")),
            lod_scale: Some(12.0),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.catalog.path, PathBuf::from("alpine.ron"));
        assert_eq!(config.residency.lod_transition_pixel_scale, 12.0);
        // Non-overridden fields retain defaults
        assert_eq!(config.overlay.texture_size, 1024);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "sylva",
            "--lod-scale",
            "4.5",
            "--texture-size",
            "512",
            "--frames",
            "3",
        ]);
        assert_eq!(args.lod_scale, Some(4.5));
        assert_eq!(args.texture_size, Some(512));
        assert_eq!(args.frames, 3);
    }
}
