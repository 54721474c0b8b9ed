//! Drives a [`BiomeManager`] and an [`OverlayProjector`] through a simulated flight.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Without a catalog manifest on disk the built-in sample world is used.
//! Run with `cargo run -p sylva-demo -- --frames 32 --log-level debug`.

mod flight;
mod sample;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use sylva_config::{CliArgs, Config};
use sylva_overlay::{Ellipsoid, OverlayProjector};
use sylva_procedural::{
    AssetGroup, BiomeCatalog, BiomeManager, FileSystemLoader, ResourceLoader, impostor,
};
use tracing::{error, info, warn};

fn load_world(config: &Config) -> Option<(BiomeCatalog, Arc<dyn ResourceLoader>)> {
    let path = &config.catalog.path;
    if path.exists() {
        return match BiomeCatalog::load(path) {
            Ok(catalog) => {
                let root = config.catalog.resolved_asset_root();
                info!(
                    "Loaded {} biomes and {} assets from {}; assets under {}",
                    catalog.biome_count(),
                    catalog.asset_count(),
                    path.display(),
                    root.display()
                );
                let loader: Arc<dyn ResourceLoader> = Arc::new(FileSystemLoader::new(root));
                Some((catalog, loader))
            }
            Err(e) => {
                error!("Failed to load catalog {}: {e}", path.display());
                None
            }
        };
    }

    warn!("No catalog at {}, using the sample world", path.display());
    match sample::sample_world() {
        Ok((catalog, loader)) => {
            let loader: Arc<dyn ResourceLoader> = Arc::new(loader);
            Some((catalog, loader))
        }
        Err(e) => {
            error!("Failed to build the sample world: {e}");
            None
        }
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(Config::default_dir)
        .unwrap_or_else(|| PathBuf::from(".sylva"));

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    sylva_log::init_logging(
        Some(&config_dir.join("logs")),
        cfg!(debug_assertions),
        Some(&config),
    );

    let Some((catalog, loader)) = load_world(&config) else {
        return ExitCode::FAILURE;
    };

    let manager = BiomeManager::new(Arc::new(catalog), loader)
        .with_lod_transition_pixel_scale(config.residency.lod_transition_pixel_scale);
    for group in AssetGroup::ALL {
        manager.set_create_function(group, Arc::new(impostor::crossed_billboard));
    }

    let ellipsoid = Ellipsoid::new(
        config.overlay.ellipsoid_radius_equator,
        config.overlay.ellipsoid_radius_polar,
    );
    let mut projector = OverlayProjector::new(
        ellipsoid,
        config.overlay.texture_size,
        config.overlay.texture_unit,
    );

    let mut flight = flight::Flight::new(&manager, ellipsoid);
    for frame in 0..args.frames {
        if frame == args.frames / 2 && frame > 0 {
            let scale = manager.lod_transition_pixel_scale() * 2.0;
            info!("Frame {frame}: LOD transition pixel scale -> {scale}");
            manager.set_lod_transition_pixel_scale(scale);
        }
        flight.step(frame, args.frames, &mut projector);
    }

    flight.land();
    ExitCode::SUCCESS
}
