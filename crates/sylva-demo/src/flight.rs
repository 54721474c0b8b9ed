//! A simulated flight: tiles scroll into and out of view under a camera that
//! climbs and pitches up towards the horizon.

use std::collections::HashMap;

use glam::DVec3;
use sylva_overlay::{CullView, Ellipsoid, OverlayProjector};
use sylva_procedural::{AssetGroup, BiomeId, BiomeManager, LoadOptions, TileKey};
use tracing::{debug, info};

/// Terrain LOD of the simulated tiles.
const TILE_LOD: u32 = 14;
/// Tiles visible at once.
const VISIBLE_TILES: u32 = 6;
/// Rows of tiles visible at once.
const VISIBLE_ROWS: u32 = 2;
/// Starting altitude in meters.
const START_ALTITUDE: f64 = 1_500.0;
/// Climb per frame in meters.
const CLIMB_PER_FRAME: f64 = 750.0;
/// Longitude travelled per frame, in radians.
const LONGITUDE_PER_FRAME: f64 = 2.0e-4;

pub struct Flight<'a> {
    manager: &'a BiomeManager,
    ellipsoid: Ellipsoid,
    biomes: Vec<BiomeId>,
    visible: HashMap<TileKey, BiomeId>,
    last_revision: Option<u64>,
    options: LoadOptions,
}

impl<'a> Flight<'a> {
    pub fn new(manager: &'a BiomeManager, ellipsoid: Ellipsoid) -> Self {
        Self {
            manager,
            ellipsoid,
            biomes: manager.catalog().biome_ids().collect(),
            visible: HashMap::new(),
            last_revision: None,
            options: LoadOptions::default().with_hint("source", "sylva-demo"),
        }
    }

    /// Which biome covers a tile. Deterministic so reruns are comparable.
    fn biome_at(&self, key: &TileKey) -> Option<BiomeId> {
        if self.biomes.is_empty() {
            return None;
        }
        let index = (key.x / 3 + key.y) as usize % self.biomes.len();
        Some(self.biomes[index])
    }

    pub fn step(&mut self, frame: u32, frames: u32, projector: &mut OverlayProjector) {
        self.scroll_tiles(frame);

        let revision = self.manager.revision();
        if self.last_revision != Some(revision) {
            self.last_revision = Some(revision);
            self.report_residency(frame, revision);
        }

        self.fly_overlay(frame, frames, projector);
    }

    fn scroll_tiles(&mut self, frame: u32) {
        let in_view: HashMap<TileKey, BiomeId> = (frame..frame + VISIBLE_TILES)
            .flat_map(|x| (0..VISIBLE_ROWS).map(move |y| TileKey::new(TILE_LOD, x, y)))
            .filter_map(|key| self.biome_at(&key).map(|biome| (key, biome)))
            .collect();

        for (key, biome) in &in_view {
            if !self.visible.contains_key(key) {
                self.manager.ref_biome_for_tile(*biome, key);
            }
        }
        for (key, biome) in &self.visible {
            if !in_view.contains_key(key) {
                self.manager.unref_biome(*biome);
            }
        }
        self.visible = in_view;
    }

    fn report_residency(&self, frame: u32, revision: u64) {
        let resident = self.manager.resident_biomes(&self.options);
        info!(
            "Frame {frame} (revision {revision}): {} resident biomes, {} resident assets, {} textures",
            resident.len(),
            self.manager.resident_assets().len(),
            self.manager.texture_arena_len()
        );

        let catalog = self.manager.catalog();
        for (biome, groups) in &resident {
            for group in AssetGroup::ALL {
                let instances = groups.group(group);
                if instances.is_empty() {
                    continue;
                }
                let names: Vec<&str> = instances
                    .iter()
                    .map(|instance| instance.asset.asset().name.as_str())
                    .collect();
                debug!(
                    "  {} / {}: {}",
                    catalog.biome_name(*biome),
                    group.name(),
                    names.join(", ")
                );
            }
        }
    }

    fn fly_overlay(&self, frame: u32, frames: u32, projector: &mut OverlayProjector) {
        let altitude = START_ALTITUDE + CLIMB_PER_FRAME * f64::from(frame);
        let longitude = LONGITUDE_PER_FRAME * f64::from(frame);
        let radial = DVec3::new(longitude.cos(), longitude.sin(), 0.0);
        let east = DVec3::new(-longitude.sin(), longitude.cos(), 0.0);
        let eye = radial * (self.ellipsoid.radius_equator + altitude);

        // Pitch from straight down to level with the horizon over the flight.
        let t = f64::from(frame) / f64::from(frames.max(2) - 1);
        let pitch = t * std::f64::consts::FRAC_PI_2;
        let look = -radial * pitch.cos() + east * pitch.sin();

        let view = CullView::looking_at(eye, eye + look, DVec3::Z, 60f64.to_radians(), 16.0 / 9.0);
        if projector.cull(&view) {
            projector.update();
            debug!(
                "Frame {frame}: overlay extent {:.0} m at altitude {altitude:.0} m",
                projector.extent()
            );
        }
    }

    /// Releases every tile and reports what is left resident (nothing).
    pub fn land(mut self) {
        for (_, biome) in self.visible.drain() {
            self.manager.unref_biome(biome);
        }
        self.manager.reset();
        info!(
            "Landed: {} active biomes, {} resident assets",
            self.manager.active_biomes().len(),
            self.manager.resident_assets().len()
        );
    }
}
