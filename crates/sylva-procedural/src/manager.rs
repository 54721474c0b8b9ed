//! The [`BiomeManager`] facade tying reference counting, residency and
//! materialization together.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::catalog::{AssetGroup, BiomeCatalog, BiomeId};
use crate::impostor::CreateImpostorFn;
use crate::loader::{LoadOptions, ResourceLoader};
use crate::materializer;
use crate::reference::{ReferenceTracker, TileKey};
use crate::resident::{ResidentBiomes, ResidentData, ResidentModelAsset};

/// Pixel scale at which full models hand over to impostors, unless configured.
pub const DEFAULT_LOD_TRANSITION_PIXEL_SCALE: f32 = 8.0;

/// Tracks which biomes are in view and keeps their assets resident.
///
/// The terrain engine calls [`ref_biome`](Self::ref_biome) /
/// [`unref_biome`](Self::unref_biome) as tiles come and go, polls
/// [`revision`](Self::revision), and calls
/// [`resident_biomes`](Self::resident_biomes) when it changes.
///
/// # Locking
///
/// Reference counts and resident data sit behind two separate locks. A
/// resolution pass copies the counts into a [`ReferenceSnapshot`] under the
/// first lock, releases it, and only then takes the second. No method holds
/// both at once, so callers may use any method from any thread.
///
/// Materialization performs loader I/O while holding the resident lock;
/// concurrent readers of resident data wait for it.
///
/// [`ReferenceSnapshot`]: crate::ReferenceSnapshot
pub struct BiomeManager {
    catalog: Arc<BiomeCatalog>,
    loader: Arc<dyn ResourceLoader>,
    references: ReferenceTracker,
    resident: Mutex<ResidentData>,
}

impl BiomeManager {
    /// Creates a manager over `catalog` that loads through `loader`.
    pub fn new(catalog: Arc<BiomeCatalog>, loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            catalog,
            loader,
            references: ReferenceTracker::new(),
            resident: Mutex::new(ResidentData::new(DEFAULT_LOD_TRANSITION_PIXEL_SCALE)),
        }
    }

    /// Sets the initial LOD transition pixel scale. Nothing is resident yet,
    /// so unlike [`set_lod_transition_pixel_scale`](Self::set_lod_transition_pixel_scale)
    /// the revision is left alone.
    pub fn with_lod_transition_pixel_scale(mut self, scale: f32) -> Self {
        self.resident
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .lod_transition_pixel_scale = scale;
        self
    }

    fn lock_resident(&self) -> MutexGuard<'_, ResidentData> {
        self.resident.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The catalog this manager resolves biomes against.
    pub fn catalog(&self) -> &Arc<BiomeCatalog> {
        &self.catalog
    }

    // -----------------------------------------------------------------------
    // Reference counting
    // -----------------------------------------------------------------------

    /// Adds a reference to `biome`.
    pub fn ref_biome(&self, biome: BiomeId) {
        if self.references.ref_biome(biome) {
            log::info!("Hello, {}", self.catalog.biome_name(biome));
        }
    }

    /// Adds a reference to `biome` on behalf of the terrain tile `key`.
    pub fn ref_biome_for_tile(&self, biome: BiomeId, key: &TileKey) {
        log::trace!(
            "Tile {}/{}/{} references {}",
            key.lod,
            key.x,
            key.y,
            self.catalog.biome_name(biome)
        );
        self.ref_biome(biome);
    }

    /// Drops a reference to `biome`. Unreferencing a biome with no references is ignored.
    pub fn unref_biome(&self, biome: BiomeId) {
        if self.references.unref_biome(biome) {
            log::info!("Goodbye, {}", self.catalog.biome_name(biome));
        }
    }

    /// Drops every reference, then resolves so all resident data is released.
    pub fn reset(&self) {
        for biome in self.references.reset() {
            log::info!("Goodbye, {}", self.catalog.biome_name(biome));
        }
        self.recalculate_resident_biomes();
    }

    /// Bumped whenever the resident set may have changed.
    pub fn revision(&self) -> u64 {
        self.references.revision()
    }

    /// Every biome with at least one reference, sorted.
    pub fn active_biomes(&self) -> Vec<BiomeId> {
        self.references.active_biomes()
    }

    // -----------------------------------------------------------------------
    // Residency
    // -----------------------------------------------------------------------

    /// Every materialized asset, sorted by asset id.
    pub fn resident_assets(&self) -> Vec<Arc<ResidentModelAsset>> {
        let resident = self.lock_resident();
        let mut assets: Vec<_> = resident.assets.values().cloned().collect();
        assets.sort_unstable_by_key(|asset| asset.asset_id());
        assets
    }

    /// Brings the resident biome table in line with the current reference
    /// counts and evicts assets no resident biome uses anymore.
    pub fn recalculate_resident_biomes(&self) {
        let snapshot = self.references.snapshot();

        let mut resident = self.lock_resident();
        resident.apply_snapshot(&snapshot);
        let evicted = resident.evict_unused();
        if !evicted.is_empty() {
            log::debug!(
                "Revision {}: evicted {} assets, {} still resident",
                snapshot.revision,
                evicted.len(),
                resident.assets.len()
            );
        }
    }

    /// Rebuilds the instance lists of every resident biome, loading assets
    /// that are not materialized yet. Returns how many were loaded.
    ///
    /// Load failures are logged and leave the affected model or texture absent.
    pub fn materialize_new_assets(&self, options: &LoadOptions) -> usize {
        let mut resident = self.lock_resident();
        materializer::materialize_new_assets(
            &mut resident,
            &self.catalog,
            self.loader.as_ref(),
            options,
        )
    }

    /// Resolves, materializes, and returns a copy of the resident biome table.
    pub fn resident_biomes(&self, options: &LoadOptions) -> ResidentBiomes {
        self.recalculate_resident_biomes();
        self.materialize_new_assets(options);
        self.lock_resident().biomes.clone()
    }

    /// Groups that produced at least one instance in the last materialization.
    pub fn active_asset_groups(&self) -> BTreeSet<AssetGroup> {
        self.lock_resident().active_groups.clone()
    }

    /// Number of live textures referenced by resident chonks.
    pub fn texture_arena_len(&self) -> usize {
        self.lock_resident().textures.len()
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Registers the impostor builder for `group`. Applies to assets
    /// materialized from now on.
    pub fn set_create_function(&self, group: AssetGroup, create: CreateImpostorFn) {
        self.lock_resident().create_impostor[group.index()] = Some(create);
    }

    /// Changes the pixel scale at which models hand over to impostors.
    ///
    /// LOD thresholds are baked into every chonk, so all materialized assets
    /// are dropped and the revision is bumped to trigger a rebuild.
    pub fn set_lod_transition_pixel_scale(&self, scale: f32) {
        {
            let mut resident = self.lock_resident();
            resident.lod_transition_pixel_scale = scale;
            resident.clear_assets();
        }
        let revision = self.references.bump_revision();
        log::debug!("LOD transition pixel scale set to {scale} (revision {revision})");
    }

    /// The pixel scale at which models hand over to impostors.
    pub fn lod_transition_pixel_scale(&self) -> f32 {
        self.lock_resident().lod_transition_pixel_scale
    }
}
