//! Procedural biome asset residency.
//!
//! The terrain engine references biomes as tiles come into view. The
//! [`BiomeManager`] turns those reference counts into a resident set of
//! biomes, loads (and deduplicates) the models and billboard textures each
//! resident biome uses, and packs them into draw batches ([`Chonk`]s) with
//! baked level-of-detail thresholds.
//!
//! Reference counting and resident data live behind two independent locks
//! that are never held at the same time; see [`BiomeManager`] for the
//! protocol.

mod catalog;
mod chonk;
mod error;
mod loader;
mod manager;
mod material;
mod materializer;
mod raster;
mod reference;
mod resident;
mod scene;
mod texture;
mod uri;

pub mod impostor;

pub use catalog::{
    AssetGroup, AssetUsage, Biome, BiomeCatalog, BiomeId, CatalogManifest, ModelAsset,
    ModelAssetId,
};
pub use chonk::{Chonk, ChonkDraw, ChonkFactory};
pub use error::{CatalogError, LoadError};
pub use impostor::{CreateImpostorFn, ImpostorTextures};
pub use loader::{FileSystemLoader, LoadOptions, MemoryLoader, ModelFile, ResourceLoader};
pub use manager::{BiomeManager, DEFAULT_LOD_TRANSITION_PIXEL_SCALE};
pub use material::MaterialLoader;
pub use raster::{Image, PixelFormat, pack_normal_octahedral};
pub use reference::{ReferenceSnapshot, ReferenceTracker, TileKey};
pub use resident::{
    ResidentBiome, ResidentBiomes, ResidentModelAsset, ResidentModelAssetInstance,
};
pub use scene::{ALBEDO_UNIT, BoundingBox, Geometry, NORMAL_MAP_UNIT, Node};
pub use texture::{Texture, TextureArena, TextureId, TextureSlot};
pub use uri::Uri;
