//! Biome and model-asset catalog.
//!
//! The catalog is immutable once handed to a [`BiomeManager`](crate::BiomeManager).
//! Biomes and assets are addressed by dense ids ([`BiomeId`], [`ModelAssetId`])
//! that index into the catalog; names are kept for logging and manifest
//! cross-references.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::uri::Uri;

/// Extent used for an asset's impostor box when the manifest omits one.
const DEFAULT_ASSET_EXTENT: f32 = 3.0;

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Unique identifier for a biome within a catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BiomeId(pub u16);

/// Unique identifier for a model asset within a catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelAssetId(pub u32);

/// Category of placed content. Each biome configures every group independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetGroup {
    /// Tall vegetation.
    Trees,
    /// Ground cover, bushes and grass.
    Undergrowth,
}

impl AssetGroup {
    /// Number of asset groups.
    pub const COUNT: usize = 2;

    /// Every group, in index order.
    pub const ALL: [AssetGroup; Self::COUNT] = [AssetGroup::Trees, AssetGroup::Undergrowth];

    /// Dense index of this group, in `0..COUNT`.
    pub fn index(self) -> usize {
        match self {
            AssetGroup::Trees => 0,
            AssetGroup::Undergrowth => 1,
        }
    }

    /// Lower-case display name.
    pub fn name(self) -> &'static str {
        match self {
            AssetGroup::Trees => "trees",
            AssetGroup::Undergrowth => "undergrowth",
        }
    }
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Definition of a placeable model: the full model plus optional billboards.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelAsset {
    /// Human-readable asset name.
    pub name: String,
    /// Full 3-D model.
    pub model: Option<Uri>,
    /// Side billboard image. Defaults to `<model>.side.png`.
    pub side_billboard: Option<Uri>,
    /// Top-down billboard image. Defaults to `<model>.top.png`.
    pub top_billboard: Option<Uri>,
    /// Explicit normal map for the side billboard; probed when unset.
    pub side_normal_map: Option<Uri>,
    /// Explicit normal map for the top billboard; probed when unset.
    pub top_normal_map: Option<Uri>,
    /// Horizontal half-extent in meters.
    pub width: f32,
    /// Height in meters.
    pub height: f32,
}

impl ModelAsset {
    /// Creates an asset with no resources and the default extent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
            side_billboard: None,
            top_billboard: None,
            side_normal_map: None,
            top_normal_map: None,
            width: DEFAULT_ASSET_EXTENT,
            height: DEFAULT_ASSET_EXTENT,
        }
    }

    /// Sets the model URI.
    pub fn with_model(mut self, uri: impl Into<Uri>) -> Self {
        self.model = Some(uri.into());
        self
    }

    /// Sets an explicit side billboard URI.
    pub fn with_side_billboard(mut self, uri: impl Into<Uri>) -> Self {
        self.side_billboard = Some(uri.into());
        self
    }

    /// Sets an explicit top billboard URI.
    pub fn with_top_billboard(mut self, uri: impl Into<Uri>) -> Self {
        self.top_billboard = Some(uri.into());
        self
    }

    /// Sets an explicit side billboard normal map, skipping the probe.
    pub fn with_side_normal_map(mut self, uri: impl Into<Uri>) -> Self {
        self.side_normal_map = Some(uri.into());
        self
    }

    /// Sets an explicit top billboard normal map, skipping the probe.
    pub fn with_top_normal_map(mut self, uri: impl Into<Uri>) -> Self {
        self.top_normal_map = Some(uri.into());
        self
    }

    /// Sets the impostor fallback extent.
    pub fn with_extent(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Side billboard to load: the explicit URI, else `<model>.side.png`.
    pub fn side_billboard_uri(&self) -> Option<Uri> {
        self.side_billboard
            .clone()
            .or_else(|| self.model.as_ref().map(|m| m.with_suffix(".side.png")))
            .filter(|uri| !uri.is_empty())
    }

    /// Top billboard to load: the explicit URI, else `<model>.top.png`.
    pub fn top_billboard_uri(&self) -> Option<Uri> {
        self.top_billboard
            .clone()
            .or_else(|| self.model.as_ref().map(|m| m.with_suffix(".top.png")))
            .filter(|uri| !uri.is_empty())
    }
}

/// One weighted entry in a biome's asset group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AssetUsage {
    /// The referenced asset.
    pub asset: ModelAssetId,
    /// Relative selection weight within the group.
    pub weight: f32,
    /// Fraction of candidate placements this asset fills, in `[0.0, 1.0]`.
    pub coverage: f32,
}

/// A named ecological zone and the assets it places, per group.
#[derive(Clone, Debug, PartialEq)]
pub struct Biome {
    /// Human-readable biome name.
    pub name: String,
    groups: [Vec<AssetUsage>; AssetGroup::COUNT],
}

impl Biome {
    /// Creates a biome with every group empty.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Default::default(),
        }
    }

    /// Appends an asset to `group`.
    pub fn with_asset(
        mut self,
        group: AssetGroup,
        asset: ModelAssetId,
        weight: f32,
        coverage: f32,
    ) -> Self {
        self.groups[group.index()].push(AssetUsage {
            asset,
            weight,
            coverage,
        });
        self
    }

    /// The ordered asset list configured for `group`.
    pub fn assets(&self, group: AssetGroup) -> &[AssetUsage] {
        &self.groups[group.index()]
    }
}

// ---------------------------------------------------------------------------
// RON manifest types
// ---------------------------------------------------------------------------

/// Top-level RON manifest describing assets and biomes.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogManifest {
    /// Model asset definitions.
    #[serde(default)]
    pub assets: Vec<ModelAssetEntry>,
    /// Biome definitions referencing assets by name.
    #[serde(default)]
    pub biomes: Vec<BiomeEntry>,
}

/// A model asset entry in the manifest.
#[derive(Debug, Deserialize)]
pub struct ModelAssetEntry {
    /// Unique asset name.
    pub name: String,
    /// Model URI.
    #[serde(default)]
    pub model: Option<Uri>,
    /// Side billboard URI.
    #[serde(default)]
    pub side_billboard: Option<Uri>,
    /// Top billboard URI.
    #[serde(default)]
    pub top_billboard: Option<Uri>,
    /// Side billboard normal map URI.
    #[serde(default)]
    pub side_normal_map: Option<Uri>,
    /// Top billboard normal map URI.
    #[serde(default)]
    pub top_normal_map: Option<Uri>,
    /// Horizontal half-extent.
    #[serde(default = "default_extent")]
    pub width: f32,
    /// Height.
    #[serde(default = "default_extent")]
    pub height: f32,
}

/// A biome entry in the manifest.
#[derive(Debug, Deserialize)]
pub struct BiomeEntry {
    /// Unique biome name.
    pub name: String,
    /// Tree assets.
    #[serde(default)]
    pub trees: Vec<AssetUsageEntry>,
    /// Undergrowth assets.
    #[serde(default)]
    pub undergrowth: Vec<AssetUsageEntry>,
}

/// A weighted asset reference in the manifest.
#[derive(Debug, Deserialize)]
pub struct AssetUsageEntry {
    /// Name of a manifest asset.
    pub asset: String,
    /// Selection weight.
    #[serde(default = "default_unit")]
    pub weight: f32,
    /// Coverage fraction.
    #[serde(default = "default_unit")]
    pub coverage: f32,
}

fn default_extent() -> f32 {
    DEFAULT_ASSET_EXTENT
}

fn default_unit() -> f32 {
    1.0
}

// ---------------------------------------------------------------------------
// BiomeCatalog
// ---------------------------------------------------------------------------

/// Stores all biome and model-asset definitions with O(1) lookup by id.
#[derive(Debug, Default)]
pub struct BiomeCatalog {
    assets: Vec<Arc<ModelAsset>>,
    biomes: Vec<Arc<Biome>>,
    asset_names: HashMap<String, ModelAssetId>,
    biome_names: HashMap<String, BiomeId>,
}

impl BiomeCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model asset, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateAsset`] if the name is taken, or
    /// [`CatalogError::CatalogFull`] once every `u32` id is in use.
    pub fn add_asset(&mut self, asset: ModelAsset) -> Result<ModelAssetId, CatalogError> {
        if self.asset_names.contains_key(&asset.name) {
            return Err(CatalogError::DuplicateAsset(asset.name));
        }
        let id = u32::try_from(self.assets.len())
            .map(ModelAssetId)
            .map_err(|_| CatalogError::CatalogFull {
                kind: "model assets",
                limit: u64::from(u32::MAX) + 1,
            })?;
        self.asset_names.insert(asset.name.clone(), id);
        self.assets.push(Arc::new(asset));
        Ok(id)
    }

    /// Registers a biome, returning its id.
    ///
    /// Asset ids are not validated here; an id with no definition is skipped
    /// (with a warning) when the biome is materialized.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateBiome`] if the name is taken, or
    /// [`CatalogError::CatalogFull`] once every `u16` id is in use.
    pub fn add_biome(&mut self, biome: Biome) -> Result<BiomeId, CatalogError> {
        if self.biome_names.contains_key(&biome.name) {
            return Err(CatalogError::DuplicateBiome(biome.name));
        }
        let id = u16::try_from(self.biomes.len())
            .map(BiomeId)
            .map_err(|_| CatalogError::CatalogFull {
                kind: "biomes",
                limit: u64::from(u16::MAX) + 1,
            })?;
        self.biome_names.insert(biome.name.clone(), id);
        self.biomes.push(Arc::new(biome));
        Ok(id)
    }

    /// The asset definition for `id`, if any.
    pub fn asset(&self, id: ModelAssetId) -> Option<&Arc<ModelAsset>> {
        self.assets.get(id.0 as usize)
    }

    /// The biome definition for `id`, if any.
    pub fn biome(&self, id: BiomeId) -> Option<&Arc<Biome>> {
        self.biomes.get(id.0 as usize)
    }

    /// Looks up an asset id by name.
    pub fn lookup_asset(&self, name: &str) -> Option<ModelAssetId> {
        self.asset_names.get(name).copied()
    }

    /// Looks up a biome id by name.
    pub fn lookup_biome(&self, name: &str) -> Option<BiomeId> {
        self.biome_names.get(name).copied()
    }

    /// Display name of a biome, or a placeholder for unknown ids.
    pub fn biome_name(&self, id: BiomeId) -> &str {
        self.biome(id).map_or("<unknown biome>", |b| b.name.as_str())
    }

    /// Every biome id, in registration order.
    pub fn biome_ids(&self) -> impl Iterator<Item = BiomeId> + '_ {
        (0..self.biomes.len()).map_while(|i| u16::try_from(i).ok().map(BiomeId))
    }

    /// Number of registered biomes.
    pub fn biome_count(&self) -> usize {
        self.biomes.len()
    }

    /// Number of registered model assets.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Builds a catalog from a parsed manifest, resolving asset names.
    pub fn from_manifest(manifest: CatalogManifest) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();

        for entry in manifest.assets {
            catalog.add_asset(ModelAsset {
                name: entry.name,
                model: entry.model,
                side_billboard: entry.side_billboard,
                top_billboard: entry.top_billboard,
                side_normal_map: entry.side_normal_map,
                top_normal_map: entry.top_normal_map,
                width: entry.width,
                height: entry.height,
            })?;
        }

        for entry in manifest.biomes {
            let mut biome = Biome::new(entry.name);
            let groups = [
                (AssetGroup::Trees, entry.trees),
                (AssetGroup::Undergrowth, entry.undergrowth),
            ];
            for (group, usages) in groups {
                for usage in usages {
                    let asset = catalog.lookup_asset(&usage.asset).ok_or_else(|| {
                        CatalogError::UnknownAsset {
                            biome: biome.name.clone(),
                            asset: usage.asset.clone(),
                        }
                    })?;
                    biome = biome.with_asset(group, asset, usage.weight, usage.coverage);
                }
            }
            catalog.add_biome(biome)?;
        }

        Ok(catalog)
    }

    /// Parses a RON manifest string.
    pub fn from_ron_str(ron_str: &str) -> Result<Self, CatalogError> {
        let manifest: CatalogManifest = ron::from_str(ron_str)?;
        Self::from_manifest(manifest)
    }

    /// Reads and parses a RON manifest file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_ron_str(&contents)?;
        log::info!(
            "Loaded biome catalog {} ({} biomes, {} assets)",
            path.display(),
            catalog.biome_count(),
            catalog.asset_count()
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
(
    assets: [
        (name: "pine", model: Some("trees/pine.ron"), width: 2.0, height: 12.0),
        (name: "fern", side_billboard: Some("ground/fern.png")),
    ],
    biomes: [
        (
            name: "boreal",
            trees: [(asset: "pine", weight: 2.0)],
            undergrowth: [(asset: "fern", coverage: 0.5)],
        ),
    ],
)
"#;

    #[test]
    fn test_manifest_parses() {
        let catalog = BiomeCatalog::from_ron_str(MANIFEST).unwrap();
        assert_eq!(catalog.asset_count(), 2);
        assert_eq!(catalog.biome_count(), 1);

        let boreal = catalog.lookup_biome("boreal").unwrap();
        let biome = catalog.biome(boreal).unwrap();
        let pine = catalog.lookup_asset("pine").unwrap();
        assert_eq!(biome.assets(AssetGroup::Trees)[0].asset, pine);
        assert_eq!(biome.assets(AssetGroup::Trees)[0].weight, 2.0);
        assert_eq!(biome.assets(AssetGroup::Trees)[0].coverage, 1.0);
        assert_eq!(biome.assets(AssetGroup::Undergrowth)[0].coverage, 0.5);

        let fern = catalog.asset(catalog.lookup_asset("fern").unwrap()).unwrap();
        assert_eq!(fern.width, DEFAULT_ASSET_EXTENT);
    }

    #[test]
    fn test_unknown_asset_reference_is_rejected() {
        let manifest = r#"(biomes: [(name: "desert", trees: [(asset: "cactus")])])"#;
        let err = BiomeCatalog::from_ron_str(manifest).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownAsset { ref asset, .. } if asset == "cactus"));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut catalog = BiomeCatalog::new();
        catalog.add_asset(ModelAsset::new("oak")).unwrap();
        assert!(matches!(
            catalog.add_asset(ModelAsset::new("oak")),
            Err(CatalogError::DuplicateAsset(_))
        ));
        catalog.add_biome(Biome::new("meadow")).unwrap();
        assert!(matches!(
            catalog.add_biome(Biome::new("meadow")),
            Err(CatalogError::DuplicateBiome(_))
        ));
    }

    #[test]
    fn test_default_billboard_uris_derive_from_model() {
        let asset = ModelAsset::new("pine").with_model("trees/pine.ron");
        assert_eq!(
            asset.side_billboard_uri().unwrap().full(),
            "trees/pine.ron.side.png"
        );
        assert_eq!(
            asset.top_billboard_uri().unwrap().full(),
            "trees/pine.ron.top.png"
        );

        let explicit = asset
            .with_side_billboard("bb/pine.png")
            .with_top_billboard("bb/pine_top.png");
        assert_eq!(explicit.side_billboard_uri().unwrap().full(), "bb/pine.png");
        assert_eq!(explicit.top_billboard_uri().unwrap().full(), "bb/pine_top.png");
    }

    #[test]
    fn test_biome_ids_stop_at_u16_range() {
        let mut catalog = BiomeCatalog::new();
        for i in 0..=u16::MAX as u32 {
            catalog.add_biome(Biome::new(format!("b{i}"))).unwrap();
        }
        assert_eq!(catalog.biome_name(BiomeId(u16::MAX)), "b65535");

        let err = catalog.add_biome(Biome::new("b65536")).unwrap_err();
        assert!(matches!(err, CatalogError::CatalogFull { kind: "biomes", limit: 65536 }));
        assert_eq!(catalog.biome_count(), 65536);
        assert_eq!(catalog.lookup_biome("b65536"), None);
        assert_eq!(catalog.biome_name(BiomeId(0)), "b0");
        assert_eq!(catalog.biome_ids().last(), Some(BiomeId(u16::MAX)));
    }

    #[test]
    fn test_asset_without_resources_has_no_billboard() {
        assert!(ModelAsset::new("empty").side_billboard_uri().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("biomes.ron");
        std::fs::write(&path, MANIFEST).unwrap();
        let catalog = BiomeCatalog::load(&path).unwrap();
        assert_eq!(catalog.biome_name(BiomeId(0)), "boreal");
        assert_eq!(catalog.biome_name(BiomeId(9)), "<unknown biome>");
    }
}
