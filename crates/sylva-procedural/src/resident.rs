//! Resident biome and asset tables, and the residency resolution step.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::catalog::{AssetGroup, BiomeId, ModelAsset, ModelAssetId};
use crate::chonk::Chonk;
use crate::impostor::{CreateImpostorFn, ImpostorTextures};
use crate::reference::ReferenceSnapshot;
use crate::scene::{BoundingBox, Node};
use crate::texture::{Texture, TextureArena};

/// Everything loaded for one model asset. Shared by every instance that uses it.
#[derive(Debug)]
pub struct ResidentModelAsset {
    pub(crate) asset_id: ModelAssetId,
    pub(crate) asset: Arc<ModelAsset>,
    pub(crate) model: Option<Arc<Node>>,
    pub(crate) bounding_box: BoundingBox,
    pub(crate) side_billboard: Option<Arc<Texture>>,
    pub(crate) side_billboard_normal_map: Option<Arc<Texture>>,
    pub(crate) top_billboard: Option<Arc<Texture>>,
    pub(crate) top_billboard_normal_map: Option<Arc<Texture>>,
    pub(crate) impostor: Option<Arc<Node>>,
    pub(crate) chonk: Option<Chonk>,
}

impl ResidentModelAsset {
    pub(crate) fn new(asset_id: ModelAssetId, asset: Arc<ModelAsset>) -> Self {
        Self {
            asset_id,
            asset,
            model: None,
            bounding_box: BoundingBox::default(),
            side_billboard: None,
            side_billboard_normal_map: None,
            top_billboard: None,
            top_billboard_normal_map: None,
            impostor: None,
            chonk: None,
        }
    }

    /// Catalog id of the asset definition.
    pub fn asset_id(&self) -> ModelAssetId {
        self.asset_id
    }

    /// The asset definition.
    pub fn asset(&self) -> &Arc<ModelAsset> {
        &self.asset
    }

    /// The loaded full model.
    pub fn model(&self) -> Option<&Arc<Node>> {
        self.model.as_ref()
    }

    /// Bounds of the loaded model; invalid when there is none.
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Side billboard color texture.
    pub fn side_billboard(&self) -> Option<&Arc<Texture>> {
        self.side_billboard.as_ref()
    }

    /// Side billboard normal map.
    pub fn side_billboard_normal_map(&self) -> Option<&Arc<Texture>> {
        self.side_billboard_normal_map.as_ref()
    }

    /// Top billboard color texture.
    pub fn top_billboard(&self) -> Option<&Arc<Texture>> {
        self.top_billboard.as_ref()
    }

    /// Top billboard normal map.
    pub fn top_billboard_normal_map(&self) -> Option<&Arc<Texture>> {
        self.top_billboard_normal_map.as_ref()
    }

    /// Generated impostor geometry.
    pub fn impostor(&self) -> Option<&Arc<Node>> {
        self.impostor.as_ref()
    }

    /// Draw batch holding the model and/or impostor.
    pub fn chonk(&self) -> Option<&Chonk> {
        self.chonk.as_ref()
    }

    /// The four impostor candidate textures: side, side normal, top, top normal.
    pub fn impostor_textures(&self) -> ImpostorTextures {
        [
            self.side_billboard.clone(),
            self.side_billboard_normal_map.clone(),
            self.top_billboard.clone(),
            self.top_billboard_normal_map.clone(),
        ]
    }

    /// Whether enough loaded to be placed: a side billboard or a model.
    pub fn is_renderable(&self) -> bool {
        self.side_billboard.is_some() || self.model.is_some()
    }
}

/// One weighted use of a resident asset within a biome's asset group.
#[derive(Clone, Debug)]
pub struct ResidentModelAssetInstance {
    /// The shared loaded asset.
    pub asset: Arc<ResidentModelAsset>,
    /// Selection weight within the group.
    pub weight: f32,
    /// Coverage fraction.
    pub coverage: f32,
}

/// Per-group instance lists for one resident biome.
#[derive(Clone, Debug, Default)]
pub struct ResidentBiome {
    groups: [Vec<ResidentModelAssetInstance>; AssetGroup::COUNT],
}

impl ResidentBiome {
    /// Instances in `group`.
    pub fn group(&self, group: AssetGroup) -> &[ResidentModelAssetInstance] {
        &self.groups[group.index()]
    }

    pub(crate) fn group_mut(&mut self, group: AssetGroup) -> &mut Vec<ResidentModelAssetInstance> {
        &mut self.groups[group.index()]
    }

    /// Empties every group, keeping allocations.
    pub(crate) fn clear(&mut self) {
        for group in &mut self.groups {
            group.clear();
        }
    }

    /// Total instances across groups.
    pub fn instance_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Iterates every instance across groups.
    pub fn instances(&self) -> impl Iterator<Item = &ResidentModelAssetInstance> {
        self.groups.iter().flatten()
    }
}

/// Snapshot of resident biomes handed to the renderer.
pub type ResidentBiomes = BTreeMap<BiomeId, ResidentBiome>;

/// Everything guarded by the resident-data lock.
pub(crate) struct ResidentData {
    pub biomes: ResidentBiomes,
    pub assets: FxHashMap<ModelAssetId, Arc<ResidentModelAsset>>,
    pub create_impostor: [Option<CreateImpostorFn>; AssetGroup::COUNT],
    pub lod_transition_pixel_scale: f32,
    pub textures: TextureArena,
    pub active_groups: BTreeSet<AssetGroup>,
}

impl ResidentData {
    pub fn new(lod_transition_pixel_scale: f32) -> Self {
        Self {
            biomes: ResidentBiomes::new(),
            assets: FxHashMap::default(),
            create_impostor: Default::default(),
            lod_transition_pixel_scale,
            textures: TextureArena::new(),
            active_groups: BTreeSet::new(),
        }
    }

    /// Adds an (empty) entry for every active biome and drops every inactive one.
    ///
    /// Existing entries are left alone so their loaded instances survive.
    pub fn apply_snapshot(&mut self, snapshot: &ReferenceSnapshot) {
        for biome in &snapshot.active {
            self.biomes.entry(*biome).or_default();
        }
        for biome in &snapshot.inactive {
            self.biomes.remove(biome);
        }
    }

    /// Number of distinct resident biomes referencing each cached asset.
    pub fn asset_usage(&self) -> FxHashMap<ModelAssetId, usize> {
        let mut usage = FxHashMap::default();
        let mut seen = FxHashSet::default();
        for biome in self.biomes.values() {
            seen.clear();
            for instance in biome.instances() {
                if seen.insert(instance.asset.asset_id) {
                    *usage.entry(instance.asset.asset_id).or_insert(0) += 1;
                }
            }
        }
        usage
    }

    /// Drops cached assets that no resident biome uses and releases their texture slots.
    pub fn evict_unused(&mut self) -> Vec<ModelAssetId> {
        let usage = self.asset_usage();
        let mut evicted: Vec<_> = self
            .assets
            .keys()
            .filter(|id| !usage.contains_key(id))
            .copied()
            .collect();
        evicted.sort_unstable();

        for id in &evicted {
            if let Some(asset) = self.assets.remove(id) {
                log::debug!("Unloaded asset {}", asset.asset.name);
            }
        }
        if !evicted.is_empty() {
            self.textures.purge();
        }
        evicted
    }

    /// Drops every cached asset, forcing rematerialization.
    pub fn clear_assets(&mut self) {
        self.assets.clear();
        self.textures.purge();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resident(id: u32) -> Arc<ResidentModelAsset> {
        Arc::new(ResidentModelAsset::new(
            ModelAssetId(id),
            Arc::new(ModelAsset::new(format!("asset{id}"))),
        ))
    }

    fn instance(asset: &Arc<ResidentModelAsset>) -> ResidentModelAssetInstance {
        ResidentModelAssetInstance {
            asset: asset.clone(),
            weight: 1.0,
            coverage: 1.0,
        }
    }

    #[test]
    fn test_apply_snapshot_preserves_existing_entries() {
        let mut data = ResidentData::new(8.0);
        let shared = resident(0);
        data.assets.insert(ModelAssetId(0), shared.clone());
        data.biomes
            .entry(BiomeId(0))
            .or_default()
            .group_mut(AssetGroup::Trees)
            .push(instance(&shared));

        data.apply_snapshot(&ReferenceSnapshot {
            revision: 3,
            active: vec![BiomeId(0), BiomeId(1)],
            inactive: vec![BiomeId(2)],
        });

        assert_eq!(data.biomes.len(), 2);
        assert_eq!(data.biomes[&BiomeId(0)].instance_count(), 1);
        assert_eq!(data.biomes[&BiomeId(1)].instance_count(), 0);
    }

    #[test]
    fn test_usage_counts_distinct_biomes() {
        let mut data = ResidentData::new(8.0);
        let shared = resident(0);
        for biome in [BiomeId(0), BiomeId(1)] {
            let entry = data.biomes.entry(biome).or_default();
            entry.group_mut(AssetGroup::Trees).push(instance(&shared));
            entry.group_mut(AssetGroup::Undergrowth).push(instance(&shared));
        }
        assert_eq!(data.asset_usage()[&ModelAssetId(0)], 2);
    }

    #[test]
    fn test_evict_unused_keeps_shared_assets() {
        let mut data = ResidentData::new(8.0);
        let shared = resident(0);
        let exclusive = resident(1);
        data.assets.insert(ModelAssetId(0), shared.clone());
        data.assets.insert(ModelAssetId(1), exclusive.clone());

        let a = data.biomes.entry(BiomeId(0)).or_default();
        a.group_mut(AssetGroup::Trees).push(instance(&shared));
        a.group_mut(AssetGroup::Trees).push(instance(&exclusive));
        data.biomes
            .entry(BiomeId(1))
            .or_default()
            .group_mut(AssetGroup::Trees)
            .push(instance(&shared));

        data.apply_snapshot(&ReferenceSnapshot {
            revision: 0,
            active: vec![BiomeId(1)],
            inactive: vec![BiomeId(0)],
        });
        assert_eq!(data.evict_unused(), vec![ModelAssetId(1)]);
        assert!(data.assets.contains_key(&ModelAssetId(0)));
    }
}
