//! Loads the models and billboards of resident biomes and packs them into chonks.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::catalog::{AssetGroup, BiomeCatalog, ModelAsset, ModelAssetId};
use crate::chonk::{Chonk, ChonkFactory};
use crate::impostor::CreateImpostorFn;
use crate::loader::{LoadOptions, ResourceLoader};
use crate::material::MaterialLoader;
use crate::resident::{ResidentData, ResidentModelAsset, ResidentModelAssetInstance};
use crate::scene::{BoundingBox, Node};
use crate::texture::Texture;
use crate::uri::Uri;

/// Pixel scale at which an impostor becomes visible; i.e. from any range.
const IMPOSTOR_FAR_PIXEL_SCALE: f32 = 1.0;

/// Suffixes probed, in order, for a billboard's companion normal map.
const NORMAL_MAP_SUFFIXES: [&str; 2] = ["_NML.", ".normal."];

#[derive(Clone)]
struct LoadedModel {
    node: Arc<Node>,
    bounds: BoundingBox,
}

#[derive(Clone)]
struct Billboard {
    texture: Arc<Texture>,
    normal_map: Option<Arc<Texture>>,
}

/// Deduplication caches that live for one materialization pass.
///
/// Failures are cached too, so one missing file is requested (and
/// reported) once per pass no matter how many assets name it.
struct MaterializePass<'a> {
    loader: &'a dyn ResourceLoader,
    options: &'a LoadOptions,
    materials: MaterialLoader,
    models: FxHashMap<Uri, Option<LoadedModel>>,
    billboards: FxHashMap<(Uri, Option<Uri>), Option<Billboard>>,
}

impl<'a> MaterializePass<'a> {
    fn new(loader: &'a dyn ResourceLoader, options: &'a LoadOptions) -> Self {
        Self {
            loader,
            options,
            materials: MaterialLoader::with_normal_maps(),
            models: FxHashMap::default(),
            billboards: FxHashMap::default(),
        }
    }

    fn materialize(
        &mut self,
        asset_id: ModelAssetId,
        definition: &Arc<ModelAsset>,
        create_impostor: Option<&CreateImpostorFn>,
        lod_transition_pixel_scale: f32,
        factory: &mut ChonkFactory<'_>,
    ) -> ResidentModelAsset {
        log::info!("Loading asset {}", definition.name);
        let mut resident = ResidentModelAsset::new(asset_id, definition.clone());

        if let Some(uri) = &definition.model
            && let Some(model) = self.model(uri)
        {
            resident.model = Some(model.node);
            resident.bounding_box = model.bounds;
        }

        // The top billboard and the impostor both hang off the side billboard.
        if let Some(side_uri) = definition.side_billboard_uri() {
            if let Some(side) = self.billboard(&side_uri, definition.side_normal_map.as_ref(), "side") {
                resident.side_billboard = Some(side.texture);
                resident.side_billboard_normal_map = side.normal_map;
            }

            if let Some(top_uri) = definition.top_billboard_uri()
                && let Some(top) = self.billboard(&top_uri, definition.top_normal_map.as_ref(), "top")
            {
                resident.top_billboard = Some(top.texture);
                resident.top_billboard_normal_map = top.normal_map;
            }

            if let Some(create) = create_impostor {
                let bbox = if resident.bounding_box.valid() {
                    resident.bounding_box
                } else {
                    BoundingBox::from_extent(definition.width, definition.height)
                };
                resident.impostor = create(&bbox, &resident.impostor_textures()).map(Arc::new);
            }
        }

        let mut chonk: Option<Chonk> = None;
        if let Some(model) = &resident.model {
            chonk.get_or_insert_with(Chonk::new).add(
                model,
                lod_transition_pixel_scale,
                f32::MAX,
                factory,
            );
        }
        if let Some(impostor) = &resident.impostor {
            let near = if resident.model.is_some() {
                lod_transition_pixel_scale
            } else {
                f32::MAX
            };
            chonk
                .get_or_insert_with(Chonk::new)
                .add(impostor, IMPOSTOR_FAR_PIXEL_SCALE, near, factory);
        }
        resident.chonk = chonk;

        resident
    }

    fn model(&mut self, uri: &Uri) -> Option<LoadedModel> {
        if let Some(cached) = self.models.get(uri) {
            return cached.clone();
        }

        let loaded = match self.loader.load_model(uri, self.options) {
            Ok(mut node) => {
                let found = self.materials.apply(&mut node, self.loader, self.options);
                log::debug!("Loaded model {} ({found} material textures)", uri.base());
                let bounds = node.compute_bounds();
                Some(LoadedModel {
                    node: Arc::new(node),
                    bounds,
                })
            }
            Err(err) => {
                log::warn!("Failed to load model {uri}: {err}");
                None
            }
        };
        self.models.insert(uri.clone(), loaded.clone());
        loaded
    }

    fn billboard(&mut self, uri: &Uri, normal_map: Option<&Uri>, kind: &str) -> Option<Billboard> {
        let key = (uri.clone(), normal_map.cloned());
        if let Some(cached) = self.billboards.get(&key) {
            return cached.clone();
        }

        let loaded = match self.loader.load_image(uri, self.options) {
            Ok(image) => {
                log::debug!("Loaded {kind} billboard {}", uri.base());
                Some(Billboard {
                    texture: Arc::new(Texture::from_source(image, uri.clone())),
                    normal_map: self.billboard_normal_map(uri, normal_map),
                })
            }
            Err(err) => {
                log::warn!("Failed to load {kind} billboard {uri}: {err}");
                None
            }
        };
        self.billboards.insert(key, loaded.clone());
        loaded
    }

    /// The explicit normal map if one is named, else the first probed
    /// `<base>_NML.<ext>` / `<base>.normal.<ext>` that loads.
    fn billboard_normal_map(&self, uri: &Uri, explicit: Option<&Uri>) -> Option<Arc<Texture>> {
        let candidates = match explicit {
            Some(explicit) => vec![explicit.clone()],
            None => NORMAL_MAP_SUFFIXES
                .iter()
                .map(|suffix| {
                    Uri::new(format!(
                        "{}{suffix}{}",
                        uri.name_less_extension(),
                        uri.extension()
                    ))
                })
                .collect(),
        };

        candidates.into_iter().find_map(|candidate| {
            let image = self.loader.load_image(&candidate, self.options).ok()?;
            log::trace!("Found billboard normal map {candidate}");
            Some(Arc::new(Texture::from_source(image, candidate)))
        })
    }
}

/// Rebuilds every resident biome's instance lists, materializing assets
/// that are not cached yet. Returns how many assets were newly materialized.
pub(crate) fn materialize_new_assets(
    data: &mut ResidentData,
    catalog: &BiomeCatalog,
    loader: &dyn ResourceLoader,
    options: &LoadOptions,
) -> usize {
    let ResidentData {
        biomes,
        assets,
        create_impostor,
        lod_transition_pixel_scale,
        textures,
        active_groups,
    } = data;

    log::debug!("Found {} resident biomes", biomes.len());
    for resident in biomes.values_mut() {
        resident.clear();
    }
    active_groups.clear();

    let mut pass = MaterializePass::new(loader, options);
    let mut factory = ChonkFactory::new(textures);
    let mut materialized = 0;

    for (biome_id, resident) in biomes.iter_mut() {
        let Some(biome) = catalog.biome(*biome_id) else {
            log::warn!("Resident biome {} is not in the catalog", biome_id.0);
            continue;
        };

        for group in AssetGroup::ALL {
            let instances = resident.group_mut(group);

            for usage in biome.assets(group) {
                let asset = if let Some(asset) = assets.get(&usage.asset).cloned() {
                    asset
                } else {
                    let Some(definition) = catalog.asset(usage.asset) else {
                        log::warn!(
                            "Biome {} references unknown asset {}",
                            biome.name,
                            usage.asset.0
                        );
                        continue;
                    };
                    let asset = Arc::new(pass.materialize(
                        usage.asset,
                        definition,
                        create_impostor[group.index()].as_ref(),
                        *lod_transition_pixel_scale,
                        &mut factory,
                    ));
                    assets.insert(usage.asset, asset.clone());
                    materialized += 1;
                    asset
                };

                if asset.is_renderable() {
                    instances.push(ResidentModelAssetInstance {
                        asset,
                        weight: usage.weight,
                        coverage: usage.coverage,
                    });
                }
            }

            if !instances.is_empty() {
                active_groups.insert(group);
            }
        }
    }

    // Instances from the previous pass are gone now; release their texture slots.
    drop(factory);
    textures.purge();

    materialized
}
