//! Discovers companion material textures (normal maps) for loaded models.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::loader::{LoadOptions, ResourceLoader};
use crate::raster::{Image, PixelFormat};
use crate::scene::{ALBEDO_UNIT, NORMAL_MAP_UNIT, Node};
use crate::texture::Texture;
use crate::uri::Uri;

/// Derives a companion texture URI from an albedo texture URI.
pub type Mangler = Box<dyn Fn(&Uri) -> Uri + Send + Sync>;

/// Post-processes a companion image before it is bound.
pub type TextureFactory = Box<dyn Fn(Image) -> Image + Send + Sync>;

/// Walks a model and binds companion textures on secondary units.
///
/// For every geometry whose albedo texture came from a known URI, each
/// registered unit's mangler names a companion file. Companions that fail to
/// load are skipped silently; most models simply don't have one.
#[derive(Default)]
pub struct MaterialLoader {
    manglers: BTreeMap<u32, Mangler>,
    factories: BTreeMap<u32, TextureFactory>,
}

impl MaterialLoader {
    /// Creates a loader with no units registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that finds `<name>_NML.png` normal maps and packs them as RG.
    pub fn with_normal_maps() -> Self {
        let mut loader = Self::new();
        loader.set_mangler(NORMAL_MAP_UNIT, |uri| {
            Uri::new(format!("{}_NML.png", uri.name_less_extension()))
        });
        loader.set_texture_factory(NORMAL_MAP_UNIT, |image| {
            if image.format() == PixelFormat::Rg8 {
                image
            } else {
                image.to_rg_normal_map()
            }
        });
        loader
    }

    /// Registers the URI mangler for `unit`.
    pub fn set_mangler(&mut self, unit: u32, mangler: impl Fn(&Uri) -> Uri + Send + Sync + 'static) {
        self.manglers.insert(unit, Box::new(mangler));
    }

    /// Registers the image post-processor for `unit`.
    pub fn set_texture_factory(
        &mut self,
        unit: u32,
        factory: impl Fn(Image) -> Image + Send + Sync + 'static,
    ) {
        self.factories.insert(unit, Box::new(factory));
    }

    /// Binds companion textures throughout `node`. Returns how many bindings were made.
    pub fn apply(&self, node: &mut Node, loader: &dyn ResourceLoader, options: &LoadOptions) -> usize {
        // Models often reuse one albedo across meshes; load each companion once.
        let mut found: FxHashMap<Uri, Option<Arc<Texture>>> = FxHashMap::default();
        let mut bound = 0;

        node.for_each_geometry_mut(&mut |geometry| {
            let Some(source) = geometry
                .texture(ALBEDO_UNIT)
                .and_then(|tex| tex.source())
                .cloned()
            else {
                return;
            };

            for (unit, mangler) in &self.manglers {
                if geometry.texture(*unit).is_some() {
                    continue;
                }
                let uri = mangler(&source);
                let texture = found
                    .entry(uri.clone())
                    .or_insert_with(|| self.load_companion(*unit, uri, loader, options))
                    .clone();
                if let Some(texture) = texture {
                    geometry.bind(*unit, texture);
                    bound += 1;
                }
            }
        });

        bound
    }

    fn load_companion(
        &self,
        unit: u32,
        uri: Uri,
        loader: &dyn ResourceLoader,
        options: &LoadOptions,
    ) -> Option<Arc<Texture>> {
        let image = loader.load_image(&uri, options).ok()?;
        let image = match self.factories.get(&unit) {
            Some(factory) => factory(image),
            None => image,
        };
        log::debug!("Found material texture {uri} for unit {unit}");
        Some(Arc::new(Texture::from_source(image, uri)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use crate::scene::Geometry;
    use glam::Vec3;

    fn textured_mesh(albedo: &Arc<Texture>) -> Node {
        let mut geometry = Geometry::new(vec![Vec3::ZERO; 3], Vec::new(), Vec::new());
        geometry.bind(ALBEDO_UNIT, albedo.clone());
        Node::new("mesh").with_geometry(geometry)
    }

    fn albedo(uri: &str) -> Arc<Texture> {
        Arc::new(Texture::from_source(
            Image::filled(1, 1, PixelFormat::Rgba8, &[0, 255, 0, 255]),
            Uri::new(uri),
        ))
    }

    #[test]
    fn test_normal_map_bound_and_packed() {
        let mut loader = MemoryLoader::new();
        loader.insert_image(
            "trees/bark_NML.png",
            Image::filled(2, 2, PixelFormat::Rgb8, &[128, 128, 255]),
        );

        let bark = albedo("trees/bark.jpg");
        let mut node = Node::new("pine")
            .with_child(textured_mesh(&bark))
            .with_child(textured_mesh(&bark));

        let materials = MaterialLoader::with_normal_maps();
        let bound = materials.apply(&mut node, &loader, &LoadOptions::default());

        assert_eq!(bound, 2);
        assert_eq!(loader.request_count("trees/bark_NML.png"), 1);
        node.for_each_geometry(&mut |g| {
            let normal = g.texture(NORMAL_MAP_UNIT).unwrap();
            assert_eq!(normal.image().format(), PixelFormat::Rg8);
        });
    }

    #[test]
    fn test_missing_normal_map_is_silent() {
        let loader = MemoryLoader::new();
        let mut node = textured_mesh(&albedo("rock.png"));
        let bound = MaterialLoader::with_normal_maps().apply(&mut node, &loader, &LoadOptions::default());
        assert_eq!(bound, 0);
        assert!(node.geometry.unwrap().texture(NORMAL_MAP_UNIT).is_none());
    }

    #[test]
    fn test_untextured_geometry_is_skipped() {
        let loader = MemoryLoader::new();
        let mut node = Node::new("plain").with_geometry(Geometry::default());
        assert_eq!(
            MaterialLoader::with_normal_maps().apply(&mut node, &loader, &LoadOptions::default()),
            0
        );
        assert_eq!(loader.request_count("plain_NML.png"), 0);
    }
}
