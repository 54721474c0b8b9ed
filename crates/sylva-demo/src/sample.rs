//! Built-in sample world, used when no catalog manifest is found on disk.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use sylva_procedural::{
    ALBEDO_UNIT, AssetGroup, Biome, BiomeCatalog, CatalogError, Geometry, Image, MemoryLoader,
    ModelAsset, Node, PixelFormat, Texture, Uri,
};

/// A tree: a trunk quad and a crown quad, textured from `bark`/`leaves`.
fn tree(height: f32, crown: f32, bark: &Arc<Texture>, leaves: &Arc<Texture>) -> Node {
    let quad = |min: Vec3, max: Vec3, texture: &Arc<Texture>| {
        let mut geometry = Geometry::new(
            vec![
                Vec3::new(min.x, 0.0, min.z),
                Vec3::new(max.x, 0.0, min.z),
                Vec3::new(max.x, 0.0, max.z),
                Vec3::new(min.x, 0.0, max.z),
            ],
            vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
            vec![0, 1, 2, 0, 2, 3],
        );
        geometry.bind(ALBEDO_UNIT, texture.clone());
        geometry
    };

    let trunk_top = height * 0.4;
    Node::new("tree")
        .with_child(
            Node::new("trunk").with_geometry(quad(
                Vec3::new(-0.3, 0.0, 0.0),
                Vec3::new(0.3, 0.0, trunk_top),
                bark,
            )),
        )
        .with_child(
            Node::new("crown").with_geometry(quad(
                Vec3::new(-crown, 0.0, trunk_top),
                Vec3::new(crown, 0.0, height),
                leaves,
            )),
        )
}

fn solid(rgba: [u8; 4]) -> Image {
    Image::filled(16, 16, PixelFormat::Rgba8, &rgba)
}

fn flat_normal_map() -> Image {
    Image::filled(16, 16, PixelFormat::Rgb8, &[128, 128, 255])
}

/// Three biomes over four assets, with every resource they name held in memory.
pub fn sample_world() -> Result<(BiomeCatalog, MemoryLoader), CatalogError> {
    let mut loader = MemoryLoader::new();

    let bark = Arc::new(Texture::from_source(solid([90, 60, 40, 255]), Uri::new("bark.png")));
    let needles = Arc::new(Texture::from_source(solid([20, 80, 40, 255]), Uri::new("needles.png")));
    let leaves = Arc::new(Texture::from_source(solid([70, 140, 50, 255]), Uri::new("leaves.png")));
    loader.insert_image("bark_NML.png", flat_normal_map());

    loader.insert_model("pine.ron", tree(18.0, 2.5, &bark, &needles));
    loader.insert_image("pine.ron.side.png", solid([20, 80, 40, 255]));
    loader.insert_image("pine.ron.side_NML.png", flat_normal_map());
    loader.insert_image("pine.ron.top.png", solid([20, 70, 35, 255]));

    loader.insert_model("birch.ron", tree(12.0, 3.0, &bark, &leaves));
    loader.insert_image("billboards/birch.png", solid([70, 140, 50, 255]));

    loader.insert_image("fern.png", solid([60, 120, 40, 200]));
    loader.insert_image("grass.png", solid([110, 150, 60, 180]));
    loader.insert_image("grass.normal.png", flat_normal_map());

    let mut catalog = BiomeCatalog::new();
    let pine = catalog.add_asset(ModelAsset::new("pine").with_model("pine.ron").with_extent(2.5, 18.0))?;
    let birch = catalog.add_asset(
        ModelAsset::new("birch")
            .with_model("birch.ron")
            .with_side_billboard("billboards/birch.png")
            .with_extent(3.0, 12.0),
    )?;
    let fern = catalog.add_asset(ModelAsset::new("fern").with_side_billboard("fern.png").with_extent(0.4, 0.8))?;
    let grass = catalog.add_asset(ModelAsset::new("grass").with_side_billboard("grass.png").with_extent(0.2, 0.5))?;

    catalog.add_biome(
        Biome::new("boreal")
            .with_asset(AssetGroup::Trees, pine, 3.0, 0.7)
            .with_asset(AssetGroup::Trees, birch, 1.0, 0.3)
            .with_asset(AssetGroup::Undergrowth, fern, 1.0, 0.5),
    )?;
    catalog.add_biome(Biome::new("grassland").with_asset(AssetGroup::Undergrowth, grass, 1.0, 0.9))?;
    catalog.add_biome(
        Biome::new("parkland")
            .with_asset(AssetGroup::Trees, birch, 1.0, 0.2)
            .with_asset(AssetGroup::Undergrowth, grass, 2.0, 0.8)
            .with_asset(AssetGroup::Undergrowth, fern, 1.0, 0.2),
    )?;

    Ok((catalog, loader))
}
