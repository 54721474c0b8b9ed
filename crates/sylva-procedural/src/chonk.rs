//! Draw batches ("chonks"): packed geometry records with LOD visibility ranges.
//!
//! A chonk flattens one or more scene graphs into a list of draw records.
//! Every record carries the pixel-scale window it is visible in, so a single
//! chonk can hold a full model (visible up close) and its impostor (visible
//! from far away) and let the GPU pick per instance.

use std::sync::Arc;

use crate::scene::{ALBEDO_UNIT, BoundingBox, NORMAL_MAP_UNIT, Node};
use crate::texture::{Texture, TextureArena, TextureSlot};

/// One flattened geometry inside a [`Chonk`].
#[derive(Clone, Debug, PartialEq)]
pub struct ChonkDraw {
    /// Name of the scene node the geometry came from.
    pub source: String,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Number of indices drawn.
    pub index_count: u32,
    /// Arena slot of the base color texture.
    pub albedo: Option<TextureSlot>,
    /// Arena slot of the normal map.
    pub normal_map: Option<TextureSlot>,
    /// Smallest pixel scale at which the draw is visible.
    pub far_pixel_scale: f32,
    /// Pixel scale at which the draw yields to a closer representation.
    pub near_pixel_scale: f32,
}

impl ChonkDraw {
    /// Whether this draw is visible at `pixel_scale` (`far <= s < near`).
    pub fn visible_at(&self, pixel_scale: f32) -> bool {
        pixel_scale >= self.far_pixel_scale && pixel_scale < self.near_pixel_scale
    }
}

/// Registers chonk textures in a shared [`TextureArena`].
pub struct ChonkFactory<'a> {
    arena: &'a mut TextureArena,
}

impl<'a> ChonkFactory<'a> {
    /// Creates a factory bound to `arena`.
    pub fn new(arena: &'a mut TextureArena) -> Self {
        Self { arena }
    }

    /// The arena slot for `texture`.
    pub fn slot_for(&mut self, texture: &Arc<Texture>) -> TextureSlot {
        self.arena.add(texture)
    }
}

/// A GPU-ready batch of draws for one resident asset.
#[derive(Clone, Debug, Default)]
pub struct Chonk {
    draws: Vec<ChonkDraw>,
    bounds: BoundingBox,
}

impl Chonk {
    /// Creates an empty chonk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens every geometry of `node` into draws visible in `[far, near)`.
    pub fn add(
        &mut self,
        node: &Node,
        far_pixel_scale: f32,
        near_pixel_scale: f32,
        factory: &mut ChonkFactory<'_>,
    ) {
        self.add_recursive(node, far_pixel_scale, near_pixel_scale, factory);
        self.bounds.expand_by_box(&node.compute_bounds());
    }

    fn add_recursive(
        &mut self,
        node: &Node,
        far_pixel_scale: f32,
        near_pixel_scale: f32,
        factory: &mut ChonkFactory<'_>,
    ) {
        if let Some(geometry) = &node.geometry
            && geometry.vertex_count() > 0
        {
            self.draws.push(ChonkDraw {
                source: node.name.clone(),
                vertex_count: geometry.vertex_count() as u32,
                index_count: geometry.index_count() as u32,
                albedo: geometry.texture(ALBEDO_UNIT).map(|t| factory.slot_for(t)),
                normal_map: geometry.texture(NORMAL_MAP_UNIT).map(|t| factory.slot_for(t)),
                far_pixel_scale,
                near_pixel_scale,
            });
        }
        for child in &node.children {
            self.add_recursive(child, far_pixel_scale, near_pixel_scale, factory);
        }
    }

    /// All draws, in insertion order.
    pub fn draws(&self) -> &[ChonkDraw] {
        &self.draws
    }

    /// Draws visible at `pixel_scale`.
    pub fn visible_draws(&self, pixel_scale: f32) -> impl Iterator<Item = &ChonkDraw> {
        self.draws.iter().filter(move |d| d.visible_at(pixel_scale))
    }

    /// Bounds of everything added.
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Whether no draws were added.
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Image, PixelFormat};
    use crate::scene::Geometry;
    use glam::Vec3;

    fn textured_triangle(name: &str, texture: &Arc<Texture>) -> Node {
        let mut geometry = Geometry::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Z],
            Vec::new(),
            vec![0, 1, 2],
        );
        geometry.bind(ALBEDO_UNIT, texture.clone());
        Node::new(name).with_geometry(geometry)
    }

    #[test]
    fn test_add_flattens_nested_nodes() {
        let tex = Arc::new(Texture::new(Image::filled(1, 1, PixelFormat::R8, &[1])));
        let node = Node::new("tree")
            .with_child(textured_triangle("trunk", &tex))
            .with_child(Node::new("crown").with_child(textured_triangle("leaves", &tex)));

        let mut arena = TextureArena::new();
        let mut chonk = Chonk::new();
        chonk.add(&node, 8.0, f32::MAX, &mut ChonkFactory::new(&mut arena));

        assert_eq!(chonk.draws().len(), 2);
        assert_eq!(chonk.draws()[0].source, "trunk");
        assert_eq!(chonk.draws()[0].albedo, chonk.draws()[1].albedo);
        assert_eq!(arena.len(), 1);
        assert!(chonk.bounds().valid());
    }

    #[test]
    fn test_visibility_window() {
        let draw = ChonkDraw {
            source: String::new(),
            vertex_count: 3,
            index_count: 3,
            albedo: None,
            normal_map: None,
            far_pixel_scale: 1.0,
            near_pixel_scale: 8.0,
        };
        assert!(!draw.visible_at(0.5));
        assert!(draw.visible_at(1.0));
        assert!(draw.visible_at(7.9));
        assert!(!draw.visible_at(8.0));
    }

    #[test]
    fn test_visible_draws_hand_over_at_transition() {
        let tex = Arc::new(Texture::new(Image::filled(1, 1, PixelFormat::R8, &[1])));
        let mut arena = TextureArena::new();
        let mut factory = ChonkFactory::new(&mut arena);
        let mut chonk = Chonk::new();
        chonk.add(&textured_triangle("model", &tex), 8.0, f32::MAX, &mut factory);
        chonk.add(&textured_triangle("impostor", &tex), 1.0, 8.0, &mut factory);

        let names = |scale| -> Vec<String> {
            chonk.visible_draws(scale).map(|d| d.source.clone()).collect()
        };
        assert_eq!(names(4.0), vec!["impostor"]);
        assert_eq!(names(8.0), vec!["model"]);
        assert_eq!(names(100.0), vec!["model"]);
        assert!(names(0.5).is_empty());
    }

    #[test]
    fn test_empty_geometry_is_skipped() {
        let mut arena = TextureArena::new();
        let mut chonk = Chonk::new();
        let node = Node::new("empty").with_geometry(Geometry::default());
        chonk.add(&node, 1.0, f32::MAX, &mut ChonkFactory::new(&mut arena));
        assert!(chonk.is_empty());
    }
}
