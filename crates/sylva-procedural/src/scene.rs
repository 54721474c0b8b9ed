//! Minimal scene graph for loaded models and generated impostors.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::texture::Texture;

/// Texture unit holding the base color.
pub const ALBEDO_UNIT: u32 = 0;
/// Texture unit holding the companion normal map.
pub const NORMAL_MAP_UNIT: u32 = 1;

/// Axis-aligned bounding box in model space.
///
/// The default box is *invalid* (empty) and becomes valid once it has been
/// expanded by at least one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }
}

impl BoundingBox {
    /// Box spanning two corners. Components are sorted so `min <= max`.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Box standing on the ground plane: `[-w, w] x [-w, w] x [0, h]`.
    pub fn from_extent(width: f32, height: f32) -> Self {
        Self::new(Vec3::new(-width, -width, 0.0), Vec3::new(width, width, height))
    }

    /// Returns `true` once the box contains at least one point.
    pub fn valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Grows the box to include `point`.
    pub fn expand_by_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grows the box to include `other`. Invalid boxes are ignored.
    pub fn expand_by_box(&mut self, other: &BoundingBox) {
        if other.valid() {
            self.expand_by_point(other.min);
            self.expand_by_point(other.max);
        }
    }

    /// Center point. Meaningless for an invalid box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Size along each axis. Meaningless for an invalid box.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// A drawable mesh with texture bindings per unit.
#[derive(Clone, Debug, Default)]
pub struct Geometry {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Per-vertex texture coordinates (may be empty).
    pub tex_coords: Vec<Vec2>,
    /// Triangle list indices; empty means non-indexed.
    pub indices: Vec<u32>,
    /// Bound textures keyed by unit.
    pub textures: BTreeMap<u32, Arc<Texture>>,
}

impl Geometry {
    /// Creates an untextured mesh.
    pub fn new(positions: Vec<Vec3>, tex_coords: Vec<Vec2>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            tex_coords,
            indices,
            textures: BTreeMap::new(),
        }
    }

    /// Binds `texture` to `unit`, replacing any previous binding.
    pub fn bind(&mut self, unit: u32, texture: Arc<Texture>) {
        self.textures.insert(unit, texture);
    }

    /// The texture bound to `unit`.
    pub fn texture(&self, unit: u32) -> Option<&Arc<Texture>> {
        self.textures.get(&unit)
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices drawn; equals the vertex count for non-indexed meshes.
    pub fn index_count(&self) -> usize {
        if self.indices.is_empty() {
            self.positions.len()
        } else {
            self.indices.len()
        }
    }
}

/// A scene graph node: optional geometry plus children.
#[derive(Clone, Debug, Default)]
pub struct Node {
    /// Node name, for diagnostics.
    pub name: String,
    /// Geometry drawn at this node.
    pub geometry: Option<Geometry>,
    /// Child nodes.
    pub children: Vec<Node>,
}

impl Node {
    /// Creates an empty group node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: None,
            children: Vec::new(),
        }
    }

    /// Sets this node's geometry.
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Appends a child.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Bounds of every vertex in the subtree.
    pub fn compute_bounds(&self) -> BoundingBox {
        let mut bounds = BoundingBox::default();
        self.for_each_geometry(&mut |geometry| {
            for p in &geometry.positions {
                bounds.expand_by_point(*p);
            }
        });
        bounds
    }

    /// Total vertex count of the subtree.
    pub fn vertex_count(&self) -> usize {
        let mut count = 0;
        self.for_each_geometry(&mut |geometry| count += geometry.vertex_count());
        count
    }

    /// Visits every geometry in the subtree, depth first.
    pub fn for_each_geometry(&self, visit: &mut impl FnMut(&Geometry)) {
        if let Some(geometry) = &self.geometry {
            visit(geometry);
        }
        for child in &self.children {
            child.for_each_geometry(visit);
        }
    }

    /// Visits every geometry in the subtree mutably, depth first.
    pub fn for_each_geometry_mut(&mut self, visit: &mut impl FnMut(&mut Geometry)) {
        if let Some(geometry) = &mut self.geometry {
            visit(geometry);
        }
        for child in &mut self.children {
            child.for_each_geometry_mut(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: Vec3) -> Geometry {
        Geometry::new(
            vec![offset, offset + Vec3::X, offset + Vec3::Z],
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_default_box_is_invalid() {
        assert!(!BoundingBox::default().valid());
    }

    #[test]
    fn test_from_extent_stands_on_ground() {
        let bbox = BoundingBox::from_extent(2.0, 10.0);
        assert_eq!(bbox.min, Vec3::new(-2.0, -2.0, 0.0));
        assert_eq!(bbox.max, Vec3::new(2.0, 2.0, 10.0));
    }

    #[test]
    fn test_expand_by_invalid_box_is_ignored() {
        let mut bbox = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        bbox.expand_by_box(&BoundingBox::default());
        assert_eq!(bbox, BoundingBox::new(Vec3::ZERO, Vec3::ONE));
    }

    #[test]
    fn test_bounds_cover_nested_children() {
        let node = Node::new("root")
            .with_geometry(triangle(Vec3::ZERO))
            .with_child(Node::new("branch").with_child(
                Node::new("leaf").with_geometry(triangle(Vec3::new(5.0, -3.0, 2.0))),
            ));

        let bounds = node.compute_bounds();
        assert_eq!(bounds.min, Vec3::new(0.0, -3.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(6.0, 0.0, 3.0));
        assert_eq!(node.vertex_count(), 6);
    }

    #[test]
    fn test_empty_node_has_invalid_bounds() {
        assert!(!Node::new("empty").compute_bounds().valid());
    }

    #[test]
    fn test_index_count_falls_back_to_vertices() {
        let mut geometry = triangle(Vec3::ZERO);
        assert_eq!(geometry.index_count(), 3);
        geometry.indices = vec![0, 1, 2, 2, 1, 0];
        assert_eq!(geometry.index_count(), 6);
    }
}
