//! Impostor construction: low-cost billboard geometry standing in for full models.

use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::scene::{ALBEDO_UNIT, BoundingBox, Geometry, NORMAL_MAP_UNIT, Node};
use crate::texture::Texture;

/// Index of the side billboard color texture in [`ImpostorTextures`].
pub const SIDE_TEXTURE: usize = 0;
/// Index of the side billboard normal map.
pub const SIDE_NORMAL_MAP: usize = 1;
/// Index of the top billboard color texture.
pub const TOP_TEXTURE: usize = 2;
/// Index of the top billboard normal map.
pub const TOP_NORMAL_MAP: usize = 3;

/// Candidate impostor textures: side color, side normal, top color, top normal.
pub type ImpostorTextures = [Option<Arc<Texture>>; 4];

/// Builds impostor geometry for one asset from its bounds and billboard textures.
///
/// Registered per asset group on the [`BiomeManager`](crate::BiomeManager).
/// Returning `None` means the asset gets no impostor.
pub type CreateImpostorFn =
    Arc<dyn Fn(&BoundingBox, &ImpostorTextures) -> Option<Node> + Send + Sync>;

/// Fraction of the asset height at which the top billboard sits.
const TOP_BILLBOARD_HEIGHT: f32 = 0.8;

/// Two crossed vertical quads with the side billboard, plus a horizontal
/// quad with the top billboard when one exists.
///
/// Returns `None` without a side texture.
pub fn crossed_billboard(bbox: &BoundingBox, textures: &ImpostorTextures) -> Option<Node> {
    let side = textures[SIDE_TEXTURE].as_ref()?;
    let center = bbox.center();
    let (min, max) = (bbox.min, bbox.max);

    let mut positions = quad(
        Vec3::new(min.x, center.y, min.z),
        Vec3::new(max.x, center.y, min.z),
        Vec3::new(max.x, center.y, max.z),
        Vec3::new(min.x, center.y, max.z),
    );
    positions.extend(quad(
        Vec3::new(center.x, min.y, min.z),
        Vec3::new(center.x, max.y, min.z),
        Vec3::new(center.x, max.y, max.z),
        Vec3::new(center.x, min.y, max.z),
    ));

    let mut sides = Geometry::new(positions, [quad_uvs(), quad_uvs()].concat(), quad_indices(2));
    bind(&mut sides, side, textures[SIDE_NORMAL_MAP].as_ref());

    let mut node = Node::new("impostor").with_child(Node::new("impostor.side").with_geometry(sides));

    if let Some(top) = textures[TOP_TEXTURE].as_ref() {
        let z = min.z + (max.z - min.z) * TOP_BILLBOARD_HEIGHT;
        let mut cap = Geometry::new(
            quad(
                Vec3::new(min.x, min.y, z),
                Vec3::new(max.x, min.y, z),
                Vec3::new(max.x, max.y, z),
                Vec3::new(min.x, max.y, z),
            ),
            quad_uvs(),
            quad_indices(1),
        );
        bind(&mut cap, top, textures[TOP_NORMAL_MAP].as_ref());
        node = node.with_child(Node::new("impostor.top").with_geometry(cap));
    }

    Some(node)
}

fn bind(geometry: &mut Geometry, color: &Arc<Texture>, normal: Option<&Arc<Texture>>) {
    geometry.bind(ALBEDO_UNIT, color.clone());
    if let Some(normal) = normal {
        geometry.bind(NORMAL_MAP_UNIT, normal.clone());
    }
}

fn quad(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Vec<Vec3> {
    vec![a, b, c, d]
}

fn quad_uvs() -> Vec<Vec2> {
    vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y]
}

fn quad_indices(quads: u32) -> Vec<u32> {
    (0..quads)
        .flat_map(|q| {
            let base = q * 4;
            [base, base + 1, base + 2, base, base + 2, base + 3]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Image, PixelFormat};

    fn texture() -> Option<Arc<Texture>> {
        Some(Arc::new(Texture::new(Image::filled(
            1,
            1,
            PixelFormat::Rgba8,
            &[0, 0, 0, 255],
        ))))
    }

    #[test]
    fn test_no_side_texture_means_no_impostor() {
        let textures: ImpostorTextures = [None, None, texture(), None];
        assert!(crossed_billboard(&BoundingBox::from_extent(1.0, 2.0), &textures).is_none());
    }

    #[test]
    fn test_side_only_impostor_spans_bounds() {
        let bbox = BoundingBox::from_extent(2.0, 8.0);
        let textures: ImpostorTextures = [texture(), None, None, None];
        let node = crossed_billboard(&bbox, &textures).unwrap();

        assert_eq!(node.children.len(), 1);
        assert_eq!(node.vertex_count(), 8);
        assert_eq!(node.compute_bounds(), bbox);
    }

    #[test]
    fn test_top_quad_sits_below_crown() {
        let bbox = BoundingBox::from_extent(1.0, 10.0);
        let textures: ImpostorTextures = [texture(), texture(), texture(), None];
        let node = crossed_billboard(&bbox, &textures).unwrap();

        assert_eq!(node.children.len(), 2);
        let top = node.children[1].geometry.as_ref().unwrap();
        assert!(top.positions.iter().all(|p| (p.z - 8.0).abs() < 1e-5));
        assert!(top.texture(NORMAL_MAP_UNIT).is_none());

        let sides = node.children[0].geometry.as_ref().unwrap();
        assert!(sides.texture(NORMAL_MAP_UNIT).is_some());
        assert_eq!(sides.index_count(), 12);
    }
}
