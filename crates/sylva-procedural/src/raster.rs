//! CPU-side images and normal-map packing.

use glam::{Vec2, Vec3};

/// Texel layout of an [`Image`]. All formats are 8 bits per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single channel.
    R8,
    /// Two channels; packed normal maps use this.
    Rg8,
    /// Three channels.
    Rgb8,
    /// Four channels.
    Rgba8,
}

impl PixelFormat {
    /// Number of channels per texel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rg8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A decoded image, rows top to bottom, tightly packed.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Image {
    /// Wraps raw texel data. Returns `None` if `data` does not match the dimensions.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * format.channels();
        (data.len() == expected).then_some(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// An image with every texel set to `texel`.
    pub fn filled(width: u32, height: u32, format: PixelFormat, texel: &[u8]) -> Self {
        debug_assert_eq!(texel.len(), format.channels());
        let data = texel
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * format.channels())
            .collect();
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw texel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The channels of the texel at `(x, y)`.
    pub fn texel(&self, x: u32, y: u32) -> &[u8] {
        let channels = self.format.channels();
        let offset = (y as usize * self.width as usize + x as usize) * channels;
        &self.data[offset..offset + channels]
    }

    /// Converts a tangent-space normal map into a two-channel octahedral encoding.
    ///
    /// Images that are already [`PixelFormat::Rg8`] are returned unchanged.
    /// Single-channel images carry no normal and map to "straight up".
    pub fn to_rg_normal_map(&self) -> Image {
        if self.format == PixelFormat::Rg8 {
            return self.clone();
        }

        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 2);
        for texel in self.data.chunks_exact(self.format.channels()) {
            let normal = match self.format {
                PixelFormat::Rgb8 | PixelFormat::Rgba8 => Vec3::new(
                    unorm_to_snorm(texel[0]),
                    unorm_to_snorm(texel[1]),
                    unorm_to_snorm(texel[2]),
                ),
                _ => Vec3::Z,
            };
            let packed = pack_normal_octahedral(normal);
            data.push(snorm_byte(packed.x));
            data.push(snorm_byte(packed.y));
        }

        Image {
            width: self.width,
            height: self.height,
            format: PixelFormat::Rg8,
            data,
        }
    }
}

impl From<image::DynamicImage> for Image {
    fn from(value: image::DynamicImage) -> Self {
        let (width, height) = (value.width(), value.height());
        let (format, data) = match value {
            image::DynamicImage::ImageLuma8(img) => (PixelFormat::R8, img.into_raw()),
            image::DynamicImage::ImageLumaA8(img) => (PixelFormat::Rg8, img.into_raw()),
            image::DynamicImage::ImageRgb8(img) => (PixelFormat::Rgb8, img.into_raw()),
            image::DynamicImage::ImageRgba8(img) => (PixelFormat::Rgba8, img.into_raw()),
            other => (PixelFormat::Rgba8, other.to_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            format,
            data,
        }
    }
}

/// Octahedral encoding of a unit normal into `[0, 1]^2`.
///
/// The zero vector encodes as "straight up" (`(0.5, 0.5)`).
pub fn pack_normal_octahedral(normal: Vec3) -> Vec2 {
    let l1 = normal.x.abs() + normal.y.abs() + normal.z.abs();
    if l1 <= f32::EPSILON {
        return Vec2::splat(0.5);
    }
    let n = normal / l1;
    let folded = if n.z >= 0.0 {
        Vec2::new(n.x, n.y)
    } else {
        Vec2::new(
            (1.0 - n.y.abs()) * sign_not_zero(n.x),
            (1.0 - n.x.abs()) * sign_not_zero(n.y),
        )
    };
    folded * 0.5 + Vec2::splat(0.5)
}

fn sign_not_zero(v: f32) -> f32 {
    if v >= 0.0 { 1.0 } else { -1.0 }
}

fn unorm_to_snorm(byte: u8) -> f32 {
    byte as f32 / 255.0 * 2.0 - 1.0
}

fn snorm_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_mismatched_data() {
        assert!(Image::new(2, 2, PixelFormat::Rgb8, vec![0; 12]).is_some());
        assert!(Image::new(2, 2, PixelFormat::Rgb8, vec![0; 11]).is_none());
    }

    #[test]
    fn test_straight_up_normal_packs_to_center() {
        let packed = pack_normal_octahedral(Vec3::Z);
        assert!((packed - Vec2::splat(0.5)).length() < 1e-6);
    }

    #[test]
    fn test_axis_normals_pack_to_edges() {
        let px = pack_normal_octahedral(Vec3::X);
        assert!((px - Vec2::new(1.0, 0.5)).length() < 1e-6);
        let ny = pack_normal_octahedral(Vec3::NEG_Y);
        assert!((ny - Vec2::new(0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_lower_hemisphere_folds_to_corners() {
        let packed = pack_normal_octahedral(Vec3::NEG_Z);
        assert!(packed.x == 1.0 || packed.x == 0.0);
        assert!(packed.y == 1.0 || packed.y == 0.0);
    }

    #[test]
    fn test_rgb_normal_map_converts_to_rg() {
        // (128, 128, 255) is the canonical flat tangent-space normal.
        let flat = Image::filled(4, 2, PixelFormat::Rgb8, &[128, 128, 255]);
        let packed = flat.to_rg_normal_map();
        assert_eq!(packed.format(), PixelFormat::Rg8);
        assert_eq!(packed.data().len(), 4 * 2 * 2);
        let texel = packed.texel(3, 1);
        assert!((texel[0] as i32 - 128).abs() <= 1);
        assert!((texel[1] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_rg_input_is_unchanged() {
        let rg = Image::filled(2, 2, PixelFormat::Rg8, &[10, 20]);
        assert_eq!(rg.to_rg_normal_map(), rg);
    }

    #[test]
    fn test_from_dynamic_image_keeps_layout() {
        let rgb = image::DynamicImage::new_rgb8(3, 2);
        let converted = Image::from(rgb);
        assert_eq!(converted.format(), PixelFormat::Rgb8);
        assert_eq!(converted.data().len(), 3 * 2 * 3);
    }
}
