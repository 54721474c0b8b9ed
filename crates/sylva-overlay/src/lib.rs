//! Projected terrain overlays.
//!
//! An overlay graph is rendered from above into a texture by an auxiliary
//! render-to-texture (RTT) camera, and that texture is projected back onto
//! the terrain with eye-linear texture coordinate generation. The
//! [`OverlayProjector`] sizes the RTT camera's orthographic frustum every
//! cull pass so it covers what the main camera can see.

mod camera;
mod ellipsoid;
mod projector;

pub use camera::{CullView, RttCamera};
pub use ellipsoid::Ellipsoid;
pub use projector::{DEFAULT_TEXTURE_SIZE, DEFAULT_TEXTURE_UNIT, OverlayProjector};
