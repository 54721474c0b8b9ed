//! Reference ellipsoid.

/// An oblate reference ellipsoid, radii in meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    /// Equatorial (semi-major) radius.
    pub radius_equator: f64,
    /// Polar (semi-minor) radius.
    pub radius_polar: f64,
}

impl Ellipsoid {
    /// The WGS84 ellipsoid.
    pub const WGS84: Ellipsoid = Ellipsoid {
        radius_equator: 6_378_137.0,
        radius_polar: 6_356_752.314_245,
    };

    /// Creates an ellipsoid from its two radii.
    pub fn new(radius_equator: f64, radius_polar: f64) -> Self {
        Self {
            radius_equator,
            radius_polar,
        }
    }

    /// A sphere of `radius`.
    pub fn sphere(radius: f64) -> Self {
        Self::new(radius, radius)
    }

    /// `(a - b) / a`.
    pub fn flattening(&self) -> f64 {
        (self.radius_equator - self.radius_polar) / self.radius_equator
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_flattening() {
        let inverse = 1.0 / Ellipsoid::WGS84.flattening();
        assert!((inverse - 298.257_223_563).abs() < 1e-6);
    }

    #[test]
    fn test_sphere_has_no_flattening() {
        assert_eq!(Ellipsoid::sphere(1000.0).flattening(), 0.0);
    }
}
