//! Map projection and coordinate transformation.
//!
//! Converts geographic coordinates (lon/lat degrees) to drawing coordinates
//! with an Albers conic equal-area projection. The pipeline is rotate, then
//! project onto the cone, then scale and translate so that the configured
//! center lands on the configured pixel.

use crate::config::MapConfig;
use geo_types::Coord;
use std::f64::consts::PI;

const EPSILON: f64 = 1e-6;
const TAU: f64 = 2.0 * PI;

/// Standard parallels of the US Albers projection, in degrees.
pub const ALBERS_PARALLELS: [f64; 2] = [29.5, 45.5];

/// The raw conic equal-area projection on the unit sphere (radians in, unit
/// plane coordinates out).
#[derive(Debug, Clone, Copy)]
struct ConicEqualArea {
    n: f64,
    c: f64,
    r0: f64,
}

impl ConicEqualArea {
    fn new(phi0: f64, phi1: f64) -> Self {
        let sy0 = phi0.sin();
        let mut n = (sy0 + phi1.sin()) / 2.0;
        // Parallels symmetric about the equator degenerate to a cylinder.
        if n.abs() < EPSILON {
            n = EPSILON.copysign(n);
        }
        let c = 1.0 + sy0 * (2.0 * n - sy0);
        let r0 = c.sqrt() / n;
        Self { n, c, r0 }
    }

    fn project(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let r = (self.c - 2.0 * self.n * phi.sin()).max(0.0).sqrt() / self.n;
        let x = lambda * self.n;
        (r * x.sin(), self.r0 - r * x.cos())
    }

    fn invert(&self, x: f64, y: f64) -> (f64, f64) {
        let r0y = self.r0 - y;
        let mut l = x.atan2(r0y.abs()) * r0y.signum();
        if r0y * self.n < 0.0 {
            l -= PI * x.signum() * r0y.signum();
        }
        let s = (self.c - (x * x + r0y * r0y) * self.n * self.n) / (2.0 * self.n);
        (l / self.n, s.clamp(-1.0, 1.0).asin())
    }
}

/// Spherical rotation by `[lambda, phi, gamma]` radians.
#[derive(Debug, Clone, Copy)]
struct Rotation {
    lambda: f64,
    phi: f64,
    gamma: f64,
}

impl Rotation {
    fn from_degrees(rotate: [f64; 3]) -> Self {
        Self {
            lambda: (rotate[0] % 360.0).to_radians(),
            phi: (rotate[1] % 360.0).to_radians(),
            gamma: (rotate[2] % 360.0).to_radians(),
        }
    }

    fn forward(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let lambda = wrap_longitude(lambda + self.lambda);
        if self.phi == 0.0 && self.gamma == 0.0 {
            return (lambda, phi);
        }
        let (sin_dp, cos_dp) = self.phi.sin_cos();
        let (sin_dg, cos_dg) = self.gamma.sin_cos();
        let cos_phi = phi.cos();
        let x = lambda.cos() * cos_phi;
        let y = lambda.sin() * cos_phi;
        let z = phi.sin();
        let k = z * cos_dp + x * sin_dp;
        (
            (y * cos_dg - k * sin_dg).atan2(x * cos_dp - z * sin_dp),
            (k * cos_dg + y * sin_dg).clamp(-1.0, 1.0).asin(),
        )
    }

    fn invert(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let (lambda, phi) = if self.phi == 0.0 && self.gamma == 0.0 {
            (lambda, phi)
        } else {
            let (sin_dp, cos_dp) = self.phi.sin_cos();
            let (sin_dg, cos_dg) = self.gamma.sin_cos();
            let cos_phi = phi.cos();
            let x = lambda.cos() * cos_phi;
            let y = lambda.sin() * cos_phi;
            let z = phi.sin();
            let k = z * cos_dg - y * sin_dg;
            (
                (y * cos_dg + z * sin_dg).atan2(x * cos_dp + k * sin_dp),
                (k * cos_dp - x * sin_dp).clamp(-1.0, 1.0).asin(),
            )
        };
        (wrap_longitude(lambda - self.lambda), phi)
    }
}

fn wrap_longitude(lambda: f64) -> f64 {
    if lambda > PI {
        lambda - TAU
    } else if lambda < -PI {
        lambda + TAU
    } else {
        lambda
    }
}

/// Albers projection shared by every map layer.
///
/// Built once from a [`MapConfig`] and passed by reference to whatever needs
/// to turn coordinates into pixels.
#[derive(Debug, Clone)]
pub struct MapProjection {
    raw: ConicEqualArea,
    rotation: Rotation,
    scale: f64,
    /// Offset applied after scaling so the center hits the translate point.
    dx: f64,
    dy: f64,
}

impl Default for MapProjection {
    fn default() -> Self {
        Self::new(&MapConfig::default())
    }
}

impl MapProjection {
    /// Creates the projection described by `config`.
    pub fn new(config: &MapConfig) -> Self {
        Self::with_parameters(
            ALBERS_PARALLELS,
            config.scale,
            config.rotate(),
            config.center(),
            config.translate,
        )
    }

    /// Creates a conic equal-area projection from explicit parameters (all
    /// angles in degrees).
    pub fn with_parameters(
        parallels: [f64; 2],
        scale: f64,
        rotate: [f64; 3],
        center: [f64; 2],
        translate: [f64; 2],
    ) -> Self {
        let raw = ConicEqualArea::new(parallels[0].to_radians(), parallels[1].to_radians());
        let (cx, cy) = raw.project(center[0].to_radians(), center[1].to_radians());
        let dx = translate[0] - scale * cx;
        let dy = translate[1] + scale * cy;

        log::debug!(
            "Projection: scale={} rotate={:?} center={:?} translate={:?}",
            scale,
            rotate,
            center,
            translate
        );

        Self {
            raw,
            rotation: Rotation::from_degrees(rotate),
            scale,
            dx,
            dy,
        }
    }

    /// Projects a (lon, lat) coordinate in degrees to drawing coordinates.
    pub fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        let (lambda, phi) = self
            .rotation
            .forward(coord.x.to_radians(), coord.y.to_radians());
        let (x, y) = self.raw.project(lambda, phi);
        Coord {
            x: self.dx + self.scale * x,
            y: self.dy - self.scale * y,
        }
    }

    /// Projects a GeoJSON position (`[lon, lat, ..]`).
    ///
    /// Returns None for positions with fewer than two components.
    pub fn project_position(&self, position: &[f64]) -> Option<Coord<f64>> {
        match position {
            [x, y, ..] => Some(self.project(Coord { x: *x, y: *y })),
            _ => None,
        }
    }

    /// Converts drawing coordinates back to (lon, lat) degrees.
    ///
    /// Returns None when the result is not a finite coordinate.
    pub fn invert(&self, point: Coord<f64>) -> Option<Coord<f64>> {
        let x = (point.x - self.dx) / self.scale;
        let y = (self.dy - point.y) / self.scale;
        let (lambda, phi) = self.raw.invert(x, y);
        let (lambda, phi) = self.rotation.invert(lambda, phi);
        let coord = Coord {
            x: lambda.to_degrees(),
            y: phi.to_degrees(),
        };
        (coord.x.is_finite() && coord.y.is_finite()).then_some(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Coord<f64>, expected: (f64, f64), tolerance: f64) {
        assert!(
            (actual.x - expected.0).abs() < tolerance && (actual.y - expected.1).abs() < tolerance,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_origin_golden_value() {
        let projection = MapProjection::default();
        let p = projection.project(Coord { x: 0.0, y: 0.0 });
        assert_close(p, (648566.7388926602, -265896.55077346327), 1e-4);
    }

    #[test]
    fn test_center_lands_on_translate() {
        let projection = MapProjection::default();
        let p = projection.project(Coord {
            x: -122.4194,
            y: 37.7749,
        });
        assert_close(p, (480.0, 250.0), 1e-6);
    }

    #[test]
    fn test_known_point_in_the_city() {
        let projection = MapProjection::default();
        let p = projection.project(Coord {
            x: -122.45,
            y: 37.76,
        });
        assert_close(p, (333.65802874176234, 341.8894729972817), 1e-6);
    }

    #[test]
    fn test_invert_recovers_coordinate() {
        let projection = MapProjection::default();
        let original = Coord {
            x: -122.51,
            y: 37.71,
        };
        let back = projection.invert(projection.project(original)).unwrap();
        assert_close(back, (original.x, original.y), 1e-9);
    }

    #[test]
    fn test_project_position_needs_two_components() {
        let projection = MapProjection::default();
        assert!(projection.project_position(&[1.0]).is_none());
        assert!(projection.project_position(&[-122.4194, 37.7749, 12.0]).is_some());
    }
}
