//! Heliographic coordinates and their projection onto the image plane.
//!
//! The solar sphere is modelled with the x axis pointing at the observer,
//! y to the right and z to the north pole. Longitude is measured around z
//! from the x axis, latitude from the equator. Image y grows downwards, so
//! southern latitudes are positive.

use crate::{
    core::{constants::ASIN_PRECISION_THRESHOLD, geo::Point},
    solar::date::ImageDate,
    Result, ViewerError,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// Below this, a cosine is treated as zero and the dependent angle as 0.
const DEGENERATE_COSINE: f64 = 1e-15;

/// `asin` that tolerates inputs a few ULPs outside `[-1, 1]`.
///
/// Values within the precision band are clamped. Anything further out is a
/// real domain error and is reported, never clamped.
pub fn guarded_asin(value: f64, operation: &'static str) -> Result<f64> {
    let clamped = if value > 1.0 && value < ASIN_PRECISION_THRESHOLD {
        1.0
    } else if value < -1.0 && value > -ASIN_PRECISION_THRESHOLD {
        -1.0
    } else {
        value
    };

    if !(-1.0..=1.0).contains(&clamped) {
        return Err(ViewerError::NumericalDomain { operation, value });
    }
    Ok(clamped.asin())
}

/// Wrap an angle into `(-π, π]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// A point on the solar sphere, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn from_degrees(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude.to_radians(), longitude.to_radians())
    }

    /// Rotate in place, first by `z_axis` around the polar axis, then by
    /// `y_axis` around the horizontal image axis.
    ///
    /// Returns `true` when the point ends up on the far side of the sphere.
    /// The point is left untouched if the rotation fails.
    pub fn rotate(&mut self, y_axis: f64, z_axis: f64) -> Result<bool> {
        let latitude_z = self.latitude;
        let longitude_z = normalize_angle(self.longitude + z_axis);

        // Re-express the point with y as the pole so the y rotation becomes
        // a plain longitude shift.
        let y = latitude_z.cos() * longitude_z.sin();
        let z = latitude_z.sin();

        let latitude_y = guarded_asin(y, "rotate: latitude about y")?;
        let cos_latitude_y = latitude_y.cos();
        let mut longitude_y = if cos_latitude_y.abs() < DEGENERATE_COSINE {
            0.0
        } else {
            guarded_asin(z / cos_latitude_y, "rotate: longitude about y")?
        };

        // asin only covers the hemisphere facing +x.
        if longitude_z > FRAC_PI_2 {
            longitude_y = PI - longitude_y;
        } else if longitude_z < -FRAC_PI_2 {
            longitude_y = -PI - longitude_y;
        }

        longitude_y += y_axis;

        let x = cos_latitude_y * longitude_y.cos();

        let latitude = guarded_asin(cos_latitude_y * longitude_y.sin(), "rotate: latitude")?;
        let cos_latitude = latitude.cos();
        let mut longitude = if cos_latitude.abs() < DEGENERATE_COSINE {
            0.0
        } else {
            guarded_asin(latitude_y.sin() / cos_latitude, "rotate: longitude")?
        };

        if x < 0.0 {
            longitude = if longitude >= 0.0 { PI - longitude } else { -PI - longitude };
        }

        self.latitude = latitude;
        self.longitude = normalize_angle(longitude);
        Ok(x < 0.0)
    }

    /// Tilt the point by the obliquity of `date`.
    pub fn adjust_obliquity(&mut self, date: &ImageDate) -> Result<bool> {
        self.rotate(date.obliquity(), 0.0)
    }

    /// Project onto the image plane. `sun_radius` and `center` are fractions
    /// of the full image size.
    pub fn to_xy(&self, sun_radius: f64, center: Point) -> Point {
        Point::new(
            center.x + self.longitude.sin() * self.latitude.cos() * sun_radius,
            center.y + self.latitude.sin() * sun_radius,
        )
    }

    /// Inverse of [`LatLon::to_xy`] for the visible hemisphere.
    ///
    /// Returns `None` for points off the disk.
    pub fn from_xy(point: Point, sun_radius: f64, center: Point) -> Option<LatLon> {
        if !(sun_radius > 0.0) {
            return None;
        }
        let dx = (point.x - center.x) / sun_radius;
        let dy = (point.y - center.y) / sun_radius;
        if dx * dx + dy * dy > 1.0 {
            return None;
        }

        let latitude = guarded_asin(dy, "from_xy: latitude").ok()?;
        let cos_latitude = latitude.cos();
        let longitude = if cos_latitude.abs() < DEGENERATE_COSINE {
            0.0
        } else {
            guarded_asin(dx / cos_latitude, "from_xy: longitude").ok()?
        };
        Some(LatLon::new(latitude, longitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn center() -> Point {
        Point::new(0.5, 0.5)
    }

    fn assert_close(a: LatLon, b: LatLon) {
        assert!((a.latitude - b.latitude).abs() < 1e-9, "{:?} != {:?}", a, b);
        assert!(
            normalize_angle(a.longitude - b.longitude).abs() < 1e-9,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_clamp_band() {
        assert!((guarded_asin(1.0 + 2e-15, "test").unwrap() - FRAC_PI_2).abs() < EPS);
        assert!((guarded_asin(-1.0 - 2e-15, "test").unwrap() + FRAC_PI_2).abs() < EPS);

        let err = guarded_asin(1.0 + 1e-10, "test").unwrap_err();
        assert!(matches!(err, ViewerError::NumericalDomain { operation: "test", .. }));
        assert!(guarded_asin(f64::NAN, "test").is_err());
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(2.5 * PI) - FRAC_PI_2).abs() < EPS);
        assert!((normalize_angle(-1.5 * PI) - FRAC_PI_2).abs() < EPS);
        assert!((normalize_angle(-PI) - PI).abs() < EPS);
        assert!((normalize_angle(0.25) - 0.25).abs() < EPS);
    }

    #[test]
    fn test_rotate_around_z_moves_longitude() {
        let mut p = LatLon::from_degrees(10.0, 20.0);
        let behind = p.rotate(0.0, 30_f64.to_radians()).unwrap();
        assert!(!behind);
        assert_close(p, LatLon::from_degrees(10.0, 50.0));
    }

    #[test]
    fn test_rotate_past_limb_is_behind() {
        let mut p = LatLon::from_degrees(0.0, 80.0);
        assert!(p.rotate(0.0, 20_f64.to_radians()).unwrap());
        assert_close(p, LatLon::from_degrees(0.0, 100.0));
    }

    #[test]
    fn test_rotate_around_y_tilts_central_meridian() {
        // A point on the central meridian only changes latitude.
        let mut p = LatLon::from_degrees(10.0, 0.0);
        p.rotate(5_f64.to_radians(), 0.0).unwrap();
        assert_close(p, LatLon::from_degrees(15.0, 0.0));
    }

    #[test]
    fn test_obliquity_round_trip() {
        let date = ImageDate::from_ymd_hms(2003, 10, 28, 6, 0, 0).unwrap();
        for &(lat, lon) in &[(13.0, -62.0), (-20.0, 95.0), (45.0, 170.0), (-5.0, -120.0)] {
            let original = LatLon::from_degrees(lat, lon);
            let mut p = original;
            p.adjust_obliquity(&date).unwrap();
            p.rotate(-date.obliquity(), 0.0).unwrap();
            assert_close(p, original);
        }
    }

    #[test]
    fn test_to_xy() {
        let p = LatLon::from_degrees(0.0, 0.0);
        assert_eq!(p.to_xy(0.25, center()), center());

        let p = LatLon::from_degrees(30.0, 0.0);
        let xy = p.to_xy(0.2, center());
        assert!((xy.x - 0.5).abs() < EPS);
        assert!((xy.y - 0.6).abs() < EPS);
    }

    #[test]
    fn test_from_xy_inverts_to_xy() {
        let original = LatLon::from_degrees(-13.0, 62.0);
        let xy = original.to_xy(0.233, center());
        assert_close(LatLon::from_xy(xy, 0.233, center()).unwrap(), original);

        assert!(LatLon::from_xy(Point::new(0.0, 0.0), 0.233, center()).is_none());
        assert!(LatLon::from_xy(center(), 0.0, center()).is_none());
    }
}
