//! Pan-range bounding box around the initial camera center.
//!
//! The camera is kept within a fixed radius of where the tour starts. The
//! radius is converted to degrees with the flat 111 km-per-degree
//! approximation; longitude degrees shrink toward the poles, so the
//! longitude delta is further divided by the cosine of the center latitude.

use panorama_types::{BoundingBox, LngLat};

/// Kilometers spanned by one degree of latitude.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Latitude and longitude half-extents, in degrees, of a radius around a
/// center latitude.
pub fn degree_deltas(center_lat: f64, radius_km: f64) -> (f64, f64) {
    let lat_delta = radius_km / KM_PER_DEGREE;
    let lng_delta = radius_km / (KM_PER_DEGREE * center_lat.to_radians().cos());
    (lat_delta, lng_delta)
}

/// Bounding box extending `radius_km` from `center` in every direction.
pub fn bounds_around(center: LngLat, radius_km: f64) -> BoundingBox {
    let (lat_delta, lng_delta) = degree_deltas(center.lat(), radius_km);
    BoundingBox {
        south_west: LngLat::new(center.lng() - lng_delta, center.lat() - lat_delta),
        north_east: LngLat::new(center.lng() + lng_delta, center.lat() + lat_delta),
    }
}
