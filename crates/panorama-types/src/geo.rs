//! Geographic primitives shared by the host and the controller.
//!
//! Coordinates follow the web-map convention of longitude first. A
//! [`LngLat`] serializes as a two-element JSON array `[lng, lat]`, which is
//! the shape the host already uses for camera centers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A geographic position as `[longitude, latitude]` in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LngLat(pub f64, pub f64);

impl LngLat {
    /// Create a position from longitude and latitude in degrees.
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self(lng, lat)
    }

    /// Longitude in degrees.
    pub const fn lng(self) -> f64 {
        self.0
    }

    /// Latitude in degrees.
    pub const fn lat(self) -> f64 {
        self.1
    }
}

/// A rectangular longitude/latitude constraint on camera panning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// South-west corner (minimum longitude and latitude).
    pub south_west: LngLat,
    /// North-east corner (maximum longitude and latitude).
    pub north_east: LngLat,
}

impl BoundingBox {
    /// Whether the position lies inside the box, edges included.
    pub fn contains(&self, position: LngLat) -> bool {
        position.lng() >= self.south_west.lng()
            && position.lng() <= self.north_east.lng()
            && position.lat() >= self.south_west.lat()
            && position.lat() <= self.north_east.lat()
    }
}

/// Measured on-screen size of a mount target, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Dimensions {
    /// Layout width.
    pub width: f64,
    /// Layout height.
    pub height: f64,
}

impl Dimensions {
    /// Create dimensions from width and height.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A target is measurable once both sides are strictly positive.
    pub fn is_measurable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}
