//! Shared type definitions for the Panorama map tour controller.
//!
//! This crate holds every type that crosses the boundary between the host
//! page and the session controller. Types defined here flow to `TypeScript`
//! via `ts-rs` so the embedding page builds its configuration against the
//! same shapes the controller deserializes.
//!
//! # Modules
//!
//! - [`ids`] -- Session identifier
//! - [`geo`] -- Longitude/latitude pairs, bounding boxes, layout dimensions
//! - [`point`] -- Points of interest shown as markers
//! - [`options`] -- Partial configuration groups supplied by the host

pub mod geo;
pub mod ids;
pub mod options;
pub mod point;

pub use geo::{BoundingBox, Dimensions, LngLat};
pub use ids::SessionId;
pub use options::{
    AnimationOptions, BootstrapOptions, CameraOptions, ListAlign, MapLibreOptions, MapOptions,
    MarkerDimension, MarkerOptions, RotationOptions, StepScheduler, StyleOptions, TerrainOptions,
    UiOptions,
};
pub use point::PointOfInterest;
