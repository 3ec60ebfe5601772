//! Points of interest rendered as markers with popups.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::LngLat;

/// A location on the tour, shown as a marker with a popup and listed in
/// the location panel.
///
/// The full ordered list is handed to a session once, at mount, and is
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct PointOfInterest {
    /// Stable identifier. When absent the point's position in the list is
    /// used instead.
    #[serde(default)]
    pub id: Option<String>,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Heading shown in the popup and the list.
    pub title: String,
    /// Descriptive text shown under the title.
    #[serde(default)]
    pub info_text: Option<String>,
    /// Image URL shown at the top of the popup.
    #[serde(default)]
    pub image: Option<String>,
    /// Marker icon URL.
    #[serde(default)]
    pub pin: Option<String>,
    /// External link rendered as "Learn More".
    #[serde(default)]
    pub url: Option<String>,
}

impl PointOfInterest {
    /// Create a point with only the required fields set.
    pub fn new(lat: f64, lng: f64, title: impl Into<String>) -> Self {
        Self {
            id: None,
            lat,
            lng,
            title: title.into(),
            info_text: None,
            image: None,
            pin: None,
            url: None,
        }
    }

    /// The point's position as `[lng, lat]`.
    pub const fn position(&self) -> LngLat {
        LngLat::new(self.lng, self.lat)
    }

    /// Identifier used to key the point in lists: its `id`, or its index.
    pub fn key(&self, index: usize) -> String {
        self.id.clone().unwrap_or_else(|| index.to_string())
    }
}
