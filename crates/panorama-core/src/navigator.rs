//! Fly-to navigation toward a selected point.
//!
//! Selecting a point flies the camera to it and, shortly before the flight
//! is expected to land, notifies the host that the point was selected so
//! it can open the point's details in sync with the arrival. The notice is
//! scheduled on the caller's clock from the configured flight duration;
//! it is not tied to the engine's move-end signal.
//!
//! Requests are not coordinated with one another. A second fly-to issued
//! mid-flight retargets the engine, and both selection notices still fire.

use std::time::Duration;

use panorama_types::PointOfInterest;

use crate::config::{AnimationConfig, UiConfig};
use crate::engine::FlyTo;

/// How much earlier than the flight's nominal end the selection notice
/// fires.
pub const SELECTION_LEAD: Duration = Duration::from_millis(200);

/// Everything the session does for one navigation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Navigation {
    /// Camera request to send to the engine.
    pub request: FlyTo,
    /// Delay after which the selection notice fires.
    pub notify_after: Duration,
    /// Whether the location list should close.
    pub close_list: bool,
}

/// Plans fly-to transitions from the resolved animation and UI settings.
#[derive(Debug, Clone, Copy)]
pub struct CameraNavigator {
    animation: AnimationConfig,
    list_pinned: bool,
}

impl CameraNavigator {
    /// Create a navigator from resolved configuration.
    pub const fn from_config(animation: AnimationConfig, ui: &UiConfig) -> Self {
        Self {
            animation,
            list_pinned: ui.list_always_visible,
        }
    }

    /// Plan the navigation toward `point`.
    pub fn plan(&self, point: &PointOfInterest) -> Navigation {
        let duration_ms = self.animation.fly_to_duration_ms;
        Navigation {
            request: FlyTo {
                center: point.position(),
                zoom: self.animation.zoom_level,
                duration_ms,
            },
            notify_after: delay_from_ms(duration_ms).saturating_sub(SELECTION_LEAD),
            close_list: !self.list_pinned,
        }
    }
}

/// Convert a millisecond count into a delay. Negative and non-finite
/// values become zero.
pub fn delay_from_ms(ms: f64) -> Duration {
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(ms / 1_000.0).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn navigator(duration_ms: f64, pinned: bool) -> CameraNavigator {
        CameraNavigator::from_config(
            AnimationConfig {
                fly_to_duration_ms: duration_ms,
                zoom_level: 16.0,
            },
            &UiConfig {
                list_always_visible: pinned,
                ..UiConfig::default()
            },
        )
    }

    #[test]
    fn notice_fires_two_hundred_ms_before_landing() {
        let point = PointOfInterest::new(46.68, 8.76, "Lake");
        let plan = navigator(2_400.0, false).plan(&point);
        assert_eq!(plan.notify_after, Duration::from_millis(2_200));
        assert_eq!(plan.request.center, point.position());
        assert!((plan.request.zoom - 16.0).abs() < 1e-12);
        assert!((plan.request.duration_ms - 2_400.0).abs() < 1e-12);
        assert!(plan.close_list);
    }

    #[test]
    fn short_flights_notify_immediately() {
        let point = PointOfInterest::new(0.0, 0.0, "Origin");
        assert_eq!(navigator(150.0, false).plan(&point).notify_after, Duration::ZERO);
        assert_eq!(navigator(-10.0, false).plan(&point).notify_after, Duration::ZERO);
    }

    #[test]
    fn pinned_list_stays_open() {
        let point = PointOfInterest::new(0.0, 0.0, "Origin");
        assert!(!navigator(2_400.0, true).plan(&point).close_list);
    }

    #[test]
    fn delay_conversion_handles_odd_values() {
        assert_eq!(delay_from_ms(f64::NAN), Duration::ZERO);
        assert_eq!(delay_from_ms(f64::NEG_INFINITY), Duration::ZERO);
        assert_eq!(delay_from_ms(1_500.0), Duration::from_millis(1_500));
        assert_eq!(delay_from_ms(1e300), Duration::MAX);
    }
}
