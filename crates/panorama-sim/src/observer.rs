//! Session observer that logs every notification and counts them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use panorama_core::session::SessionObserver;
use panorama_types::PointOfInterest;
use tracing::info;

/// Notification counts, readable while the session runs.
#[derive(Debug, Default)]
pub struct ObservedCounts {
    ready: AtomicUsize,
    clicks: AtomicUsize,
}

impl ObservedCounts {
    /// Times the map reported ready.
    pub fn ready(&self) -> usize {
        self.ready.load(Ordering::SeqCst)
    }

    /// Selection notices delivered.
    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }
}

/// Logs map-ready and marker-click notifications.
pub struct LoggingObserver {
    counts: Arc<ObservedCounts>,
}

impl LoggingObserver {
    /// Create an observer that records into `counts`.
    pub const fn new(counts: Arc<ObservedCounts>) -> Self {
        Self { counts }
    }
}

impl SessionObserver for LoggingObserver {
    fn on_map_ready(&mut self) {
        self.counts.ready.fetch_add(1, Ordering::SeqCst);
        info!("Map ready");
    }

    fn on_marker_click(&mut self, point: &PointOfInterest, index: usize) {
        self.counts.clicks.fetch_add(1, Ordering::SeqCst);
        info!(index, title = %point.title, "Point in view");
    }
}
