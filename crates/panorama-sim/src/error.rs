//! Error types for the tour simulator binary.

/// Top-level error for the simulator.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Reading or parsing the map options failed.
    #[error("map options error: {source}")]
    Options {
        /// The underlying options error.
        #[from]
        source: panorama_core::config::ConfigError,
    },

    /// Reading the simulator config file failed.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A config section was malformed.
    #[error("invalid `{section}` section: {message}")]
    Section {
        /// Name of the offending section.
        section: &'static str,
        /// Description of the parse failure.
        message: String,
    },

    /// The popup template failed to compile.
    #[error("popup error: {source}")]
    Popup {
        /// The underlying popup error.
        #[from]
        source: panorama_core::popup::PopupError,
    },

    /// A scripted action referenced a point that does not exist.
    #[error("action at {at_ms} ms selects point {index}, but only {available} points exist")]
    UnknownPoint {
        /// Action offset.
        at_ms: u64,
        /// Requested point index.
        index: usize,
        /// Number of configured points.
        available: usize,
    },
}
