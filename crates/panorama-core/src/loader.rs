//! One-shot loading of the engine runtime.
//!
//! [`ResourceLoader`] owns the host document for the lifetime of a session.
//! It inserts the engine's script and stylesheet exactly once, hands out the
//! runtime when the script's completion signal fires, and removes both
//! directives again on [`release`](ResourceLoader::release).
//!
//! A failed load is final: nothing is retried. Once released, a completion
//! that was still in flight is dropped and never observed.

use tracing::{debug, info};

use crate::host::{AssetId, HostDocument, ScriptCompletion};

/// Errors reported for an engine script load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The host reported that the script failed to load.
    #[error("engine script failed to load from {url}: {reason}")]
    Failed {
        /// Script URL.
        url: String,
        /// Explanation from the host.
        reason: String,
    },

    /// The host dropped the completion signal without reporting.
    #[error("engine script load was abandoned by the host")]
    Abandoned,
}

/// Inserts and later removes the engine's script and stylesheet.
pub struct ResourceLoader<D: HostDocument> {
    document: D,
    script: Option<AssetId>,
    stylesheet: Option<AssetId>,
    completion: Option<ScriptCompletion<D::Runtime>>,
    started: bool,
}

impl<D: HostDocument> ResourceLoader<D> {
    /// Wrap a host document. Nothing is inserted until [`load`](Self::load).
    pub const fn new(document: D) -> Self {
        Self {
            document,
            script: None,
            stylesheet: None,
            completion: None,
            started: false,
        }
    }

    /// Insert the script and stylesheet directives.
    ///
    /// Returns `false` without touching the document if a load was already
    /// started for this session.
    pub fn load(&mut self, script_url: &str, stylesheet_url: &str) -> bool {
        if self.started {
            debug!("engine resources already requested, ignoring");
            return false;
        }
        self.started = true;

        let (script, completion) = self.document.append_script(script_url);
        let stylesheet = self.document.append_stylesheet(stylesheet_url);
        self.script = Some(script);
        self.stylesheet = Some(stylesheet);
        self.completion = Some(completion);

        info!(script_url, stylesheet_url, "Engine resources requested");
        true
    }

    /// Whether a completion signal is still outstanding.
    pub const fn is_pending(&self) -> bool {
        self.completion.is_some()
    }

    /// Wait for the script's completion signal and take the runtime.
    ///
    /// Resolves at most once per session. When no load is outstanding the
    /// returned future never resolves, which lets it sit in a `select!`.
    pub async fn completion(&mut self) -> Result<D::Runtime, LoadError> {
        let Some(receiver) = self.completion.as_mut() else {
            return std::future::pending().await;
        };
        let outcome = receiver.await;
        self.completion = None;
        match outcome {
            Ok(result) => result,
            Err(_closed) => Err(LoadError::Abandoned),
        }
    }

    /// Remove every inserted directive and drop any in-flight completion.
    ///
    /// Safe to call repeatedly; later calls are no-ops.
    pub fn release(&mut self) {
        self.completion = None;
        if let Some(id) = self.script.take() {
            self.document.remove_asset(id);
            debug!(asset = id.0, "Engine script removed");
        }
        if let Some(id) = self.stylesheet.take() {
            self.document.remove_asset(id);
            debug!(asset = id.0, "Engine stylesheet removed");
        }
    }

    /// Whether any inserted directive is still in the document.
    pub const fn holds_assets(&self) -> bool {
        self.script.is_some() || self.stylesheet.is_some()
    }
}
