//! The host page boundary.
//!
//! [`HostDocument`] stands in for the page the map is embedded in: it can
//! insert and remove the engine's script and stylesheet directives.
//! [`MountTarget`] is the element the map renders into; its measured size
//! may stay zero for a while when the surrounding layout is controlled by
//! another tool.

use panorama_types::Dimensions;
use tokio::sync::oneshot;

use crate::engine::MapRuntime;
use crate::loader::LoadError;

/// Identifier of a directive inserted into the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(pub u64);

/// Single completion signal of a script load, carrying the engine runtime
/// the script provides.
pub type ScriptCompletion<R> = oneshot::Receiver<Result<R, LoadError>>;

/// The document the map is embedded in.
pub trait HostDocument: Send + 'static {
    /// Runtime made available once the engine script has loaded.
    type Runtime: MapRuntime;

    /// Insert a stylesheet link.
    fn append_stylesheet(&mut self, href: &str) -> AssetId;

    /// Insert a script directive. The returned receiver resolves once, when
    /// the script has loaded or failed.
    fn append_script(&mut self, src: &str) -> (AssetId, ScriptCompletion<Self::Runtime>);

    /// Remove a previously inserted directive. Unknown ids are ignored.
    fn remove_asset(&mut self, id: AssetId);
}

/// The element the map renders into.
pub trait MountTarget: Send + 'static {
    /// Element identifier passed to the engine as its container.
    fn id(&self) -> &str;

    /// Current measured layout size.
    fn dimensions(&self) -> Dimensions;
}
