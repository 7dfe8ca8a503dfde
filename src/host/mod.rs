//! Host document interface.
//!
//! The pipeline never touches pixels or layer trees itself. It drives a host
//! through two traits:
//!
//! - [`Document`] - layer lookup plus the structural edits the pipeline issues
//!   (create adjustment, move, clip, filter, select, group, effects)
//! - [`HistoryControl`] - suspend/resume pair collapsing edits into one undo step
//!
//! Every operation is `async`: a real host may suspend while it performs the
//! edit. The pipeline awaits them strictly one after another and holds the
//! host by `&mut`, so structural edits can never interleave.
//!
//! [`memory::MemoryDocument`] is a complete in-process host backed by
//! `ndarray` rasters.

pub mod memory;
pub mod raster;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::adjustment::{AdjustmentLayer, FilterSpec};
use crate::effect::EffectSpec;
use crate::layer::{DocumentId, LayerId, LayerRef};

/// Host call that failed, for error messages and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOperation {
    CreateAdjustmentLayer,
    MoveAbove,
    SetClipped,
    ApplyFilter,
    SelectLayers,
    GroupSelection,
    RenameLayer,
    SetLayerEffects,
    SuspendHistory,
    ResumeHistory,
}

impl HostOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateAdjustmentLayer => "create_adjustment_layer",
            Self::MoveAbove => "move_above",
            Self::SetClipped => "set_clipped",
            Self::ApplyFilter => "apply_filter",
            Self::SelectLayers => "select_layers",
            Self::GroupSelection => "group_selection",
            Self::RenameLayer => "rename_layer",
            Self::SetLayerEffects => "set_layer_effects",
            Self::SuspendHistory => "suspend_history",
            Self::ResumeHistory => "resume_history",
        }
    }
}

impl fmt::Display for HostOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct HostError {
    pub operation: HostOperation,
    pub message: String,
}

impl HostError {
    pub fn new(operation: HostOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }

    pub fn unknown_layer(operation: HostOperation, id: LayerId) -> Self {
        Self::new(operation, format!("{id} does not exist"))
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Opaque token returned by [`HistoryControl::suspend_history`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuspensionId(pub u64);

/// Layered document the pipeline edits.
#[async_trait]
pub trait Document: Send + Sync {
    fn id(&self) -> DocumentId;

    /// Look up a layer anywhere in the tree; `Ok(None)` if it does not exist.
    async fn layer(&self, id: LayerId) -> HostResult<Option<LayerRef>>;

    /// Group directly containing the layer; `Ok(None)` at the top level or
    /// for an unknown id.
    async fn parent(&self, id: LayerId) -> HostResult<Option<LayerId>>;

    /// Create a parameterized adjustment layer. Placement is up to the host;
    /// callers reposition it with [`move_above`](Self::move_above).
    async fn create_adjustment_layer(&mut self, adjustment: &AdjustmentLayer) -> HostResult<LayerRef>;

    /// Move `layer` so it sits directly above `anchor`.
    async fn move_above(&mut self, layer: LayerId, anchor: LayerId) -> HostResult<()>;

    /// Set or clear "clip to layer below".
    async fn set_clipped(&mut self, layer: LayerId, clipped: bool) -> HostResult<()>;

    /// Run a pixel filter on the layer in place.
    async fn apply_filter(&mut self, layer: LayerId, filter: &FilterSpec) -> HostResult<()>;

    /// Replace the selection with exactly these layers.
    async fn select_layers(&mut self, ids: &[LayerId]) -> HostResult<()>;

    /// Merge the current selection into a new group; returns the group id.
    async fn group_selection(&mut self) -> HostResult<LayerId>;

    async fn rename_layer(&mut self, layer: LayerId, name: &str) -> HostResult<()>;

    /// Attach a drop shadow effect to the layer.
    async fn set_layer_effects(&mut self, layer: LayerId, effect: &EffectSpec) -> HostResult<()>;
}

/// History suspension keyed by document identity.
#[async_trait]
pub trait HistoryControl: Send {
    /// Start collapsing edits into one history entry named `name`.
    async fn suspend_history(&mut self, document: DocumentId, name: &str) -> HostResult<SuspensionId>;

    /// Close the suspension; the collapsed entry is committed.
    async fn resume_history(&mut self, suspension: SuspensionId) -> HostResult<()>;
}

/// Everything the pipeline needs from its host.
pub trait Host: Document + HistoryControl {}

impl<T: Document + HistoryControl> Host for T {}
