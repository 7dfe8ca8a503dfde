//! Adjustment applier: executes one descriptor against a role's stack.
//!
//! The role's stack state is the explicit [`StackCursor`]: the base layer the
//! role targets and the current top of its adjustment stack. The applier takes
//! a cursor and returns the next one; it never reads "current top" from the
//! document.

use tracing::debug;

use crate::adjustment::{AdjustmentDescriptor, Operation};
use crate::error::{ErrorKind, PipelineError, Result};
use crate::host::Document;
use crate::layer::LayerRef;

/// Where the next adjustment of a role goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackCursor {
    /// The role's original target layer.
    pub base: LayerRef,
    /// Topmost layer of the role's stack; new adjustments clip above it.
    pub top: LayerRef,
}

impl StackCursor {
    pub fn new(base: LayerRef) -> Self {
        Self {
            top: base.clone(),
            base,
        }
    }
}

/// Result of applying one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Cursor for the next descriptor.
    pub cursor: StackCursor,
    /// The adjustment layer created, if the descriptor made one.
    pub construct: Option<LayerRef>,
}

/// Apply `descriptor` to the stack described by `cursor`.
///
/// Layer operations create the adjustment layer, move it directly above
/// `cursor.top` and clip it; the returned cursor's top is the new layer.
/// Filter operations edit `cursor.base` pixels and leave the cursor as is.
///
/// # Errors
/// * `TargetInvalid` - the base or top layer no longer exists
/// * `ConstructCreationFailed` - the host refused to create, place, clip or filter
pub async fn apply<D>(doc: &mut D, descriptor: &AdjustmentDescriptor, cursor: StackCursor) -> Result<ApplyOutcome>
where
    D: Document + ?Sized,
{
    ensure_exists(&*doc, &cursor.base).await?;
    if cursor.top.id != cursor.base.id {
        ensure_exists(&*doc, &cursor.top).await?;
    }

    match descriptor.operation() {
        Operation::Layer(adjustment) => {
            let construct = doc
                .create_adjustment_layer(&adjustment)
                .await
                .map_err(|e| PipelineError::from_host(ErrorKind::ConstructCreationFailed, e))?;
            doc.move_above(construct.id, cursor.top.id)
                .await
                .map_err(|e| PipelineError::from_host(ErrorKind::ConstructCreationFailed, e))?;
            doc.set_clipped(construct.id, true)
                .await
                .map_err(|e| PipelineError::from_host(ErrorKind::ConstructCreationFailed, e))?;

            debug!(
                %descriptor,
                base = %cursor.base.id,
                clip_onto = %cursor.top.id,
                construct = %construct.id,
                "adjustment layer created"
            );

            Ok(ApplyOutcome {
                cursor: StackCursor {
                    base: cursor.base,
                    top: construct.clone(),
                },
                construct: Some(construct),
            })
        }
        Operation::Filter(filter) => {
            doc.apply_filter(cursor.base.id, &filter)
                .await
                .map_err(|e| PipelineError::from_host(ErrorKind::ConstructCreationFailed, e))?;

            debug!(%descriptor, base = %cursor.base.id, "filter applied");

            Ok(ApplyOutcome {
                cursor,
                construct: None,
            })
        }
    }
}

async fn ensure_exists<D>(doc: &D, layer: &LayerRef) -> Result<()>
where
    D: Document + ?Sized,
{
    match doc.layer(layer.id).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(PipelineError::target_invalid(format!("{layer} no longer exists"))),
        Err(e) => Err(PipelineError::from_host(ErrorKind::TargetInvalid, e)),
    }
}
