//! Grouping & effect stage: merge the processed stacks into one container and
//! shade it.

use tracing::{debug, info};

use crate::effect::EffectSpec;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::host::Document;
use crate::layer::{LayerId, LayerRef};

/// Select `layers`, group them, and attach `effect` to the new group.
///
/// `layers` must hold every role base and every construct above it, so the
/// visual stacks survive the move into the container. Duplicates are ignored.
/// If `name` is given the group is renamed to it.
///
/// # Errors
/// * `GroupingFailed` - fewer than two of the layers exist, or the host could
///   not select, group or rename
/// * `EffectApplyFailed` - the host rejected the effect
pub async fn group_and_shade<D>(doc: &mut D, layers: &[LayerRef], effect: &EffectSpec, name: Option<&str>) -> Result<LayerRef>
where
    D: Document + ?Sized,
{
    let mut ids: Vec<LayerId> = Vec::with_capacity(layers.len());
    for layer in layers {
        if ids.contains(&layer.id) {
            continue;
        }
        let exists = doc
            .layer(layer.id)
            .await
            .map_err(|e| PipelineError::from_host(ErrorKind::GroupingFailed, e))?
            .is_some();
        if exists {
            ids.push(layer.id);
        } else {
            debug!(layer = %layer, "skipping vanished layer");
        }
    }
    if ids.len() < 2 {
        return Err(PipelineError::grouping_failed(format!(
            "need at least 2 layers to group, found {}",
            ids.len()
        )));
    }

    doc.select_layers(&ids)
        .await
        .map_err(|e| PipelineError::from_host(ErrorKind::GroupingFailed, e))?;
    let group = doc
        .group_selection()
        .await
        .map_err(|e| PipelineError::from_host(ErrorKind::GroupingFailed, e))?;
    if let Some(name) = name {
        doc.rename_layer(group, name)
            .await
            .map_err(|e| PipelineError::from_host(ErrorKind::GroupingFailed, e))?;
    }
    info!(group = %group, members = ids.len(), "layers grouped");

    doc.set_layer_effects(group, effect)
        .await
        .map_err(|e| PipelineError::from_host(ErrorKind::EffectApplyFailed, e))?;

    doc.layer(group)
        .await
        .map_err(|e| PipelineError::from_host(ErrorKind::GroupingFailed, e))?
        .ok_or_else(|| PipelineError::grouping_failed(format!("{group} vanished after grouping")))
}
