//! Layer pipeline runner.
//!
//! Runs each role's descriptors strictly in list order, roles in [`Role`]
//! order, threading a [`StackCursor`] through the loop so every new adjustment
//! clips onto the one created before it. The first failure stops everything;
//! what was already created stays in the document for the surrounding history
//! scope to collapse.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::applier::{apply, StackCursor};
use crate::error::{PipelineError, Result};
use crate::host::Document;
use crate::layer::LayerRef;
use crate::recipe::{AdjustmentPipeline, Role, RoleBinding};

/// Constructs created per role, in creation order.
pub type RoleConstructs = BTreeMap<Role, Vec<LayerRef>>;

/// Run every role's pipeline against its bound layer.
///
/// # Errors
/// * `InputInvalid` - a role in `pipelines` has no binding (checked before any edit)
/// * anything [`apply`] returns, from the first descriptor that fails
pub async fn run<D>(doc: &mut D, binding: &RoleBinding, pipelines: &BTreeMap<Role, AdjustmentPipeline>) -> Result<RoleConstructs>
where
    D: Document + ?Sized,
{
    let mut plan = Vec::with_capacity(pipelines.len());
    for (role, pipeline) in pipelines {
        let target = binding
            .get(*role)
            .ok_or_else(|| PipelineError::input_invalid(format!("no layer bound for role {role}")))?;
        plan.push((*role, target, pipeline));
    }

    let mut created = RoleConstructs::new();
    for (role, target, pipeline) in plan {
        info!(%role, target = %target, steps = pipeline.len(), "running role pipeline");

        let mut cursor = StackCursor::new(target.clone());
        let mut constructs = Vec::with_capacity(pipeline.layer_count());
        for (index, descriptor) in pipeline.steps().iter().enumerate() {
            let outcome = apply(doc, descriptor, cursor).await.map_err(|err| {
                debug!(%role, step = index, %descriptor, error = %err, "pipeline aborted");
                err
            })?;
            cursor = outcome.cursor;
            constructs.extend(outcome.construct);
        }

        created.insert(role, constructs);
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::AdjustmentDescriptor;
    use crate::error::ErrorKind;
    use crate::host::memory::MemoryDocument;
    use crate::host::HostOperation;
    use crate::layer::DocumentId;
    use crate::recipe::Recipe;
    use ndarray::Array3;

    fn setup() -> (MemoryDocument, RoleBinding) {
        let mut doc = MemoryDocument::new(DocumentId(1));
        let handle = doc.add_pixel_layer("Cabo", Array3::<u8>::from_elem((4, 4, 4), 120));
        let blade = doc.add_pixel_layer("Lamina", Array3::<u8>::from_elem((4, 4, 4), 180));
        let binding = RoleBinding::new(doc.find(blade).unwrap().to_ref(), doc.find(handle).unwrap().to_ref()).unwrap();
        (doc, binding)
    }

    #[tokio::test]
    async fn test_knife_recipe_creates_expected_constructs() {
        let (mut doc, binding) = setup();
        let created = run(&mut doc, &binding, &Recipe::knife().pipelines).await.unwrap();

        assert_eq!(created[&Role::Blade].len(), 3);
        assert_eq!(created[&Role::Handle].len(), 2);
        assert_eq!(doc.call_count(HostOperation::ApplyFilter), 2);
    }

    #[tokio::test]
    async fn test_each_role_stack_sits_on_its_target() {
        let (mut doc, binding) = setup();
        let created = run(&mut doc, &binding, &Recipe::knife().pipelines).await.unwrap();

        let ids = doc.stack_ids();
        for (role, target) in binding.iter() {
            let start = ids.iter().position(|id| *id == target.id).unwrap();
            for (offset, construct) in created[&role].iter().enumerate() {
                assert_eq!(ids[start + 1 + offset], construct.id, "{role} stack out of order");
                assert!(doc.find(construct.id).unwrap().clipped);
            }
        }
    }

    #[tokio::test]
    async fn test_missing_binding_fails_before_edits() {
        let (mut doc, binding) = setup();
        let blade_only = RoleBinding::from_pairs([(Role::Blade, binding.get(Role::Blade).unwrap().clone())]).unwrap();

        let err = run(&mut doc, &blade_only, &Recipe::knife().pipelines).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InputInvalid);
        assert_eq!(doc.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_steps_and_roles() {
        let (mut doc, binding) = setup();
        // Second adjustment layer of the blade fails
        doc.fail_on_call(HostOperation::CreateAdjustmentLayer, 2);

        let err = run(&mut doc, &binding, &Recipe::knife().pipelines).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConstructCreationFailed);
        assert_eq!(doc.call_count(HostOperation::CreateAdjustmentLayer), 2);
        assert_eq!(doc.call_count(HostOperation::ApplyFilter), 0);
        // The first blade construct stays; nothing was made for the handle
        assert_eq!(doc.stack_ids().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_pipeline_creates_nothing() {
        let (mut doc, binding) = setup();
        let pipelines = BTreeMap::from([
            (Role::Blade, AdjustmentPipeline::default()),
            (Role::Handle, AdjustmentPipeline::new(vec![AdjustmentDescriptor::sharpen(50, 0.5, 0)])),
        ]);

        let created = run(&mut doc, &binding, &pipelines).await.unwrap();

        assert!(created[&Role::Blade].is_empty());
        assert!(created[&Role::Handle].is_empty());
        assert_eq!(doc.stack_ids().len(), 2);
    }
}
