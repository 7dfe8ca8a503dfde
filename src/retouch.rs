//! Entry point: apply the recipe to a blade and a handle layer.
//!
//! [`Retoucher::apply_pipeline`] validates its inputs without touching the
//! document, then runs every role pipeline and the grouping stage inside one
//! history suspension. Whatever happens inside, the suspension is closed
//! before the result reaches the caller.

use tracing::{info, warn};

use crate::config::RetouchConfig;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::host::{Document, Host};
use crate::layer::{LayerId, LayerRef};
use crate::pipeline::{group_and_shade, run, RoleConstructs};
use crate::recipe::{Recipe, Role, RoleBinding};
use crate::transaction::run_atomic;

/// What a successful run left in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetouchOutcome {
    /// The container holding both processed stacks.
    pub group: LayerRef,
    /// Adjustment layers created per role, bottom to top.
    pub constructs: RoleConstructs,
}

/// Applies a [`Recipe`] to bound layers of a host document.
#[derive(Debug, Clone, Default)]
pub struct Retoucher {
    config: RetouchConfig,
    recipe: Recipe,
}

impl Retoucher {
    /// Retoucher running the built-in knife recipe.
    pub fn new(config: RetouchConfig) -> Self {
        Self::with_recipe(config, Recipe::knife())
    }

    pub fn with_recipe(config: RetouchConfig, recipe: Recipe) -> Self {
        Self { config, recipe }
    }

    pub fn config(&self) -> &RetouchConfig {
        &self.config
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Apply the recipe to the blade and handle layers as one undo step.
    ///
    /// Every run adds new adjustment layers and a new group; running twice
    /// stacks twice.
    ///
    /// # Errors
    /// * `InputInvalid` - `blade == handle`, or a recipe role is unbound
    /// * `TargetInvalid` - an id does not resolve, names a group, an
    ///   adjustment layer or a layer without content, or the two layers sit
    ///   in different containers
    ///
    /// These two are raised before history is suspended and leave the
    /// document untouched. Later failures (`ConstructCreationFailed`,
    /// `GroupingFailed`, `EffectApplyFailed`, `TransactionFailed`) leave the
    /// partial edits collapsed in one history entry.
    pub async fn apply_pipeline<H: Host>(&self, host: &mut H, blade: LayerId, handle: LayerId) -> Result<RetouchOutcome> {
        let binding = resolve_binding(&*host, blade, handle).await?;
        self.recipe.check_binding(&binding)?;

        info!(
            document = %host.id(),
            blade = %blade,
            handle = %handle,
            history = %self.config.history_name,
            "applying retouch pipeline"
        );

        let recipe = self.recipe.clone();
        let group_name = self.config.group_name.clone();
        let result = run_atomic(host, &self.config.history_name, move |host| {
            Box::pin(async move {
                let constructs = run(host, &binding, &recipe.pipelines).await?;

                let mut members = Vec::new();
                for (role, base) in binding.iter() {
                    members.push(base.clone());
                    if let Some(created) = constructs.get(&role) {
                        members.extend(created.iter().cloned());
                    }
                }
                let group = group_and_shade(host, &members, &recipe.effect, group_name.as_deref()).await?;

                Ok(RetouchOutcome { group, constructs })
            })
        })
        .await;

        match &result {
            Ok(outcome) => info!(group = %outcome.group.id, "retouch pipeline finished"),
            Err(err) => warn!(kind = ?err.kind(), error = %err, "retouch pipeline failed"),
        }
        result
    }
}

async fn resolve_binding<D>(doc: &D, blade: LayerId, handle: LayerId) -> Result<RoleBinding>
where
    D: Document + ?Sized,
{
    if blade == handle {
        return Err(PipelineError::input_invalid(format!(
            "blade and handle must be different layers, both are {blade}"
        )));
    }
    let blade = resolve_target(doc, Role::Blade, blade).await?;
    let handle = resolve_target(doc, Role::Handle, handle).await?;

    // Grouping needs both stacks in one container.
    let blade_parent = parent_of(doc, &blade).await?;
    let handle_parent = parent_of(doc, &handle).await?;
    if blade_parent != handle_parent {
        return Err(PipelineError::target_invalid(format!(
            "blade {} and handle {} are in different containers ({} vs {})",
            blade.id,
            handle.id,
            container_name(blade_parent),
            container_name(handle_parent)
        )));
    }

    RoleBinding::new(blade, handle)
}

async fn parent_of<D>(doc: &D, layer: &LayerRef) -> Result<Option<LayerId>>
where
    D: Document + ?Sized,
{
    doc.parent(layer.id)
        .await
        .map_err(|e| PipelineError::from_host(ErrorKind::TargetInvalid, e))
}

fn container_name(parent: Option<LayerId>) -> String {
    parent.map_or_else(|| "top level".to_string(), |id| id.to_string())
}

async fn resolve_target<D>(doc: &D, role: Role, id: LayerId) -> Result<LayerRef>
where
    D: Document + ?Sized,
{
    let layer = doc
        .layer(id)
        .await
        .map_err(|e| PipelineError::from_host(ErrorKind::TargetInvalid, e))?
        .ok_or_else(|| PipelineError::target_invalid(format!("{role} {id} not found")))?;
    match layer.target_problem() {
        Some(problem) => Err(PipelineError::target_invalid(format!("{role}: {problem}"))),
        None => Ok(layer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryDocument;
    use crate::layer::DocumentId;
    use ndarray::Array3;

    fn knife_doc() -> (MemoryDocument, LayerId, LayerId) {
        let mut doc = MemoryDocument::new(DocumentId(5));
        let handle = doc.add_pixel_layer("Cabo", Array3::<u8>::from_elem((4, 4, 4), 90));
        let blade = doc.add_pixel_layer("Lâmina", Array3::<u8>::from_elem((4, 4, 4), 200));
        (doc, blade, handle)
    }

    #[tokio::test]
    async fn test_same_layer_is_input_invalid() {
        let (mut doc, blade, _) = knife_doc();
        let err = Retoucher::default().apply_pipeline(&mut doc, blade, blade).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputInvalid);
        assert_eq!(doc.mutation_count(), 0);
        assert_eq!(doc.suspensions_opened(), 0);
    }

    #[tokio::test]
    async fn test_unknown_layer_is_target_invalid() {
        let (mut doc, blade, _) = knife_doc();
        let err = Retoucher::default()
            .apply_pipeline(&mut doc, blade, LayerId(404))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TargetInvalid);
        assert!(err.detail().contains("handle"));
        assert_eq!(doc.suspensions_opened(), 0);
    }

    #[tokio::test]
    async fn test_group_target_is_rejected() {
        let (mut doc, blade, _) = knife_doc();
        let group = doc.add_group("Folder", vec![("x".into(), Array3::<u8>::from_elem((2, 2, 4), 255))]);
        let err = Retoucher::default()
            .apply_pipeline(&mut doc, blade, group)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TargetInvalid);
        assert!(err.detail().contains("container"));
    }

    #[tokio::test]
    async fn test_targets_in_different_containers_are_rejected() {
        let mut doc = MemoryDocument::new(DocumentId(5));
        let handle = doc.add_pixel_layer("Cabo", Array3::<u8>::from_elem((4, 4, 4), 90));
        let folder = doc.add_group("Folder", vec![("Lâmina".into(), Array3::<u8>::from_elem((4, 4, 4), 200))]);
        let blade = doc.find(folder).unwrap().children()[0].id;

        let err = Retoucher::default()
            .apply_pipeline(&mut doc, blade, handle)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TargetInvalid);
        assert!(err.detail().contains("different containers"));
        assert_eq!(doc.mutation_count(), 0);
        assert_eq!(doc.suspensions_opened(), 0);
    }

    #[tokio::test]
    async fn test_targets_sharing_a_group_are_accepted() {
        let mut doc = MemoryDocument::new(DocumentId(5));
        let folder = doc.add_group(
            "Folder",
            vec![
                ("Cabo".into(), Array3::<u8>::from_elem((4, 4, 4), 90)),
                ("Lâmina".into(), Array3::<u8>::from_elem((4, 4, 4), 200)),
            ],
        );
        let children: Vec<LayerId> = doc.find(folder).unwrap().children().iter().map(|l| l.id).collect();

        let outcome = Retoucher::default()
            .apply_pipeline(&mut doc, children[1], children[0])
            .await
            .unwrap();

        assert_eq!(doc.parent(outcome.group.id).await.unwrap(), Some(folder));
        assert_eq!(doc.history().len(), 1);
    }

    #[tokio::test]
    async fn test_success_names_history_and_group() {
        let (mut doc, blade, handle) = knife_doc();
        let config = RetouchConfig {
            history_name: "Ajustes Faca".into(),
            group_name: Some("Faca".into()),
        };

        let outcome = Retoucher::new(config).apply_pipeline(&mut doc, blade, handle).await.unwrap();

        assert_eq!(outcome.group.name, "Faca");
        assert_eq!(doc.history().len(), 1);
        assert_eq!(doc.history()[0].name, "Ajustes Faca");
        assert!(!doc.is_suspended());
    }
}
