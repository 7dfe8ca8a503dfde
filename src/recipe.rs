//! Roles, bindings and the static adjustment recipe.
//!
//! A [`Recipe`] is plain configuration data: one ordered
//! [`AdjustmentPipeline`] per [`Role`] plus the group effect. The engine in
//! [`crate::pipeline`] executes any recipe; [`Recipe::knife`] is the one the
//! product ships.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::adjustment::{AdjustmentDescriptor, HueChannel};
use crate::effect::EffectSpec;
use crate::error::{PipelineError, Result};
use crate::layer::LayerRef;

/// Part of the subject a layer depicts. Ordering is the run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Blade,
    Handle,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Blade, Role::Handle];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blade => "blade",
            Self::Handle => "handle",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered descriptors for one role. Order is meaningful and never changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjustmentPipeline(Vec<AdjustmentDescriptor>);

impl AdjustmentPipeline {
    pub fn new(steps: Vec<AdjustmentDescriptor>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[AdjustmentDescriptor] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of adjustment layers this pipeline will create.
    pub fn layer_count(&self) -> usize {
        self.0.iter().filter(|d| d.creates_layer()).count()
    }
}

impl FromIterator<AdjustmentDescriptor> for AdjustmentPipeline {
    fn from_iter<I: IntoIterator<Item = AdjustmentDescriptor>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Which layer plays which role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBinding {
    layers: BTreeMap<Role, LayerRef>,
}

impl RoleBinding {
    /// Bind the two knife parts. Fails with `InputInvalid` if both roles
    /// point at the same layer.
    pub fn new(blade: LayerRef, handle: LayerRef) -> Result<Self> {
        Self::from_pairs([(Role::Blade, blade), (Role::Handle, handle)])
    }

    /// Build from arbitrary pairs; layers must be pairwise distinct and each
    /// role bound once.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Role, LayerRef)>) -> Result<Self> {
        let mut layers: BTreeMap<Role, LayerRef> = BTreeMap::new();
        for (role, layer) in pairs {
            if let Some((other, _)) = layers.iter().find(|(_, l)| l.id == layer.id) {
                return Err(PipelineError::input_invalid(format!(
                    "{role} and {other} are both bound to {}",
                    layer.id
                )));
            }
            if layers.insert(role, layer).is_some() {
                return Err(PipelineError::input_invalid(format!(
                    "{role} is bound more than once"
                )));
            }
        }
        Ok(Self { layers })
    }

    pub fn get(&self, role: Role) -> Option<&LayerRef> {
        self.layers.get(&role)
    }

    /// Bindings in run order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &LayerRef)> {
        self.layers.iter().map(|(r, l)| (*r, l))
    }
}

/// Static adjustment configuration: per-role pipelines plus the group effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub pipelines: BTreeMap<Role, AdjustmentPipeline>,
    pub effect: EffectSpec,
}

impl Recipe {
    /// The knife recipe: a neutral, crisp steel blade and a handle with its
    /// blue cast removed, grouped under a soft drop shadow.
    pub fn knife() -> Self {
        let blade = AdjustmentPipeline::new(vec![
            AdjustmentDescriptor::desaturate(-100),
            AdjustmentDescriptor::curve_map([(137, 153), (71, 64)]),
            AdjustmentDescriptor::brightness_contrast(8, 2),
            AdjustmentDescriptor::noise_reduction(1, 10),
            AdjustmentDescriptor::sharpen(100, 1.0, 5),
        ]);
        let handle = AdjustmentPipeline::new(vec![
            AdjustmentDescriptor::curve_map([(75, 58), (135, 123)]),
            AdjustmentDescriptor::channel_saturation(HueChannel::Blues, -100),
        ]);

        Self {
            pipelines: BTreeMap::from([(Role::Blade, blade), (Role::Handle, handle)]),
            effect: EffectSpec::knife_shadow(),
        }
    }

    pub fn pipeline(&self, role: Role) -> Option<&AdjustmentPipeline> {
        self.pipelines.get(&role)
    }

    /// Roles the recipe needs a binding for, in run order.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.pipelines.keys().copied()
    }

    /// Fail with `InputInvalid` unless every recipe role is bound.
    pub fn check_binding(&self, binding: &RoleBinding) -> Result<()> {
        match self.roles().find(|r| binding.get(*r).is_none()) {
            Some(role) => Err(PipelineError::input_invalid(format!(
                "no layer bound for role {role}"
            ))),
            None => Ok(()),
        }
    }
}

impl Default for Recipe {
    fn default() -> Self {
        Self::knife()
    }
}
