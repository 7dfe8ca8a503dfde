//! Layer references as seen by the pipeline.
//!
//! The host document owns every layer. The pipeline only keeps a [`LayerRef`]:
//! the id plus a snapshot of the metadata it needs to validate targets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-assigned layer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer {}", self.0)
    }
}

/// Host-assigned document identifier, used to key history suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u32);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document {}", self.0)
    }
}

/// What a layer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Raster or shape content.
    Pixel,
    /// A non-destructive adjustment layer.
    Adjustment,
    /// A container of other layers.
    Group,
}

/// Snapshot of a host layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRef {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub is_container: bool,
    /// Whether the layer has visible content (non-empty bounds).
    pub has_bounds: bool,
}

impl LayerRef {
    /// Why the layer cannot carry an adjustment stack, if it cannot. Targets
    /// are non-container, non-adjustment layers with visible content.
    pub fn target_problem(&self) -> Option<String> {
        if self.is_container {
            Some(format!("{} ({:?}) is a container", self.id, self.name))
        } else if self.kind == LayerKind::Adjustment {
            Some(format!("{} ({:?}) is an adjustment layer", self.id, self.name))
        } else if !self.has_bounds {
            Some(format!("{} ({:?}) has no visible content", self.id, self.name))
        } else {
            None
        }
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(kind: LayerKind, has_bounds: bool) -> LayerRef {
        LayerRef {
            id: LayerId(4),
            name: "Blade".into(),
            kind,
            is_container: kind == LayerKind::Group,
            has_bounds,
        }
    }

    #[test]
    fn test_pixel_layer_with_bounds_is_target() {
        assert_eq!(layer(LayerKind::Pixel, true).target_problem(), None);
    }

    #[test]
    fn test_group_is_not_target() {
        let problem = layer(LayerKind::Group, true).target_problem().unwrap();
        assert!(problem.contains("container"));
    }

    #[test]
    fn test_empty_layer_is_not_target() {
        let problem = layer(LayerKind::Pixel, false).target_problem().unwrap();
        assert!(problem.contains("no visible content"));
    }

    #[test]
    fn test_adjustment_is_not_target() {
        let problem = layer(LayerKind::Adjustment, true).target_problem().unwrap();
        assert!(problem.contains("adjustment layer"));
    }
}
