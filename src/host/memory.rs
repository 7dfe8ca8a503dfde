//! In-memory host document.
//!
//! A complete [`Document`] + [`HistoryControl`] implementation that keeps the
//! layer tree in process. Pixel layers hold `ndarray` rasters and the two
//! pixel filters really run on them; adjustment layers and effects are stored
//! as parameters and not rendered.
//!
//! ## Layer model
//! - Layers live in containers ordered bottom to top; groups nest.
//! - A new adjustment layer lands directly above the active layer, as in an
//!   interactive editor, and becomes active.
//! - Grouping requires the selected layers to share one parent. The group
//!   takes the slot of the topmost selected layer.
//!
//! ## History
//! Outside a suspension every mutation is its own history entry. While a
//! suspension is open mutations are collected and committed as one named
//! entry on resume. Suspensions do not nest.
//!
//! ## Fault injection
//! [`MemoryDocument::fail_on`] and [`MemoryDocument::fail_on_call`] make
//! chosen host calls fail, to exercise error paths.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::raster::{dust_and_scratches_u8, has_content, unsharp_mask_u8, Raster};
use super::{Document, HistoryControl, HostError, HostOperation, HostResult, SuspensionId};
use crate::adjustment::{AdjustmentLayer, FilterSpec};
use crate::effect::EffectSpec;
use crate::layer::{DocumentId, LayerId, LayerKind, LayerRef};

// ============================================================================
// Layers
// ============================================================================

/// What a stored layer holds.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    Pixels(Raster),
    Adjustment(AdjustmentLayer),
    Group(Vec<Layer>),
}

/// One layer of a [`MemoryDocument`].
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub content: LayerContent,
    /// Clip to the layer below.
    pub clipped: bool,
    pub effect: Option<EffectSpec>,
}

impl Layer {
    fn new(id: LayerId, name: impl Into<String>, content: LayerContent) -> Self {
        Self {
            id,
            name: name.into(),
            content,
            clipped: false,
            effect: None,
        }
    }

    pub fn raster(&self) -> Option<&Raster> {
        match &self.content {
            LayerContent::Pixels(raster) => Some(raster),
            _ => None,
        }
    }

    pub fn adjustment(&self) -> Option<&AdjustmentLayer> {
        match &self.content {
            LayerContent::Adjustment(adjustment) => Some(adjustment),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Layer] {
        match &self.content {
            LayerContent::Group(children) => children.as_slice(),
            _ => &[],
        }
    }

    fn has_bounds(&self) -> bool {
        match &self.content {
            LayerContent::Pixels(raster) => has_content(raster.view()),
            LayerContent::Adjustment(_) => false,
            LayerContent::Group(children) => children.iter().any(Layer::has_bounds),
        }
    }

    /// Snapshot as handed to the pipeline.
    pub fn to_ref(&self) -> LayerRef {
        let kind = match self.content {
            LayerContent::Pixels(_) => LayerKind::Pixel,
            LayerContent::Adjustment(_) => LayerKind::Adjustment,
            LayerContent::Group(_) => LayerKind::Group,
        };
        LayerRef {
            id: self.id,
            name: self.name.clone(),
            kind,
            is_container: kind == LayerKind::Group,
            has_bounds: self.has_bounds(),
        }
    }
}

fn find(layers: &[Layer], id: LayerId) -> Option<&Layer> {
    for layer in layers {
        if layer.id == id {
            return Some(layer);
        }
        if let Some(found) = find(layer.children(), id) {
            return Some(found);
        }
    }
    None
}

/// `Some(parent)` if `id` is in the tree, `parent` being `None` at the top.
fn parent_of(layers: &[Layer], id: LayerId, parent: Option<LayerId>) -> Option<Option<LayerId>> {
    for layer in layers {
        if layer.id == id {
            return Some(parent);
        }
        if let Some(found) = parent_of(layer.children(), id, Some(layer.id)) {
            return Some(found);
        }
    }
    None
}

fn find_mut(layers: &mut [Layer], id: LayerId) -> Option<&mut Layer> {
    for layer in layers.iter_mut() {
        if layer.id == id {
            return Some(layer);
        }
        if let LayerContent::Group(children) = &mut layer.content {
            if let Some(found) = find_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn take(layers: &mut Vec<Layer>, id: LayerId) -> Option<Layer> {
    if let Some(pos) = layers.iter().position(|l| l.id == id) {
        return Some(layers.remove(pos));
    }
    for layer in layers.iter_mut() {
        if let LayerContent::Group(children) = &mut layer.content {
            if let Some(found) = take(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Insert `layer` directly above `anchor`; hands the layer back if the anchor
/// is nowhere in the tree.
fn insert_above(layers: &mut Vec<Layer>, anchor: LayerId, layer: Layer) -> Result<(), Layer> {
    if let Some(pos) = layers.iter().position(|l| l.id == anchor) {
        layers.insert(pos + 1, layer);
        return Ok(());
    }
    let mut layer = layer;
    for candidate in layers.iter_mut() {
        if let LayerContent::Group(children) = &mut candidate.content {
            match insert_above(children, anchor, layer) {
                Ok(()) => return Ok(()),
                Err(back) => layer = back,
            }
        }
    }
    Err(layer)
}

/// Move the `ids` layers into a new group inside the container that holds all
/// of them. Returns false if no single container does.
fn group_in(layers: &mut Vec<Layer>, ids: &[LayerId], group_id: LayerId, name: &str) -> bool {
    if ids.iter().all(|id| layers.iter().any(|l| l.id == *id)) {
        let top = layers
            .iter()
            .rposition(|l| ids.contains(&l.id))
            .unwrap_or(0);
        let mut members = Vec::with_capacity(ids.len());
        let mut kept = Vec::with_capacity(layers.len());
        for layer in layers.drain(..) {
            if ids.contains(&layer.id) {
                members.push(layer);
            } else {
                kept.push(layer);
            }
        }
        let slot = top + 1 - members.len();
        kept.insert(slot, Layer::new(group_id, name, LayerContent::Group(members)));
        *layers = kept;
        return true;
    }
    layers.iter_mut().any(|layer| match &mut layer.content {
        LayerContent::Group(children) => group_in(children, ids, group_id, name),
        _ => false,
    })
}

// ============================================================================
// History
// ============================================================================

/// One undoable step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub name: String,
    /// Number of mutations collapsed into this entry.
    pub steps: usize,
}

#[derive(Debug)]
struct OpenSuspension {
    id: SuspensionId,
    name: String,
    steps: usize,
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    operation: HostOperation,
    call: Option<usize>,
}

// ============================================================================
// Document
// ============================================================================

/// In-memory layered document.
#[derive(Debug)]
pub struct MemoryDocument {
    id: DocumentId,
    layers: Vec<Layer>,
    next_layer: u32,
    active: Option<LayerId>,
    selection: Vec<LayerId>,
    history: Vec<HistoryEntry>,
    suspension: Option<OpenSuspension>,
    next_suspension: u64,
    suspensions_opened: usize,
    mutations: usize,
    faults: Vec<Fault>,
    calls: HashMap<HostOperation, usize>,
}

impl MemoryDocument {
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            layers: Vec::new(),
            next_layer: 1,
            active: None,
            selection: Vec::new(),
            history: Vec::new(),
            suspension: None,
            next_suspension: 1,
            suspensions_opened: 0,
            mutations: 0,
            faults: Vec::new(),
            calls: HashMap::new(),
        }
    }

    fn allocate_id(&mut self) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        id
    }

    // ------------------------------------------------------------------------
    // Setup (not recorded in history)
    // ------------------------------------------------------------------------

    /// Add a pixel layer on top of the stack and make it active.
    pub fn add_pixel_layer(&mut self, name: impl Into<String>, raster: Raster) -> LayerId {
        let id = self.allocate_id();
        self.layers.push(Layer::new(id, name, LayerContent::Pixels(raster)));
        self.active = Some(id);
        id
    }

    /// Add a group holding the given pixel layers (bottom to top).
    pub fn add_group(&mut self, name: impl Into<String>, members: Vec<(String, Raster)>) -> LayerId {
        let children = members
            .into_iter()
            .map(|(child_name, raster)| {
                let id = self.allocate_id();
                Layer::new(id, child_name, LayerContent::Pixels(raster))
            })
            .collect();
        let id = self.allocate_id();
        self.layers.push(Layer::new(id, name, LayerContent::Group(children)));
        id
    }

    /// Make a layer active; new adjustment layers land above it.
    pub fn set_active(&mut self, id: LayerId) {
        self.active = Some(id);
    }

    /// Make chosen calls fail every time.
    pub fn fail_on(&mut self, operation: HostOperation) {
        self.faults.push(Fault {
            operation,
            call: None,
        });
    }

    /// Make only the `call`-th (1-based) call of `operation` fail.
    pub fn fail_on_call(&mut self, operation: HostOperation, call: usize) {
        self.faults.push(Fault {
            operation,
            call: Some(call),
        });
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Top-level layers, bottom to top.
    pub fn stack(&self) -> &[Layer] {
        &self.layers
    }

    /// Top-level ids, bottom to top.
    pub fn stack_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    pub fn find(&self, id: LayerId) -> Option<&Layer> {
        find(&self.layers, id)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn selection(&self) -> &[LayerId] {
        &self.selection
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    /// Number of history suspensions ever opened.
    pub fn suspensions_opened(&self) -> usize {
        self.suspensions_opened
    }

    /// Number of document mutations so far, suspended or not.
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    /// How often a host call was made, including failed calls.
    pub fn call_count(&self, operation: HostOperation) -> usize {
        self.calls.get(&operation).copied().unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Recorded edits
    // ------------------------------------------------------------------------

    /// Delete a layer, e.g. to simulate a concurrent edit.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let removed = take(&mut self.layers, id)?;
        self.selection.retain(|s| *s != id);
        if self.active == Some(id) {
            self.active = None;
        }
        self.record(format!("Delete {}", removed.name));
        Some(removed)
    }

    fn record(&mut self, step: String) {
        self.mutations += 1;
        match &mut self.suspension {
            Some(open) => open.steps += 1,
            None => self.history.push(HistoryEntry {
                name: step,
                steps: 1,
            }),
        }
    }

    fn check(&mut self, operation: HostOperation) -> HostResult<()> {
        let count = self.calls.entry(operation).or_insert(0);
        *count += 1;
        let count = *count;
        let hit = self
            .faults
            .iter()
            .any(|f| f.operation == operation && f.call.map_or(true, |c| c == count));
        if hit {
            debug!(operation = %operation, call = count, "injected host failure");
            return Err(HostError::new(operation, "injected failure"));
        }
        Ok(())
    }

    fn layer_mut(&mut self, operation: HostOperation, id: LayerId) -> HostResult<&mut Layer> {
        find_mut(&mut self.layers, id).ok_or_else(|| HostError::unknown_layer(operation, id))
    }
}

/// Reject parameter values an editor would refuse.
fn validate_adjustment(adjustment: &AdjustmentLayer) -> Result<(), String> {
    match adjustment {
        AdjustmentLayer::HueSaturation { saturation, .. } => {
            if !(-100..=100).contains(saturation) {
                return Err(format!("saturation {saturation} outside -100..100"));
            }
        }
        AdjustmentLayer::Curves { points } => {
            for (i, p) in points.iter().enumerate() {
                if points[..i].iter().any(|q| q.input == p.input) {
                    return Err(format!("duplicate curve input {}", p.input));
                }
            }
        }
        AdjustmentLayer::BrightnessContrast {
            brightness,
            contrast,
        } => {
            if !(-150..=150).contains(brightness) {
                return Err(format!("brightness {brightness} outside -150..150"));
            }
            if !(-50..=100).contains(contrast) {
                return Err(format!("contrast {contrast} outside -50..100"));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Document for MemoryDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    async fn layer(&self, id: LayerId) -> HostResult<Option<LayerRef>> {
        Ok(self.find(id).map(Layer::to_ref))
    }

    async fn parent(&self, id: LayerId) -> HostResult<Option<LayerId>> {
        Ok(parent_of(&self.layers, id, None).flatten())
    }

    async fn create_adjustment_layer(&mut self, adjustment: &AdjustmentLayer) -> HostResult<LayerRef> {
        let op = HostOperation::CreateAdjustmentLayer;
        self.check(op)?;
        validate_adjustment(adjustment).map_err(|msg| HostError::new(op, msg))?;

        let id = self.allocate_id();
        let layer = Layer::new(id, adjustment.default_name(), LayerContent::Adjustment(adjustment.clone()));
        let layer_ref = layer.to_ref();
        let placed = match self.active {
            Some(active) => insert_above(&mut self.layers, active, layer),
            None => Err(layer),
        };
        if let Err(layer) = placed {
            self.layers.push(layer);
        }
        self.active = Some(id);
        self.record(format!("New {} Layer", adjustment.default_name()));
        Ok(layer_ref)
    }

    async fn move_above(&mut self, layer: LayerId, anchor: LayerId) -> HostResult<()> {
        let op = HostOperation::MoveAbove;
        self.check(op)?;
        if layer == anchor {
            return Err(HostError::new(op, format!("cannot move {layer} above itself")));
        }
        if self.find(anchor).is_none() {
            return Err(HostError::unknown_layer(op, anchor));
        }
        let source = self.find(layer).ok_or_else(|| HostError::unknown_layer(op, layer))?;
        if find(source.children(), anchor).is_some() {
            return Err(HostError::new(op, format!("{anchor} is inside {layer}")));
        }
        let name = source.name.clone();
        let moving = take(&mut self.layers, layer).ok_or_else(|| HostError::unknown_layer(op, layer))?;
        if let Err(moving) = insert_above(&mut self.layers, anchor, moving) {
            self.layers.push(moving);
            return Err(HostError::new(op, format!("{anchor} not found after removing {layer}")));
        }
        self.record(format!("Move {name}"));
        Ok(())
    }

    async fn set_clipped(&mut self, layer: LayerId, clipped: bool) -> HostResult<()> {
        let op = HostOperation::SetClipped;
        self.check(op)?;
        let target = self.layer_mut(op, layer)?;
        target.clipped = clipped;
        let name = target.name.clone();
        self.record(format!("Clipping Mask {name}"));
        Ok(())
    }

    async fn apply_filter(&mut self, layer: LayerId, filter: &FilterSpec) -> HostResult<()> {
        let op = HostOperation::ApplyFilter;
        self.check(op)?;
        let target = self.layer_mut(op, layer)?;
        let LayerContent::Pixels(raster) = &mut target.content else {
            return Err(HostError::new(op, format!("{layer} is not a pixel layer")));
        };
        *raster = match *filter {
            FilterSpec::DustAndScratches { radius, threshold } => {
                if radius == 0 {
                    return Err(HostError::new(op, "radius must be positive"));
                }
                dust_and_scratches_u8(raster.view(), radius, threshold)
            }
            FilterSpec::UnsharpMask {
                amount,
                radius,
                threshold,
            } => {
                if radius <= 0.0 {
                    return Err(HostError::new(op, "radius must be positive"));
                }
                unsharp_mask_u8(raster.view(), amount, radius, threshold)
            }
        };
        self.record(filter.name().to_string());
        Ok(())
    }

    async fn select_layers(&mut self, ids: &[LayerId]) -> HostResult<()> {
        let op = HostOperation::SelectLayers;
        self.check(op)?;
        if let Some(missing) = ids.iter().find(|id| self.find(**id).is_none()) {
            return Err(HostError::unknown_layer(op, *missing));
        }
        self.selection = ids.to_vec();
        Ok(())
    }

    async fn group_selection(&mut self) -> HostResult<LayerId> {
        let op = HostOperation::GroupSelection;
        self.check(op)?;
        if self.selection.is_empty() {
            return Err(HostError::new(op, "nothing selected"));
        }
        let group_id = self.allocate_id();
        let name = format!("Group {}", group_id.0);
        let ids = self.selection.clone();
        if !group_in(&mut self.layers, &ids, group_id, &name) {
            return Err(HostError::new(op, "selected layers do not share a parent"));
        }
        self.selection = vec![group_id];
        self.active = Some(group_id);
        self.record(format!("Group Layers ({})", ids.len()));
        Ok(group_id)
    }

    async fn rename_layer(&mut self, layer: LayerId, name: &str) -> HostResult<()> {
        let op = HostOperation::RenameLayer;
        self.check(op)?;
        self.layer_mut(op, layer)?.name = name.to_string();
        self.record(format!("Rename {name}"));
        Ok(())
    }

    async fn set_layer_effects(&mut self, layer: LayerId, effect: &EffectSpec) -> HostResult<()> {
        let op = HostOperation::SetLayerEffects;
        self.check(op)?;
        effect.validate().map_err(|msg| HostError::new(op, msg))?;
        self.layer_mut(op, layer)?.effect = Some(effect.clone());
        self.record("Layer Style".to_string());
        Ok(())
    }
}

#[async_trait]
impl HistoryControl for MemoryDocument {
    async fn suspend_history(&mut self, document: DocumentId, name: &str) -> HostResult<SuspensionId> {
        let op = HostOperation::SuspendHistory;
        self.check(op)?;
        if document != self.id {
            return Err(HostError::new(op, format!("unknown {document}")));
        }
        if self.suspension.is_some() {
            return Err(HostError::new(op, "history is already suspended"));
        }
        let id = SuspensionId(self.next_suspension);
        self.next_suspension += 1;
        self.suspensions_opened += 1;
        self.suspension = Some(OpenSuspension {
            id,
            name: name.to_string(),
            steps: 0,
        });
        Ok(id)
    }

    async fn resume_history(&mut self, suspension: SuspensionId) -> HostResult<()> {
        let op = HostOperation::ResumeHistory;
        self.check(op)?;
        match self.suspension.take() {
            Some(open) if open.id == suspension => {
                if open.steps > 0 {
                    self.history.push(HistoryEntry {
                        name: open.name,
                        steps: open.steps,
                    });
                }
                Ok(())
            }
            other => {
                self.suspension = other;
                Err(HostError::new(op, format!("suspension {} is not open", suspension.0)))
            }
        }
    }
}
