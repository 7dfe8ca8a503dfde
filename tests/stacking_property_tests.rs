//! Property-based tests for adjustment stacking
//!
//! For arbitrary pipelines of valid descriptors:
//! 1. N layer-creating descriptors produce N clipped layers, each directly
//!    above the previous one, in descriptor order
//! 2. A failure at the k-th construct stops the run, and the partial work
//!    still ends up in one closed history entry

use std::collections::BTreeMap;

use futures::executor::block_on;
use knife_retouch::host::memory::MemoryDocument;
use knife_retouch::{
    AdjustmentDescriptor, AdjustmentPipeline, DocumentId, EffectSpec, ErrorKind, HostOperation, HueChannel, LayerId,
    Recipe, Retoucher, RetouchConfig, Role,
};
use ndarray::Array3;
use proptest::prelude::*;

fn channel_strategy() -> impl Strategy<Value = HueChannel> {
    prop_oneof![
        Just(HueChannel::Master),
        Just(HueChannel::Reds),
        Just(HueChannel::Yellows),
        Just(HueChannel::Greens),
        Just(HueChannel::Cyans),
        Just(HueChannel::Blues),
        Just(HueChannel::Magentas),
    ]
}

/// Descriptors the in-memory host accepts.
fn descriptor_strategy() -> impl Strategy<Value = AdjustmentDescriptor> {
    prop_oneof![
        (-100i32..=100).prop_map(AdjustmentDescriptor::desaturate),
        prop::collection::btree_map(any::<u8>(), any::<u8>(), 0..5).prop_map(AdjustmentDescriptor::curve_map),
        (-150i32..=150, -50i32..=100).prop_map(|(b, c)| AdjustmentDescriptor::brightness_contrast(b, c)),
        (channel_strategy(), -100i32..=100).prop_map(|(ch, s)| AdjustmentDescriptor::channel_saturation(ch, s)),
        (1u32..=3, any::<u8>()).prop_map(|(r, t)| AdjustmentDescriptor::noise_reduction(r, t)),
        (0u32..=200, 0.5f32..3.0, any::<u8>()).prop_map(|(a, r, t)| AdjustmentDescriptor::sharpen(a, r, t)),
    ]
}

fn blade_only_recipe(steps: Vec<AdjustmentDescriptor>) -> Recipe {
    Recipe {
        pipelines: BTreeMap::from([
            (Role::Blade, AdjustmentPipeline::new(steps)),
            (Role::Handle, AdjustmentPipeline::default()),
        ]),
        effect: EffectSpec::knife_shadow(),
    }
}

fn document() -> (MemoryDocument, LayerId, LayerId) {
    let mut doc = MemoryDocument::new(DocumentId(1));
    let handle = doc.add_pixel_layer("Handle", Array3::<u8>::from_elem((6, 6, 4), 80));
    let blade = doc.add_pixel_layer("Blade", Array3::<u8>::from_elem((6, 6, 4), 160));
    (doc, blade, handle)
}

/// Property: every layer-creating descriptor yields one clipped layer stacked
/// directly on the one before it.
#[test]
fn prop_constructs_stack_in_order() {
    proptest!(|(steps in prop::collection::vec(descriptor_strategy(), 0..12))| {
        let (mut doc, blade, handle) = document();
        let layer_steps = steps.iter().filter(|d| d.creates_layer()).count();
        let filter_steps = steps.len() - layer_steps;

        let retoucher = Retoucher::with_recipe(RetouchConfig::default(), blade_only_recipe(steps));
        let outcome = block_on(retoucher.apply_pipeline(&mut doc, blade, handle)).unwrap();

        let created = &outcome.constructs[&Role::Blade];
        prop_assert_eq!(created.len(), layer_steps);
        prop_assert_eq!(doc.call_count(HostOperation::ApplyFilter), filter_steps);

        let members: Vec<LayerId> = doc.find(outcome.group.id).unwrap().children().iter().map(|l| l.id).collect();
        let blade_pos = members.iter().position(|id| *id == blade).unwrap();
        for (offset, construct) in created.iter().enumerate() {
            prop_assert_eq!(members[blade_pos + 1 + offset], construct.id);
            prop_assert!(doc.find(construct.id).unwrap().clipped);
        }
        prop_assert_eq!(doc.history().len(), 1);
        prop_assert!(!doc.is_suspended());
    });
}

/// Property: a failing k-th construct aborts the run with nothing created
/// after it, and history is resumed exactly once.
#[test]
fn prop_failure_aborts_and_closes_history() {
    proptest!(|(
        steps in prop::collection::vec(descriptor_strategy(), 1..12),
        pick in any::<prop::sample::Index>()
    )| {
        let layer_steps = steps.iter().filter(|d| d.creates_layer()).count();
        prop_assume!(layer_steps > 0);
        let k = pick.index(layer_steps) + 1;

        let (mut doc, blade, handle) = document();
        doc.fail_on_call(HostOperation::CreateAdjustmentLayer, k);

        let retoucher = Retoucher::with_recipe(RetouchConfig::default(), blade_only_recipe(steps));
        let err = block_on(retoucher.apply_pipeline(&mut doc, blade, handle)).unwrap_err();

        prop_assert_eq!(err.kind(), ErrorKind::ConstructCreationFailed);
        prop_assert_eq!(doc.call_count(HostOperation::CreateAdjustmentLayer), k);
        prop_assert_eq!(doc.call_count(HostOperation::SetClipped), k - 1);
        prop_assert_eq!(doc.call_count(HostOperation::GroupSelection), 0);
        prop_assert_eq!(doc.call_count(HostOperation::ResumeHistory), 1);
        prop_assert!(!doc.is_suspended());
        prop_assert!(doc.history().len() <= 1);
    });
}
