//! The adjustment engine.
//!
//! Leaves first:
//! - **Applier** - one descriptor against one role stack (`applier.rs`)
//! - **Runner** - every role's descriptors in order (`runner.rs`)
//! - **Grouping** - merge the stacks into a shaded container (`grouping.rs`)
//!
//! None of these open or close history; [`crate::retouch::Retoucher`] wraps
//! them in one suspension via [`crate::transaction`].

pub mod applier;
pub mod grouping;
pub mod runner;

pub use applier::{apply, ApplyOutcome, StackCursor};
pub use grouping::group_and_shade;
pub use runner::{run, RoleConstructs};
