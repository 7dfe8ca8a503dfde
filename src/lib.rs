//! Knife Retouch
//!
//! Non-destructive adjustment pipeline for layered documents. Given a
//! "blade" and a "handle" layer, it stacks clipped adjustment layers on each,
//! runs two pixel filters on the blade, merges both stacks into one group and
//! gives that group a drop shadow, all as a single undo step.
//!
//! ## Layout
//! - [`adjustment`] - descriptors (what to do) and host operations (how to ask)
//! - [`recipe`] - roles, bindings and the static per-role pipelines
//! - [`pipeline`] - applier, runner and grouping stage
//! - [`transaction`] - scoped acquire/release and the history suspension
//! - [`retouch`] - [`Retoucher::apply_pipeline`], the single entry point
//! - [`host`] - host traits plus an in-memory, raster-backed host
//!
//! ## Example
//! ```no_run
//! # async fn demo() -> Result<(), knife_retouch::PipelineError> {
//! use knife_retouch::host::memory::MemoryDocument;
//! use knife_retouch::{DocumentId, RetouchConfig, Retoucher};
//! use ndarray::Array3;
//!
//! let mut doc = MemoryDocument::new(DocumentId(1));
//! let handle = doc.add_pixel_layer("Handle", Array3::<u8>::from_elem((8, 8, 4), 120));
//! let blade = doc.add_pixel_layer("Blade", Array3::<u8>::from_elem((8, 8, 4), 200));
//!
//! let outcome = Retoucher::new(RetouchConfig::default())
//!     .apply_pipeline(&mut doc, blade, handle)
//!     .await?;
//! println!("grouped into {}", outcome.group);
//! # Ok(())
//! # }
//! ```

pub mod adjustment;
pub mod config;
pub mod effect;
pub mod error;
pub mod host;
pub mod layer;
pub mod pipeline;
pub mod recipe;
pub mod retouch;
pub mod transaction;

pub use adjustment::{AdjustmentDescriptor, AdjustmentKind, CurvePoint, HueChannel};
pub use config::{ConfigError, RetouchConfig};
pub use effect::{BlendMode, EffectSpec, RgbColor};
pub use error::{ErrorKind, PipelineError, Result};
pub use host::{Document, HistoryControl, Host, HostError, HostOperation, SuspensionId};
pub use layer::{DocumentId, LayerId, LayerKind, LayerRef};
pub use recipe::{AdjustmentPipeline, Recipe, Role, RoleBinding};
pub use retouch::{RetouchOutcome, Retoucher};
