//! Error types for the retouch pipeline.
//!
//! Every failure the engine can surface carries a distinguishable kind and a
//! human-readable detail string. Host-side failures arrive as [`HostError`]
//! and are mapped onto the [`PipelineError`] kind of the stage that hit them.

use thiserror::Error;

use crate::host::HostError;

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while running the retouch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Missing or conflicting caller input; raised before any mutation.
    #[error("Invalid input: {0}")]
    InputInvalid(String),

    /// A bound layer is missing or cannot be used as a target.
    #[error("Invalid target: {0}")]
    TargetInvalid(String),

    /// The host could not create, place or run an adjustment.
    #[error("Adjustment could not be created: {0}")]
    ConstructCreationFailed(String),

    /// Selecting or merging layers into a container failed.
    #[error("Grouping failed: {0}")]
    GroupingFailed(String),

    /// The container effect could not be attached.
    #[error("Effect could not be applied: {0}")]
    EffectApplyFailed(String),

    /// Suspending or resuming history failed.
    #[error("History transaction failed: {0}")]
    TransactionFailed(String),
}

/// Fieldless discriminant of [`PipelineError`], handy for matching in callers
/// and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputInvalid,
    TargetInvalid,
    ConstructCreationFailed,
    GroupingFailed,
    EffectApplyFailed,
    TransactionFailed,
}

impl PipelineError {
    pub fn input_invalid(msg: impl Into<String>) -> Self {
        Self::InputInvalid(msg.into())
    }

    pub fn target_invalid(msg: impl Into<String>) -> Self {
        Self::TargetInvalid(msg.into())
    }

    pub fn construct_failed(msg: impl Into<String>) -> Self {
        Self::ConstructCreationFailed(msg.into())
    }

    pub fn grouping_failed(msg: impl Into<String>) -> Self {
        Self::GroupingFailed(msg.into())
    }

    pub fn effect_failed(msg: impl Into<String>) -> Self {
        Self::EffectApplyFailed(msg.into())
    }

    pub fn transaction_failed(msg: impl Into<String>) -> Self {
        Self::TransactionFailed(msg.into())
    }

    /// The kind of this error, without its detail.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputInvalid(_) => ErrorKind::InputInvalid,
            Self::TargetInvalid(_) => ErrorKind::TargetInvalid,
            Self::ConstructCreationFailed(_) => ErrorKind::ConstructCreationFailed,
            Self::GroupingFailed(_) => ErrorKind::GroupingFailed,
            Self::EffectApplyFailed(_) => ErrorKind::EffectApplyFailed,
            Self::TransactionFailed(_) => ErrorKind::TransactionFailed,
        }
    }

    /// The human-readable detail string.
    pub fn detail(&self) -> &str {
        match self {
            Self::InputInvalid(d)
            | Self::TargetInvalid(d)
            | Self::ConstructCreationFailed(d)
            | Self::GroupingFailed(d)
            | Self::EffectApplyFailed(d)
            | Self::TransactionFailed(d) => d,
        }
    }

    /// Wrap a host failure under the given kind, keeping the host message.
    pub(crate) fn from_host(kind: ErrorKind, err: HostError) -> Self {
        let detail = err.to_string();
        match kind {
            ErrorKind::InputInvalid => Self::InputInvalid(detail),
            ErrorKind::TargetInvalid => Self::TargetInvalid(detail),
            ErrorKind::ConstructCreationFailed => Self::ConstructCreationFailed(detail),
            ErrorKind::GroupingFailed => Self::GroupingFailed(detail),
            ErrorKind::EffectApplyFailed => Self::EffectApplyFailed(detail),
            ErrorKind::TransactionFailed => Self::TransactionFailed(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostOperation;

    #[test]
    fn test_kind_and_detail() {
        let err = PipelineError::grouping_failed("only one layer selected");
        assert_eq!(err.kind(), ErrorKind::GroupingFailed);
        assert_eq!(err.detail(), "only one layer selected");
        assert_eq!(err.to_string(), "Grouping failed: only one layer selected");
    }

    #[test]
    fn test_from_host_keeps_message() {
        let host = HostError::new(HostOperation::SetLayerEffects, "layer 9 is locked");
        let err = PipelineError::from_host(ErrorKind::EffectApplyFailed, host);
        assert_eq!(err.kind(), ErrorKind::EffectApplyFailed);
        assert!(err.detail().contains("layer 9 is locked"));
        assert!(err.detail().contains("set_layer_effects"));
    }
}
