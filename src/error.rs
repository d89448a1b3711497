//! Failure taxonomy for operations the engine refuses outright.
//!
//! These are invariant guards with a user-facing message; callers surface
//! them as notices. Missing buffers and unresolvable pointer geometry are not
//! errors, they are silent no-ops expressed as `Option` at the call sites.

use thiserror::Error;

use crate::layer::LayerId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Cannot delete the last remaining layer")]
    LastLayer,

    #[error("The background layer cannot be deleted")]
    BackgroundLayer,

    #[error("The bottom layer has nothing to merge into")]
    MergeFromBottom,

    #[error("Layer \"{0}\" is locked")]
    LayerLocked(String),

    #[error("No such layer")]
    UnknownLayer(LayerId),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
