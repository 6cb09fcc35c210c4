//! Engine-level configuration errors.
//!
//! A `ConfigurationError` means the *rule set* supplied by the authoring
//! collaborator is malformed, not that a player did something illegal. The
//! offending registration is rejected (or the offending resolution aborted)
//! and the rest of the game continues where possible.

use crate::ids::ObjectId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// A continuous effect declared a layer outside 1..=9.
    #[error("continuous effect from {source_id:?} declares invalid layer {declared}")]
    InvalidLayer { source_id: ObjectId, declared: u8 },

    /// A continuous effect's declared layer does not match what its
    /// modification actually does.
    #[error(
        "continuous effect from {source_id:?} declares layer {declared} but its modification belongs to layer {expected}"
    )]
    LayerMismatch {
        source_id: ObjectId,
        declared: u8,
        expected: u8,
    },

    /// A replacement chain exceeded the configured depth cap. This signals a
    /// malformed rule set (mutually re-triggering replacements), not a legal
    /// game state.
    #[error("replacement chain exceeded depth cap {cap}")]
    ReplacementDepthExceeded { cap: u32 },

    /// The state-based action loop failed to reach a fixpoint within the
    /// configured iteration cap.
    #[error("state-based actions did not reach a fixpoint within {cap} iterations")]
    StateBasedActionLoop { cap: u32 },

    /// Trigger cascades (triggers enqueueing triggers) exceeded the configured
    /// re-entrancy depth.
    #[error("trigger cascade exceeded depth cap {cap}")]
    TriggerCascadeOverflow { cap: u32 },
}
