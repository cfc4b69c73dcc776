//! Error types for pose sessions.
//!
//! Every variant is a precondition failure or malformed input: the operation that
//! returned it has not mutated the pose. The `Display` text doubles as the short
//! status message shown to the user.
//!
//! Lifecycle bugs (restoring a released snapshot, feeding a finished session) are
//! not represented here; they panic.

/// Errors returned while starting or running pose operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PoseError {
    /// No armature object in pose mode to work on.
    #[error("Pose operations need an armature in pose mode")]
    NoPoseContext,

    /// Nothing selected that carries animation curves.
    #[error("No selected bones with animation to work on")]
    NoAnimatedBones,

    /// The selected bones' curves have no keyframes at all.
    #[error("No keyframes to slide between")]
    NoKeyframes,

    /// The pose library could not resolve the requested asset.
    #[error("Pose asset '{name}' could not be loaded")]
    AssetUnavailable { name: String },

    /// Linked (read-only) data can't be edited.
    #[error("Cannot edit linked data on '{object}'")]
    LinkedData { object: String },

    /// Another session already holds the evaluation lock on this object.
    #[error("'{object}' is already being edited by another pose session")]
    ObjectBusy { object: String },

    /// Curve path did not follow the `pose.bones["..."]` grammar.
    #[error("Invalid curve path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Stored scene data failed to parse or validate.
    #[error("Scene data error: {reason}")]
    SceneData { reason: String },
}

impl PoseError {
    /// Short user-facing status line for this failure.
    pub fn status_message(&self) -> String {
        self.to_string()
    }
}
