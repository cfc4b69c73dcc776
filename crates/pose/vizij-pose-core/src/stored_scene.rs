//! Stored scene and pose-asset JSON.
//!
//! The stored shape is the serde form of [`Scene`] and [`Action`]. Parsing
//! validates what serde can't:
//! - key frames are finite and sorted within each curve,
//! - object ids are unique and the active object exists,
//! - frame remaps have a finite, non-zero scale.
//!
//! Curve paths are checked during deserialization.

use hashbrown::HashSet;

use crate::curve::Action;
use crate::error::PoseError;
use crate::pose::Scene;

fn scene_error(reason: impl Into<String>) -> PoseError {
    PoseError::SceneData {
        reason: reason.into(),
    }
}

pub fn parse_scene_json(s: &str) -> Result<Scene, PoseError> {
    let scene: Scene = serde_json::from_str(s).map_err(|e| scene_error(format!("parse error: {e}")))?;
    validate_scene(&scene)?;
    Ok(scene)
}

pub fn parse_action_json(s: &str) -> Result<Action, PoseError> {
    let action: Action = serde_json::from_str(s).map_err(|e| scene_error(format!("parse error: {e}")))?;
    validate_action(&action)?;
    Ok(action)
}

pub fn scene_to_json(scene: &Scene) -> Result<String, PoseError> {
    serde_json::to_string_pretty(scene).map_err(|e| scene_error(format!("serialize error: {e}")))
}

pub fn validate_scene(scene: &Scene) -> Result<(), PoseError> {
    let mut ids = HashSet::new();
    for object in &scene.objects {
        if !ids.insert(object.id) {
            return Err(scene_error(format!("duplicate object id {}", object.id.0)));
        }
        let remap = object.frame_remap;
        if !remap.scale.is_finite() || remap.scale == 0.0 || !remap.offset.is_finite() {
            return Err(scene_error(format!("invalid frame remap on '{}'", object.name)));
        }
        if let Some(action) = &object.action {
            validate_action(action)?;
        }
    }
    if let Some(active) = scene.active_object {
        if !ids.contains(&active) {
            return Err(scene_error(format!("active object {} does not exist", active.0)));
        }
    }
    Ok(())
}

pub fn validate_action(action: &Action) -> Result<(), PoseError> {
    for curve in &action.curves {
        if curve.array_index >= curve.path.property.array_len() {
            return Err(scene_error(format!(
                "array index {} out of range for {}",
                curve.array_index, curve.path
            )));
        }
        if curve.keys.iter().any(|k| !k.frame.is_finite() || !k.value.is_finite()) {
            return Err(scene_error(format!("non-finite key on {}", curve.path)));
        }
        if !curve.is_sorted() {
            return Err(scene_error(format!(
                "keys must be sorted by frame on {}[{}]",
                curve.path, curve.array_index
            )));
        }
    }
    Ok(())
}
