//! Auto-keying collaborator.

use log::{trace, warn};

use crate::curve::{Action, FCurve};
use crate::keyframe_index::FRAME_THRESHOLD;
use crate::path::CurvePath;
use crate::pose::PoseObject;

/// Writes keyframes for confirmed pose edits.
pub trait Keyframer {
    /// Scene-level auto-key policy.
    fn auto_key_enabled(&self) -> bool;

    /// Key the current value of `path[array_index]` at `scene_frame`. Returns
    /// false when nothing was written. Repeated calls at the same frame must
    /// leave a single key.
    fn insert_keyframe(
        &mut self,
        object: &mut PoseObject,
        path: &CurvePath,
        array_index: usize,
        scene_frame: f32,
    ) -> bool;
}

/// Keys straight into the object's action, creating the action and curves on demand.
#[derive(Clone, Debug)]
pub struct ActionKeyframer {
    pub enabled: bool,
    /// Keys closer than this to the keyed frame are replaced.
    pub frame_threshold: f32,
}

impl ActionKeyframer {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            frame_threshold: FRAME_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, frame_threshold: f32) -> Self {
        self.frame_threshold = frame_threshold;
        self
    }
}

impl Default for ActionKeyframer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Keyframer for ActionKeyframer {
    fn auto_key_enabled(&self) -> bool {
        self.enabled
    }

    fn insert_keyframe(
        &mut self,
        object: &mut PoseObject,
        path: &CurvePath,
        array_index: usize,
        scene_frame: f32,
    ) -> bool {
        let Some(value) = object
            .pose
            .bone(&path.bone)
            .and_then(|b| b.channel_value(&path.property, array_index))
        else {
            return false;
        };
        let frame = object.frame_remap.to_action(scene_frame);
        let default_name = format!("{}Action", object.name);
        let action = object.action.get_or_insert_with(|| Action::new(default_name));
        if action.linked {
            warn!("action '{}' is linked; not keying {path}", action.name);
            return false;
        }

        if action.find_curve(path, array_index).is_none() {
            action.curves.push(FCurve::new(path.clone(), array_index));
        }
        match action.find_curve_mut(path, array_index) {
            Some(curve) => {
                curve.insert_or_replace(frame, value, self.frame_threshold);
                trace!("keyed {path}[{array_index}] = {value} at {frame}");
                true
            }
            None => false,
        }
    }
}

/// Key every `(path, index)` pair on `object` when auto-keying is on.
/// Returns the number of keys written.
pub fn auto_key_channels(
    keyframer: &mut dyn Keyframer,
    object: &mut PoseObject,
    channels: &[(CurvePath, usize)],
    scene_frame: f32,
) -> usize {
    if !keyframer.auto_key_enabled() {
        return 0;
    }
    let mut written = 0;
    for (path, index) in channels {
        if keyframer.insert_keyframe(object, path, *index, scene_frame) {
            written += 1;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ObjectId;
    use crate::path::ChannelProperty;
    use crate::pose::PoseBone;

    fn rig() -> PoseObject {
        let mut obj = PoseObject::new(ObjectId(0), "Rig");
        let mut bone = PoseBone::new("Arm");
        bone.location = [0.5, 0.0, 0.0];
        obj.pose.bones.push(bone);
        obj
    }

    #[test]
    fn keys_create_action_and_stay_idempotent() {
        let mut obj = rig();
        let mut keyer = ActionKeyframer::default();
        let path = CurvePath::new("Arm", ChannelProperty::Location);
        let channels = vec![(path.clone(), 0)];

        assert_eq!(auto_key_channels(&mut keyer, &mut obj, &channels, 12.0), 1);
        obj.pose.bones[0].location[0] = 0.75;
        assert_eq!(auto_key_channels(&mut keyer, &mut obj, &channels, 12.0), 1);

        let action = obj.action.as_ref().unwrap();
        assert_eq!(action.name, "RigAction");
        let curve = action.find_curve(&path, 0).unwrap();
        assert_eq!(curve.keys.len(), 1);
        assert_eq!(curve.keys[0].frame, 12.0);
        assert_eq!(curve.keys[0].value, 0.75);
    }

    #[test]
    fn disabled_or_linked_writes_nothing() {
        let mut obj = rig();
        let channels = vec![(CurvePath::new("Arm", ChannelProperty::Location), 0)];
        assert_eq!(auto_key_channels(&mut ActionKeyframer::new(false), &mut obj, &channels, 1.0), 0);
        assert!(obj.action.is_none());

        let mut linked = Action::new("Shared");
        linked.linked = true;
        obj.action = Some(linked);
        assert_eq!(auto_key_channels(&mut ActionKeyframer::new(true), &mut obj, &channels, 1.0), 0);
        assert!(obj.action.as_ref().unwrap().curves.is_empty());
    }

    #[test]
    fn threshold_decides_which_key_is_replaced() {
        let mut obj = rig();
        let path = CurvePath::new("Arm", ChannelProperty::Location);
        let channels = vec![(path.clone(), 0)];
        let mut keyer = ActionKeyframer::default().with_threshold(1.0);

        auto_key_channels(&mut keyer, &mut obj, &channels, 10.0);
        obj.pose.bones[0].location[0] = 2.0;
        auto_key_channels(&mut keyer, &mut obj, &channels, 10.5);
        let curve = obj.action.as_ref().unwrap().find_curve(&path, 0).unwrap();
        assert_eq!(curve.keys.len(), 1);
        assert_eq!(curve.keys[0].value, 2.0);

        let mut keyer = ActionKeyframer::default();
        auto_key_channels(&mut keyer, &mut obj, &channels, 10.5);
        let curve = obj.action.as_ref().unwrap().find_curve(&path, 0).unwrap();
        assert_eq!(curve.keys.len(), 2);
    }
}
