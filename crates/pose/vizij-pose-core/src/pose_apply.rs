//! Blend a stored pose action onto the live pose.

use crate::curve::Action;
use crate::math::{interp_quat, lerp_f32, make_compatible_quat, normalize_quat};
use crate::path::ChannelProperty;
use crate::pose::{PoseBone, PoseObject, Rotation};

/// Frame a pose action is sampled at: its first key.
pub fn pose_frame(action: &Action) -> f32 {
    action.frame_range().map_or(0.0, |(first, _)| first)
}

/// Blend `action` onto `bones` of `object` with weight `factor`.
/// Scalars move `v + (sample - v) * factor`; quaternions take the short arc and
/// stay unit length. Bones missing from the pose are ignored.
pub fn apply_action_blend(object: &mut PoseObject, action: &Action, bones: &[String], factor: f32) {
    let frame = pose_frame(action);
    for name in bones {
        if let Some(bone) = object.pose.bone_mut(name) {
            blend_bone(bone, action, frame, factor);
        }
    }
}

fn blend_bone(bone: &mut PoseBone, action: &Action, frame: f32, factor: f32) {
    let mut quat_target: Option<[f32; 4]> = None;
    let name = bone.name.clone();

    for curve in action.curves_for_bone(&name) {
        let prop = &curve.path.property;
        let sample = curve.evaluate(frame);
        if *prop == ChannelProperty::RotationQuaternion {
            if let Rotation::Quaternion(current) = bone.rotation {
                let target = quat_target.get_or_insert(current);
                if let Some(slot) = target.get_mut(curve.array_index) {
                    *slot = sample;
                }
            }
            continue;
        }
        if let Some(v) = bone.channel_value(prop, curve.array_index) {
            bone.set_channel_value(prop, curve.array_index, lerp_f32(v, sample, factor));
        }
    }

    if let (Some(target), Rotation::Quaternion(current)) = (quat_target, bone.rotation) {
        let from = normalize_quat(current);
        let blended = normalize_quat(interp_quat(from, normalize_quat(target), factor));
        bone.rotation = Rotation::Quaternion(make_compatible_quat(blended, current));
    }
}
