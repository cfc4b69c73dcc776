//! Scene model: armature objects, their pose bones, markers and frame mapping.
//!
//! This is the live data the sessions mutate. Bones carry every animatable
//! property in its current representation; curves address those properties
//! through [`ChannelProperty`] and a component index.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::curve::Action;
use crate::ids::ObjectId;
use crate::math::QUAT_IDENTITY;
use crate::path::ChannelProperty;
use crate::value::PropValue;

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum EulerOrder {
    #[default]
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
}

/// Bone rotation in its active representation.
/// Quaternions are `[w, x, y, z]`; axis-angle is `[angle, x, y, z]`.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Rotation {
    Quaternion([f32; 4]),
    Euler([f32; 3], EulerOrder),
    AxisAngle([f32; 4]),
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::Quaternion(QUAT_IDENTITY)
    }
}

impl Rotation {
    /// Curve property that drives this representation.
    pub fn property(&self) -> ChannelProperty {
        match self {
            Rotation::Quaternion(_) => ChannelProperty::RotationQuaternion,
            Rotation::Euler(..) => ChannelProperty::RotationEuler,
            Rotation::AxisAngle(_) => ChannelProperty::RotationAxisAngle,
        }
    }

    /// Rest-pose value in the same representation.
    pub fn rest(&self) -> Rotation {
        match self {
            Rotation::Quaternion(_) => Rotation::Quaternion(QUAT_IDENTITY),
            Rotation::Euler(_, order) => Rotation::Euler([0.0; 3], *order),
            Rotation::AxisAngle(_) => Rotation::AxisAngle([0.0, 0.0, 1.0, 0.0]),
        }
    }

    pub fn component(&self, index: usize) -> Option<f32> {
        match self {
            Rotation::Quaternion(q) | Rotation::AxisAngle(q) => q.get(index).copied(),
            Rotation::Euler(e, _) => e.get(index).copied(),
        }
    }

    pub fn set_component(&mut self, index: usize, v: f32) -> bool {
        let slot = match self {
            Rotation::Quaternion(q) | Rotation::AxisAngle(q) => q.get_mut(index),
            Rotation::Euler(e, _) => e.get_mut(index),
        };
        match slot {
            Some(s) => {
                *s = v;
                true
            }
            None => false,
        }
    }
}

/// Named bendy-bone scalar properties.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BBoneProp {
    CurveInX,
    CurveInZ,
    CurveOutX,
    CurveOutZ,
    RollIn,
    RollOut,
    EaseIn,
    EaseOut,
    ScaleInX,
    ScaleInY,
    ScaleOutX,
    ScaleOutY,
}

const BBONE_NAMES: [(BBoneProp, &str); 12] = [
    (BBoneProp::CurveInX, "bbone_curveinx"),
    (BBoneProp::CurveInZ, "bbone_curveinz"),
    (BBoneProp::CurveOutX, "bbone_curveoutx"),
    (BBoneProp::CurveOutZ, "bbone_curveoutz"),
    (BBoneProp::RollIn, "bbone_rollin"),
    (BBoneProp::RollOut, "bbone_rollout"),
    (BBoneProp::EaseIn, "bbone_easein"),
    (BBoneProp::EaseOut, "bbone_easeout"),
    (BBoneProp::ScaleInX, "bbone_scaleinx"),
    (BBoneProp::ScaleInY, "bbone_scaleiny"),
    (BBoneProp::ScaleOutX, "bbone_scaleoutx"),
    (BBoneProp::ScaleOutY, "bbone_scaleouty"),
];

impl BBoneProp {
    pub const ALL: [BBoneProp; 12] = [
        BBoneProp::CurveInX,
        BBoneProp::CurveInZ,
        BBoneProp::CurveOutX,
        BBoneProp::CurveOutZ,
        BBoneProp::RollIn,
        BBoneProp::RollOut,
        BBoneProp::EaseIn,
        BBoneProp::EaseOut,
        BBoneProp::ScaleInX,
        BBoneProp::ScaleInY,
        BBoneProp::ScaleOutX,
        BBoneProp::ScaleOutY,
    ];

    pub fn name(self) -> &'static str {
        BBONE_NAMES
            .iter()
            .find(|(p, _)| *p == self)
            .map(|(_, n)| *n)
            .unwrap_or("")
    }

    pub fn from_name(name: &str) -> Option<BBoneProp> {
        BBONE_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(p, _)| *p)
    }

    /// Value of the property on an undeformed bone.
    pub fn default_value(self) -> f32 {
        match self {
            BBoneProp::ScaleInX | BBoneProp::ScaleInY | BBoneProp::ScaleOutX | BBoneProp::ScaleOutY => 1.0,
            _ => 0.0,
        }
    }
}

/// Bendy-bone shape parameters.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BBoneShape {
    pub curve_in_x: f32,
    pub curve_in_z: f32,
    pub curve_out_x: f32,
    pub curve_out_z: f32,
    pub roll_in: f32,
    pub roll_out: f32,
    pub ease_in: f32,
    pub ease_out: f32,
    pub scale_in: [f32; 2],
    pub scale_out: [f32; 2],
}

impl Default for BBoneShape {
    fn default() -> Self {
        let mut shape = Self {
            curve_in_x: 0.0,
            curve_in_z: 0.0,
            curve_out_x: 0.0,
            curve_out_z: 0.0,
            roll_in: 0.0,
            roll_out: 0.0,
            ease_in: 0.0,
            ease_out: 0.0,
            scale_in: [0.0; 2],
            scale_out: [0.0; 2],
        };
        for prop in BBoneProp::ALL {
            shape.set(prop, prop.default_value());
        }
        shape
    }
}

impl BBoneShape {
    fn slot_mut(&mut self, prop: BBoneProp) -> &mut f32 {
        match prop {
            BBoneProp::CurveInX => &mut self.curve_in_x,
            BBoneProp::CurveInZ => &mut self.curve_in_z,
            BBoneProp::CurveOutX => &mut self.curve_out_x,
            BBoneProp::CurveOutZ => &mut self.curve_out_z,
            BBoneProp::RollIn => &mut self.roll_in,
            BBoneProp::RollOut => &mut self.roll_out,
            BBoneProp::EaseIn => &mut self.ease_in,
            BBoneProp::EaseOut => &mut self.ease_out,
            BBoneProp::ScaleInX => &mut self.scale_in[0],
            BBoneProp::ScaleInY => &mut self.scale_in[1],
            BBoneProp::ScaleOutX => &mut self.scale_out[0],
            BBoneProp::ScaleOutY => &mut self.scale_out[1],
        }
    }

    pub fn get(&self, prop: BBoneProp) -> f32 {
        match prop {
            BBoneProp::CurveInX => self.curve_in_x,
            BBoneProp::CurveInZ => self.curve_in_z,
            BBoneProp::CurveOutX => self.curve_out_x,
            BBoneProp::CurveOutZ => self.curve_out_z,
            BBoneProp::RollIn => self.roll_in,
            BBoneProp::RollOut => self.roll_out,
            BBoneProp::EaseIn => self.ease_in,
            BBoneProp::EaseOut => self.ease_out,
            BBoneProp::ScaleInX => self.scale_in[0],
            BBoneProp::ScaleInY => self.scale_in[1],
            BBoneProp::ScaleOutX => self.scale_out[0],
            BBoneProp::ScaleOutY => self.scale_out[1],
        }
    }

    pub fn set(&mut self, prop: BBoneProp, v: f32) {
        *self.slot_mut(prop) = v;
    }
}

fn unit_scale() -> [f32; 3] {
    [1.0; 3]
}

/// Per-bone animatable state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PoseBone {
    pub name: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub location: [f32; 3],
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub bbone: BBoneShape,
    #[serde(default)]
    pub custom: IndexMap<String, PropValue>,
}

impl PoseBone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selected: false,
            location: [0.0; 3],
            rotation: Rotation::default(),
            scale: unit_scale(),
            bbone: BBoneShape::default(),
            custom: IndexMap::new(),
        }
    }

    /// Read one curve component. `None` when the property is absent, the index is
    /// out of range, or a rotation curve targets a representation the bone is not using.
    pub fn channel_value(&self, prop: &ChannelProperty, index: usize) -> Option<f32> {
        match prop {
            ChannelProperty::Location => self.location.get(index).copied(),
            ChannelProperty::Scale => self.scale.get(index).copied(),
            ChannelProperty::RotationQuaternion
            | ChannelProperty::RotationEuler
            | ChannelProperty::RotationAxisAngle => {
                if self.rotation.property() == *prop {
                    self.rotation.component(index)
                } else {
                    None
                }
            }
            ChannelProperty::BBone(p) => (index == 0).then(|| self.bbone.get(*p)),
            ChannelProperty::Custom(name) => {
                if index != 0 {
                    return None;
                }
                self.custom.get(name).map(PropValue::as_f32)
            }
        }
    }

    /// Write one curve component, converting to the custom property's kind.
    /// Returns false when the target does not exist on this bone.
    pub fn set_channel_value(&mut self, prop: &ChannelProperty, index: usize, v: f32) -> bool {
        match prop {
            ChannelProperty::Location => match self.location.get_mut(index) {
                Some(slot) => {
                    *slot = v;
                    true
                }
                None => false,
            },
            ChannelProperty::Scale => match self.scale.get_mut(index) {
                Some(slot) => {
                    *slot = v;
                    true
                }
                None => false,
            },
            ChannelProperty::RotationQuaternion
            | ChannelProperty::RotationEuler
            | ChannelProperty::RotationAxisAngle => {
                self.rotation.property() == *prop && self.rotation.set_component(index, v)
            }
            ChannelProperty::BBone(p) => {
                if index != 0 {
                    return false;
                }
                self.bbone.set(*p, v);
                true
            }
            ChannelProperty::Custom(name) => {
                if index != 0 {
                    return false;
                }
                match self.custom.get_mut(name) {
                    Some(slot) => {
                        *slot = slot.with_f32(v);
                        true
                    }
                    None => false,
                }
            }
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Pose {
    #[serde(default)]
    pub bones: Vec<PoseBone>,
}

impl Pose {
    pub fn bone(&self, name: &str) -> Option<&PoseBone> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn bone_mut(&mut self, name: &str) -> Option<&mut PoseBone> {
        self.bones.iter_mut().find(|b| b.name == name)
    }

    pub fn any_selected(&self) -> bool {
        self.bones.iter().any(|b| b.selected)
    }

    pub fn selected_bones(&self) -> impl Iterator<Item = &PoseBone> {
        self.bones.iter().filter(|b| b.selected)
    }
}

/// Linear mapping between scene time and an object's action time.
/// `scene = action * scale + offset`.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrameRemap {
    pub offset: f32,
    pub scale: f32,
}

impl Default for FrameRemap {
    fn default() -> Self {
        Self {
            offset: 0.0,
            scale: 1.0,
        }
    }
}

impl FrameRemap {
    #[inline]
    pub fn to_action(&self, scene_frame: f32) -> f32 {
        if self.scale == 0.0 {
            scene_frame - self.offset
        } else {
            (scene_frame - self.offset) / self.scale
        }
    }

    #[inline]
    pub fn to_scene(&self, action_frame: f32) -> f32 {
        if self.scale == 0.0 {
            action_frame + self.offset
        } else {
            action_frame * self.scale + self.offset
        }
    }
}

fn default_true() -> bool {
    true
}

/// Armature object with its pose and active action.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PoseObject {
    pub id: ObjectId,
    pub name: String,
    #[serde(default = "default_true")]
    pub in_pose_mode: bool,
    /// Object data comes from a linked library and can't be edited.
    #[serde(default)]
    pub linked: bool,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub frame_remap: FrameRemap,
}

impl PoseObject {
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            in_pose_mode: true,
            linked: false,
            pose: Pose::default(),
            action: None,
            frame_remap: FrameRemap::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Marker {
    pub name: String,
    pub frame: i32,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Scene {
    #[serde(default)]
    pub current_frame: f32,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub objects: Vec<PoseObject>,
    #[serde(default)]
    pub active_object: Option<ObjectId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            current_frame: 1.0,
            markers: Vec::new(),
            objects: Vec::new(),
            active_object: None,
        }
    }
}

impl Scene {
    pub fn object(&self, id: ObjectId) -> Option<&PoseObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut PoseObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Active object, when it is an armature in pose mode.
    pub fn active_pose_object(&self) -> Option<&PoseObject> {
        self.active_object
            .and_then(|id| self.object(id))
            .filter(|o| o.in_pose_mode)
    }

    /// Every object currently in pose mode, in scene order.
    pub fn pose_objects(&self) -> impl Iterator<Item = &PoseObject> {
        self.objects.iter().filter(|o| o.in_pose_mode)
    }

    pub fn bone(&self, object: ObjectId, bone: &str) -> Option<&PoseBone> {
        self.object(object).and_then(|o| o.pose.bone(bone))
    }

    pub fn bone_mut(&mut self, object: ObjectId, bone: &str) -> Option<&mut PoseBone> {
        self.object_mut(object).and_then(|o| o.pose.bone_mut(bone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbone_name_table_round_trips() {
        for prop in BBoneProp::ALL {
            assert_eq!(BBoneProp::from_name(prop.name()), Some(prop));
        }
        assert_eq!(BBoneProp::from_name("bbone_wobble"), None);
        assert_eq!(BBoneShape::default().get(BBoneProp::ScaleOutY), 1.0);
        assert_eq!(BBoneShape::default().get(BBoneProp::RollIn), 0.0);
    }

    #[test]
    fn rotation_channels_require_matching_mode() {
        let mut bone = PoseBone::new("Arm");
        bone.rotation = Rotation::Euler([0.1, 0.2, 0.3], EulerOrder::XYZ);
        assert_eq!(bone.channel_value(&ChannelProperty::RotationEuler, 1), Some(0.2));
        assert_eq!(bone.channel_value(&ChannelProperty::RotationQuaternion, 0), None);
        assert!(!bone.set_channel_value(&ChannelProperty::RotationQuaternion, 0, 1.0));
        assert!(bone.set_channel_value(&ChannelProperty::RotationEuler, 2, 0.5));
        assert_eq!(bone.rotation, Rotation::Euler([0.1, 0.2, 0.5], EulerOrder::XYZ));
    }

    #[test]
    fn custom_property_writes_keep_kind() {
        let mut bone = PoseBone::new("Hand");
        bone.custom.insert("grip".into(), PropValue::Int(0));
        let prop = ChannelProperty::Custom("grip".into());
        assert!(bone.set_channel_value(&prop, 0, 2.7));
        assert_eq!(bone.custom["grip"], PropValue::Int(2));
        assert!(!bone.set_channel_value(&ChannelProperty::Custom("missing".into()), 0, 1.0));
    }

    #[test]
    fn frame_remap_inverts() {
        let remap = FrameRemap {
            offset: 10.0,
            scale: 2.0,
        };
        assert_eq!(remap.to_action(30.0), 10.0);
        assert_eq!(remap.to_scene(10.0), 30.0);
    }
}
