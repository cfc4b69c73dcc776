//! Association between pose bones and the curves that animate them.

use bitflags::bitflags;
use indexmap::IndexMap;
use log::warn;

use crate::curve::{Action, FCurve};
use crate::ids::{BoneKey, ObjectId};
use crate::path::ChannelProperty;
use crate::pose::Scene;

bitflags! {
    /// Transform groups a bone has curves for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TransformFlags: u8 {
        const LOCATION = 0b0000_0001;
        const ROTATION = 0b0000_0010;
        const SCALE = 0b0000_0100;
        const BBONE = 0b0000_1000;
        const CUSTOM = 0b0001_0000;
    }
}

/// Curves linked to one bone. Indices point into the owning object's action.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelLink {
    pub curves: Vec<usize>,
    pub flags: TransformFlags,
}

impl ChannelLink {
    pub fn curves<'a>(&'a self, action: &'a Action) -> impl Iterator<Item = &'a FCurve> + 'a {
        self.curves.iter().filter_map(move |&i| action.curves.get(i))
    }

    /// Curve driving component `array_index` of `property`, if linked.
    pub fn find<'a>(
        &self,
        action: &'a Action,
        property: &ChannelProperty,
        array_index: usize,
    ) -> Option<&'a FCurve> {
        self.curves
            .iter()
            .filter_map(|&i| action.curves.get(i))
            .find(|c| c.array_index == array_index && &c.path.property == property)
    }
}

/// Per-bone curve links for a set of bones, in discovery order.
#[derive(Clone, Debug, Default)]
pub struct ChannelCurveMap {
    links: IndexMap<BoneKey, ChannelLink>,
}

impl ChannelCurveMap {
    /// Link every selected bone of the given objects to its curves.
    /// Objects without an action and bones without curves are skipped.
    pub fn from_selection(scene: &Scene, objects: &[ObjectId]) -> Self {
        let mut map = Self::default();
        for &id in objects {
            let Some(object) = scene.object(id) else {
                continue;
            };
            let Some(action) = object.action.as_ref() else {
                warn!("pose object '{}' has no action; skipping", object.name);
                continue;
            };
            for bone in object.pose.selected_bones() {
                let link = link_bone(action, &bone.name);
                if link.curves.is_empty() {
                    warn!("bone '{}' on '{}' has no curves; skipping", bone.name, object.name);
                    continue;
                }
                map.links.insert(BoneKey::new(id, bone.name.clone()), link);
            }
        }
        map
    }

    pub fn insert(&mut self, key: BoneKey, link: ChannelLink) {
        self.links.insert(key, link);
    }

    pub fn get(&self, key: &BoneKey) -> Option<&ChannelLink> {
        self.links.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BoneKey, &ChannelLink)> {
        self.links.iter()
    }

    pub fn bones(&self) -> impl Iterator<Item = &BoneKey> {
        self.links.keys()
    }

    /// Distinct objects touched by the map, in discovery order.
    pub fn objects(&self) -> Vec<ObjectId> {
        let mut out: Vec<ObjectId> = Vec::new();
        for key in self.links.keys() {
            if !out.contains(&key.object) {
                out.push(key.object);
            }
        }
        out
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Collect the curves of `action` animating `bone`.
pub fn link_bone(action: &Action, bone: &str) -> ChannelLink {
    let mut curves = Vec::new();
    let mut flags = TransformFlags::empty();
    for (i, curve) in action.curves.iter().enumerate() {
        if curve.path.bone == bone {
            curves.push(i);
            flags |= curve.path.property.transform_flag();
        }
    }
    ChannelLink { curves, flags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{FCurve, Keyframe};
    use crate::path::CurvePath;
    use crate::pose::{PoseBone, PoseObject};

    fn curve(bone: &str, prop: ChannelProperty, index: usize) -> FCurve {
        FCurve::new(CurvePath::new(bone, prop), index).with_keys(vec![Keyframe::new(1.0, 0.0)])
    }

    #[test]
    fn selected_bones_link_to_their_curves() {
        let mut obj = PoseObject::new(ObjectId(1), "Rig");
        let mut arm = PoseBone::new("Arm");
        arm.selected = true;
        let mut leg = PoseBone::new("Leg");
        leg.selected = true;
        obj.pose.bones = vec![arm, leg, PoseBone::new("Head")];
        obj.action = Some(
            Action::new("act")
                .with_curve(curve("Arm", ChannelProperty::Location, 0))
                .with_curve(curve("Arm", ChannelProperty::Scale, 1))
                .with_curve(curve("Head", ChannelProperty::Location, 0)),
        );
        let scene = Scene {
            objects: vec![obj],
            ..Scene::default()
        };

        let map = ChannelCurveMap::from_selection(&scene, &[ObjectId(1)]);
        assert_eq!(map.len(), 1);
        let link = map.get(&BoneKey::new(ObjectId(1), "Arm")).unwrap();
        assert_eq!(link.curves, vec![0, 1]);
        assert_eq!(link.flags, TransformFlags::LOCATION | TransformFlags::SCALE);

        let action = scene.objects[0].action.as_ref().unwrap();
        assert!(link.find(action, &ChannelProperty::Scale, 1).is_some());
        assert!(link.find(action, &ChannelProperty::Scale, 0).is_none());
    }
}
