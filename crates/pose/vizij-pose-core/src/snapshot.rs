//! Pose backup used for non-destructive preview.
//!
//! A snapshot is a deep copy of every transform field of the captured bones.
//! `restore` writes all of them back; `release` consumes the snapshot, so a
//! released snapshot can't be restored or released again.

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::ids::BoneKey;
use crate::pose::{BBoneShape, PoseBone, Rotation, Scene};
use crate::value::PropValue;

#[derive(Clone, Debug, PartialEq)]
struct BoneBackup {
    location: [f32; 3],
    rotation: Rotation,
    scale: [f32; 3],
    bbone: BBoneShape,
    custom: IndexMap<String, PropValue>,
}

impl BoneBackup {
    fn capture(bone: &PoseBone) -> Self {
        Self {
            location: bone.location,
            rotation: bone.rotation,
            scale: bone.scale,
            bbone: bone.bbone,
            custom: bone.custom.clone(),
        }
    }

    fn write(&self, bone: &mut PoseBone) {
        bone.location = self.location;
        bone.rotation = self.rotation;
        bone.scale = self.scale;
        bone.bbone = self.bbone;
        bone.custom.clone_from(&self.custom);
    }
}

#[derive(Clone, Debug, Default)]
pub struct PoseSnapshot {
    bones: HashMap<BoneKey, BoneBackup>,
}

impl PoseSnapshot {
    /// Copy the current state of `bones`. Bones missing from the scene are ignored.
    pub fn capture<'a, I>(scene: &Scene, bones: I) -> Self
    where
        I: IntoIterator<Item = &'a BoneKey>,
    {
        let mut out = HashMap::new();
        for key in bones {
            if let Some(bone) = scene.bone(key.object, &key.bone) {
                out.insert(key.clone(), BoneBackup::capture(bone));
            }
        }
        Self { bones: out }
    }

    /// Write every captured field back into `scene`.
    pub fn restore(&self, scene: &mut Scene) {
        for (key, backup) in &self.bones {
            if let Some(bone) = scene.bone_mut(key.object, &key.bone) {
                backup.write(bone);
            }
        }
    }

    /// Drop the backup without touching the scene.
    pub fn release(self) {
        drop(self);
    }

    pub fn contains(&self, key: &BoneKey) -> bool {
        self.bones.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ObjectId;
    use crate::pose::{BBoneProp, EulerOrder, PoseObject};

    fn scene() -> Scene {
        let mut obj = PoseObject::new(ObjectId(0), "Rig");
        let mut bone = PoseBone::new("Arm");
        bone.location = [1.0, 2.0, 3.0];
        bone.rotation = Rotation::Euler([0.1, 0.2, 0.3], EulerOrder::ZXY);
        bone.custom.insert("grip".into(), PropValue::Float(0.5));
        obj.pose.bones.push(bone);
        Scene {
            objects: vec![obj],
            ..Scene::default()
        }
    }

    #[test]
    fn restore_writes_back_every_field() {
        let mut scene = scene();
        let key = BoneKey::new(ObjectId(0), "Arm");
        let original = scene.bone(key.object, &key.bone).unwrap().clone();
        let snap = PoseSnapshot::capture(&scene, [&key]);

        {
            let bone = scene.bone_mut(key.object, &key.bone).unwrap();
            bone.location = [9.0; 3];
            bone.rotation = Rotation::Euler([1.0; 3], EulerOrder::ZXY);
            bone.scale = [2.0; 3];
            bone.bbone.set(BBoneProp::EaseIn, 4.0);
            bone.custom.insert("grip".into(), PropValue::Float(1.0));
            bone.custom.insert("extra".into(), PropValue::Bool(true));
        }

        snap.restore(&mut scene);
        assert_eq!(scene.bone(key.object, &key.bone).unwrap(), &original);
        snap.release();
    }

    #[test]
    fn missing_bones_are_ignored() {
        let scene = scene();
        let snap = PoseSnapshot::capture(&scene, [&BoneKey::new(ObjectId(0), "Nope")]);
        assert!(snap.is_empty());
    }
}
