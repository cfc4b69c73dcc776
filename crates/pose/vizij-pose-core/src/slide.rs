//! Slide sessions: push, relax, breakdown and the rest-pose variants.
//!
//! Lifecycle: `init` (no side effects on failure) → any number of events or
//! `update`s → `confirm` or `cancel`. Every change restores the snapshot and
//! re-applies from scratch, so repeating an update never compounds.

use log::{debug, trace};

use crate::blend_math::{blend_quat, frame_weights, mode_weights, rest_value, rest_vec4, slide_value};
use crate::channel_map::{ChannelCurveMap, ChannelLink, TransformFlags};
use crate::config::{AxisLock, ChannelMask, Config, SlideMode, SlideOptions};
use crate::curve::{Action, FCurve};
use crate::error::PoseError;
use crate::event::{GestureContext, InputEvent, Key, NumericInput, SessionOutcome, SessionStatus};
use crate::ids::ObjectId;
use crate::keyframe_index::KeyframeIndex;
use crate::keying::{auto_key_channels, Keyframer};
use crate::lock::{EvalLockGuard, EvalLocks};
use crate::math::{make_compatible_quat, normalize_quat, QUAT_IDENTITY};
use crate::path::{ChannelProperty, CurvePath};
use crate::pose::{PoseBone, PoseObject, Rotation, Scene};
use crate::snapshot::PoseSnapshot;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlideState {
    Running,
    Confirmed,
    Cancelled,
}

/// Reference frames of one object, in its action time.
#[derive(Copy, Clone, Debug, PartialEq)]
struct ObjectFrames {
    object: ObjectId,
    prev: f32,
    next: f32,
}

#[derive(Debug)]
pub struct SlideSession {
    mode: SlideMode,
    state: SlideState,
    config: Config,
    percentage: f32,
    /// Pointer-driven factor before increment snapping.
    raw_factor: f32,
    last_x: f32,
    cframe: f32,
    prev_frame: i32,
    next_frame: i32,
    channels: ChannelMask,
    axis_lock: AxisLock,
    object_frames: Vec<ObjectFrames>,
    map: ChannelCurveMap,
    snapshot: Option<PoseSnapshot>,
    numeric: NumericInput,
    locks: Vec<EvalLockGuard>,
}

#[inline]
fn clamp_factor(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Keep the reference frames strictly ordered.
fn separate_frames(prev: i32, next: i32) -> (i32, i32) {
    use std::cmp::Ordering;
    match prev.cmp(&next) {
        Ordering::Less => (prev, next),
        Ordering::Equal => (prev - 1, next + 1),
        Ordering::Greater => (next, prev),
    }
}

/// Merged key columns of every linked curve, in scene time.
fn scene_key_index(scene: &Scene, map: &ChannelCurveMap, threshold: f32) -> KeyframeIndex {
    let mut frames = Vec::new();
    for (key, link) in map.iter() {
        let Some(object) = scene.object(key.object) else {
            continue;
        };
        let Some(action) = object.action.as_ref() else {
            continue;
        };
        let remap = object.frame_remap;
        for curve in link.curves(action) {
            frames.extend(curve.keys.iter().map(|k| remap.to_scene(k.frame)));
        }
    }
    KeyframeIndex::from_frames(frames, threshold)
}

impl SlideSession {
    /// Validate the context and capture the pose. Nothing in `scene` changes.
    pub fn init(
        scene: &Scene,
        mode: SlideMode,
        options: &SlideOptions,
        gesture: &GestureContext,
        locks: &EvalLocks,
        config: &Config,
    ) -> Result<Self, PoseError> {
        let objects: Vec<&PoseObject> = scene.pose_objects().collect();
        if objects.is_empty() {
            return Err(PoseError::NoPoseContext);
        }
        if let Some(linked) = objects.iter().find(|o| o.linked) {
            return Err(PoseError::LinkedData {
                object: linked.name.clone(),
            });
        }

        let ids: Vec<ObjectId> = objects.iter().map(|o| o.id).collect();
        let map = ChannelCurveMap::from_selection(scene, &ids);
        if map.is_empty() {
            return Err(PoseError::NoAnimatedBones);
        }

        let index = scene_key_index(scene, &map, config.frame_threshold);
        if index.is_empty() {
            return Err(PoseError::NoKeyframes);
        }

        let cframe = scene.current_frame;
        let (prev_key, next_key) = index.neighbors(cframe);
        let frame = cframe.round() as i32;
        let prev = options
            .prev_frame
            .unwrap_or_else(|| prev_key.map_or(frame - 1, |f| f as i32));
        let next = options
            .next_frame
            .unwrap_or_else(|| next_key.map_or(frame + 1, |f| f as i32));
        let (prev_frame, next_frame) = separate_frames(prev, next);

        let mut guards = Vec::new();
        for id in map.objects() {
            let name = scene.object(id).map_or("", |o| o.name.as_str());
            guards.push(locks.try_lock(id, name)?);
        }

        let object_frames = map
            .objects()
            .into_iter()
            .filter_map(|id| scene.object(id))
            .map(|o| ObjectFrames {
                object: o.id,
                prev: o.frame_remap.to_action(prev_frame as f32),
                next: o.frame_remap.to_action(next_frame as f32),
            })
            .collect();

        let snapshot = PoseSnapshot::capture(scene, map.bones());
        let percentage = clamp_factor(options.percentage);
        let channels = options.channels;
        let axis_lock = if channels.allows_axis_lock() {
            options.axis_lock
        } else {
            AxisLock::Free
        };

        debug!(
            "slide {:?} started on {} bones, frames {prev_frame}..{next_frame} around {cframe}",
            mode,
            map.len()
        );

        Ok(Self {
            mode,
            state: SlideState::Running,
            config: config.clone(),
            percentage,
            raw_factor: percentage,
            last_x: gesture.cursor_x,
            cframe,
            prev_frame,
            next_frame,
            channels,
            axis_lock,
            object_frames,
            map,
            snapshot: Some(snapshot),
            numeric: NumericInput::default(),
            locks: guards,
        })
    }

    /// One-shot slide: init, apply once, confirm.
    pub fn exec(
        scene: &mut Scene,
        mode: SlideMode,
        options: &SlideOptions,
        locks: &EvalLocks,
        config: &Config,
        keyframer: &mut dyn Keyframer,
    ) -> Result<(), PoseError> {
        let mut session = Self::init(scene, mode, options, &GestureContext::default(), locks, config)?;
        session.apply(scene);
        session.confirm(scene, keyframer);
        Ok(())
    }

    pub fn mode(&self) -> SlideMode {
        self.mode
    }

    pub fn state(&self) -> SlideState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state != SlideState::Running
    }

    pub fn percentage(&self) -> f32 {
        self.percentage
    }

    /// Scene-time reference frames, `prev < next`.
    pub fn frames(&self) -> (i32, i32) {
        (self.prev_frame, self.next_frame)
    }

    /// Reference frames of `object` in its action time.
    pub fn object_frames(&self, object: ObjectId) -> Option<(f32, f32)> {
        self.object_frames
            .iter()
            .find(|f| f.object == object)
            .map(|f| (f.prev, f.next))
    }

    pub fn channels(&self) -> ChannelMask {
        self.channels
    }

    pub fn axis_lock(&self) -> AxisLock {
        self.axis_lock
    }

    pub fn bone_count(&self) -> usize {
        self.map.len()
    }

    fn assert_running(&self, op: &str) {
        if self.state != SlideState::Running {
            panic!("{op} on a slide session that already finished ({:?})", self.state);
        }
    }

    fn snapshot(&self) -> &PoseSnapshot {
        match &self.snapshot {
            Some(s) => s,
            None => panic!("slide session snapshot used after release"),
        }
    }

    /// Set the percentage directly (clamped) and re-apply.
    pub fn update(&mut self, scene: &mut Scene, percentage: f32) {
        self.assert_running("update");
        self.raw_factor = clamp_factor(percentage);
        self.percentage = self.raw_factor;
        self.apply(scene);
    }

    /// Restore the captured pose, then slide every linked bone at the current percentage.
    pub fn apply(&self, scene: &mut Scene) {
        self.assert_running("apply");
        let snapshot = self.snapshot();
        snapshot.restore(scene);

        let prev = self.prev_frame as f32;
        let next = self.next_frame as f32;
        let weights = mode_weights(self.mode, self.percentage, self.cframe, prev, next);
        let interp_t = frame_weights(self.cframe, prev, next).0;

        for (key, link) in self.map.iter() {
            let Some(frames) = self.object_frames.iter().find(|f| f.object == key.object) else {
                continue;
            };
            let Some(object) = scene.object_mut(key.object) else {
                continue;
            };
            let PoseObject { pose, action, .. } = object;
            let (Some(action), Some(bone)) = (action.as_ref(), pose.bone_mut(&key.bone)) else {
                continue;
            };
            let slider = BoneSlider {
                mode: self.mode,
                percentage: self.percentage,
                weights,
                interp_t,
                prev: frames.prev,
                next: frames.next,
                axis_lock: self.axis_lock,
                link,
                action,
            };
            slider.apply(bone, self.channels);
        }
    }

    pub fn handle_event(
        &mut self,
        scene: &mut Scene,
        keyframer: &mut dyn Keyframer,
        event: &InputEvent,
    ) -> SessionStatus {
        self.assert_running("handle_event");
        match *event {
            InputEvent::PointerMove { x, modifiers } => {
                let mut delta = (x - self.last_x) / self.config.slide_pixel_distance.max(1.0);
                self.last_x = x;
                if self.numeric.is_active() {
                    return SessionStatus::Running;
                }
                if modifiers.shift && self.config.precision_divisor > 0.0 {
                    delta /= self.config.precision_divisor;
                }
                self.raw_factor = clamp_factor(self.raw_factor + delta);
                self.percentage = if modifiers.ctrl && self.config.increment > 0.0 {
                    let inc = self.config.increment;
                    clamp_factor((self.raw_factor / inc).round() * inc)
                } else {
                    self.raw_factor
                };
                trace!("slide percentage {:.3}", self.percentage);
                self.apply(scene);
                SessionStatus::Running
            }
            InputEvent::KeyPress { key, .. } => self.handle_key(scene, keyframer, key),
            InputEvent::KeyRelease { .. } => SessionStatus::Running,
        }
    }

    fn handle_key(&mut self, scene: &mut Scene, keyframer: &mut dyn Keyframer, key: Key) -> SessionStatus {
        let key = key.normalized();
        if key.is_confirm() {
            self.confirm(scene, keyframer);
            return SessionStatus::Finished(SessionOutcome::Confirmed);
        }
        if key.is_cancel() {
            self.cancel(scene);
            return SessionStatus::Finished(SessionOutcome::Cancelled);
        }
        if self.numeric.handle(key) {
            self.percentage = match self.numeric.value() {
                Some(v) => clamp_factor(v / 100.0),
                None => self.raw_factor,
            };
            trace!("slide percentage {:.3} (typed)", self.percentage);
            self.apply(scene);
            return SessionStatus::Running;
        }

        match key {
            Key::Letter('G') => self.toggle_channels(ChannelMask::Loc),
            Key::Letter('R') => self.toggle_channels(ChannelMask::Rot),
            Key::Letter('S') => self.toggle_channels(ChannelMask::Scale),
            Key::Letter('B') => self.toggle_channels(ChannelMask::BBone),
            Key::Letter('C') => self.toggle_channels(ChannelMask::Custom),
            Key::Letter('X') => self.toggle_axis(AxisLock::X),
            Key::Letter('Y') => self.toggle_axis(AxisLock::Y),
            Key::Letter('Z') => self.toggle_axis(AxisLock::Z),
            _ => return SessionStatus::Running,
        }
        self.apply(scene);
        SessionStatus::Running
    }

    fn toggle_channels(&mut self, mask: ChannelMask) {
        self.channels = if self.channels == mask { ChannelMask::All } else { mask };
        self.axis_lock = AxisLock::Free;
    }

    fn toggle_axis(&mut self, axis: AxisLock) {
        self.axis_lock = if !self.channels.allows_axis_lock() || self.axis_lock == axis {
            AxisLock::Free
        } else {
            axis
        };
    }

    /// Keep the current pose, key the linked curves, release the snapshot.
    pub fn confirm(&mut self, scene: &mut Scene, keyframer: &mut dyn Keyframer) {
        self.assert_running("confirm");
        if keyframer.auto_key_enabled() {
            for id in self.map.objects() {
                let Some(object) = scene.object_mut(id) else {
                    continue;
                };
                let Some(action) = object.action.as_ref() else {
                    continue;
                };
                let channels: Vec<(CurvePath, usize)> = self
                    .map
                    .iter()
                    .filter(|(key, _)| key.object == id)
                    .flat_map(|(_, link)| link.curves(action))
                    .map(|c| (c.path.clone(), c.array_index))
                    .collect();
                let keyed = auto_key_channels(keyframer, object, &channels, self.cframe);
                debug!("slide confirmed: keyed {keyed} channels on '{}'", object.name);
            }
        }
        self.finish(SlideState::Confirmed);
    }

    /// Put the captured pose back and end the session.
    pub fn cancel(&mut self, scene: &mut Scene) {
        self.assert_running("cancel");
        self.snapshot().restore(scene);
        debug!("slide {:?} cancelled", self.mode);
        self.finish(SlideState::Cancelled);
    }

    fn finish(&mut self, state: SlideState) {
        if let Some(snapshot) = self.snapshot.take() {
            snapshot.release();
        }
        self.locks.clear();
        self.state = state;
    }

    /// One-line header describing the gesture.
    pub fn status_text(&self) -> String {
        let amount = if self.numeric.is_active() {
            format!("{}%", self.numeric.text())
        } else {
            format!("{:.0}%", self.percentage * 100.0)
        };
        let axis = match self.axis_lock {
            AxisLock::Free => String::new(),
            lock => format!(" | Axis: {lock:?}"),
        };
        format!(
            "{}: {amount} | Channels: {}{axis}",
            self.mode.label(),
            self.channels.label()
        )
    }
}

/// Rest value of one component, for the properties rest modes touch.
/// Rotation components come from the rest of the bone's own representation.
fn rest_default(rotation: &Rotation, prop: &ChannelProperty, index: usize) -> Option<f32> {
    match prop {
        ChannelProperty::Location => Some(0.0),
        ChannelProperty::Scale => Some(1.0),
        ChannelProperty::RotationEuler
        | ChannelProperty::RotationAxisAngle
        | ChannelProperty::RotationQuaternion => {
            if rotation.property() == *prop {
                rotation.rest().component(index)
            } else {
                None
            }
        }
        ChannelProperty::BBone(_) | ChannelProperty::Custom(_) => None,
    }
}

fn sample4(curves: &[&FCurve; 4], frame: f32) -> [f32; 4] {
    [
        curves[0].evaluate(frame),
        curves[1].evaluate(frame),
        curves[2].evaluate(frame),
        curves[3].evaluate(frame),
    ]
}

/// Per-bone application of one slide step.
struct BoneSlider<'a> {
    mode: SlideMode,
    percentage: f32,
    weights: (f32, f32),
    interp_t: f32,
    prev: f32,
    next: f32,
    axis_lock: AxisLock,
    link: &'a ChannelLink,
    action: &'a Action,
}

impl BoneSlider<'_> {
    fn apply(&self, bone: &mut PoseBone, channels: ChannelMask) {
        let wants = |mask: ChannelMask| channels == ChannelMask::All || channels == mask;
        let flags = self.link.flags;

        if wants(ChannelMask::Loc) && flags.contains(TransformFlags::LOCATION) {
            self.apply_components(bone, &ChannelProperty::Location, 3, true);
        }
        if wants(ChannelMask::Rot) && flags.contains(TransformFlags::ROTATION) {
            match bone.rotation {
                Rotation::Euler(..) => self.apply_components(bone, &ChannelProperty::RotationEuler, 3, true),
                Rotation::Quaternion(q) => self.apply_quat(bone, q),
                Rotation::AxisAngle(_) => {
                    self.apply_components(bone, &ChannelProperty::RotationAxisAngle, 4, false)
                }
            }
        }
        if wants(ChannelMask::Scale) && flags.contains(TransformFlags::SCALE) {
            self.apply_components(bone, &ChannelProperty::Scale, 3, true);
        }

        if self.mode.is_rest() {
            return;
        }
        if wants(ChannelMask::BBone) && flags.contains(TransformFlags::BBONE) {
            self.apply_props(bone, |p| matches!(p, ChannelProperty::BBone(_)));
        }
        if wants(ChannelMask::Custom) && flags.contains(TransformFlags::CUSTOM) {
            self.apply_props(bone, |p| matches!(p, ChannelProperty::Custom(_)));
        }
    }

    fn apply_components(&self, bone: &mut PoseBone, prop: &ChannelProperty, count: usize, lockable: bool) {
        for index in 0..count {
            if lockable && !self.axis_lock.allows(index) {
                continue;
            }
            self.apply_component(bone, prop, index);
        }
    }

    fn apply_component(&self, bone: &mut PoseBone, prop: &ChannelProperty, index: usize) {
        let Some(v) = bone.channel_value(prop, index) else {
            return;
        };
        let out = if self.mode.is_rest() {
            match rest_default(&bone.rotation, prop, index) {
                Some(rest) => rest_value(self.mode, v, rest, self.percentage),
                None => return,
            }
        } else {
            match self.link.find(self.action, prop, index) {
                Some(curve) => self.slide(curve, v),
                None => return,
            }
        };
        bone.set_channel_value(prop, index, out);
    }

    fn apply_props(&self, bone: &mut PoseBone, include: impl Fn(&ChannelProperty) -> bool) {
        for curve in self.link.curves(self.action) {
            let prop = &curve.path.property;
            if !include(prop) {
                continue;
            }
            if let Some(v) = bone.channel_value(prop, curve.array_index) {
                let out = self.slide(curve, v);
                bone.set_channel_value(prop, curve.array_index, out);
            }
        }
    }

    fn slide(&self, curve: &FCurve, v: f32) -> f32 {
        let start = curve.evaluate(self.prev);
        let end = curve.evaluate(self.next);
        slide_value(self.mode, start, end, v, self.weights, self.percentage)
    }

    fn apply_quat(&self, bone: &mut PoseBone, current: [f32; 4]) {
        let out = if self.mode.is_rest() {
            let q = rest_vec4(self.mode, current, QUAT_IDENTITY, self.percentage);
            make_compatible_quat(normalize_quat(q), current)
        } else {
            let prop = ChannelProperty::RotationQuaternion;
            let curves = (
                self.link.find(self.action, &prop, 0),
                self.link.find(self.action, &prop, 1),
                self.link.find(self.action, &prop, 2),
                self.link.find(self.action, &prop, 3),
            );
            let (Some(w), Some(x), Some(y), Some(z)) = curves else {
                return;
            };
            let curves = [w, x, y, z];
            blend_quat(
                self.mode,
                sample4(&curves, self.prev),
                sample4(&curves, self.next),
                current,
                self.percentage,
                self.interp_t,
            )
        };
        bone.rotation = Rotation::Quaternion(out);
    }
}
