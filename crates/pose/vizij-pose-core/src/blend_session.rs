//! Pose-asset blend sessions.
//!
//! State machine: `Blending ⇄ Original` (Tab toggles) until confirm or cancel.
//! Every redraw restores the snapshot first; while blending, the source pose is
//! then blended on at the current factor.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;
use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::BlendOptions;
use crate::curve::Action;
use crate::error::PoseError;
use crate::event::{GestureContext, InputEvent, Key, SessionOutcome, SessionStatus};
use crate::flip::flip_action;
use crate::ids::{BoneKey, ObjectId};
use crate::keying::{auto_key_channels, Keyframer};
use crate::lock::{EvalLockGuard, EvalLocks};
use crate::path::CurvePath;
use crate::pose::Scene;
use crate::pose_apply::apply_action_blend;
use crate::snapshot::PoseSnapshot;

/// Where the pose to blend in comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PoseSource {
    /// An in-memory pose action.
    Action(Action),
    /// A named asset resolved through the [`PoseLibrary`].
    Asset(String),
}

/// Resolves pose assets. Every successful `acquire` is paired with one `release`.
pub trait PoseLibrary {
    fn acquire(&mut self, name: &str) -> Option<Action>;
    fn release(&mut self, name: &str);
}

/// Library backed by a name → action table, counting outstanding leases.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLibrary {
    assets: IndexMap<String, Action>,
    leases: HashMap<String, usize>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, action: Action) {
        self.assets.insert(name.into(), action);
    }

    pub fn lease_count(&self, name: &str) -> usize {
        self.leases.get(name).copied().unwrap_or(0)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }
}

impl PoseLibrary for InMemoryLibrary {
    fn acquire(&mut self, name: &str) -> Option<Action> {
        let action = self.assets.get(name)?.clone();
        *self.leases.entry(name.to_string()).or_insert(0) += 1;
        Some(action)
    }

    fn release(&mut self, name: &str) {
        if let Some(count) = self.leases.get_mut(name) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.leases.remove(name);
            }
        }
    }
}

/// Shared library handle: the engine keeps one clone, the host keeps another.
impl<L: PoseLibrary> PoseLibrary for Rc<RefCell<L>> {
    fn acquire(&mut self, name: &str) -> Option<Action> {
        self.borrow_mut().acquire(name)
    }

    fn release(&mut self, name: &str) {
        self.borrow_mut().release(name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlendState {
    Blending,
    Original,
    Confirmed,
    Cancelled,
}

#[derive(Debug)]
pub struct BlendSession {
    object: ObjectId,
    state: BlendState,
    factor: f32,
    release_confirm: bool,
    drag_start_x: f32,
    region_xmin: f32,
    region_width: f32,
    initiating_key: Option<Key>,
    pose: Action,
    bones: Vec<String>,
    snapshot: Option<PoseSnapshot>,
    lock: Option<EvalLockGuard>,
}

#[inline]
fn clamp_factor(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

impl BlendSession {
    /// Validate the context, pick participating bones and capture them.
    /// Nothing in `scene` changes.
    pub fn init(
        scene: &Scene,
        pose: Action,
        options: &BlendOptions,
        gesture: &GestureContext,
        locks: &EvalLocks,
    ) -> Result<Self, PoseError> {
        let object = scene.active_pose_object().ok_or(PoseError::NoPoseContext)?;
        if object.linked {
            return Err(PoseError::LinkedData {
                object: object.name.clone(),
            });
        }

        let pose = if options.flipped { flip_action(&pose) } else { pose };
        let selected_only = object.pose.any_selected();
        let bones: Vec<String> = pose
            .bone_names()
            .into_iter()
            .filter(|name| {
                object
                    .pose
                    .bone(name)
                    .is_some_and(|b| b.selected || !selected_only)
            })
            .map(str::to_string)
            .collect();
        if bones.is_empty() {
            return Err(PoseError::NoAnimatedBones);
        }

        let lock = locks.try_lock(object.id, &object.name)?;
        let keys: Vec<BoneKey> = bones.iter().map(|b| BoneKey::new(object.id, b.clone())).collect();
        let snapshot = PoseSnapshot::capture(scene, &keys);

        debug!(
            "pose blend '{}' started on '{}' ({} bones)",
            pose.name,
            object.name,
            bones.len()
        );

        Ok(Self {
            object: object.id,
            state: BlendState::Blending,
            factor: clamp_factor(options.blend_factor),
            release_confirm: options.release_confirm,
            drag_start_x: gesture.cursor_x,
            region_xmin: gesture.region_xmin,
            region_width: gesture.region_width,
            initiating_key: gesture.initiating_key,
            pose,
            bones,
            snapshot: Some(snapshot),
            lock: Some(lock),
        })
    }

    /// One-shot blend at the configured factor.
    pub fn exec(
        scene: &mut Scene,
        pose: Action,
        options: &BlendOptions,
        locks: &EvalLocks,
        keyframer: &mut dyn Keyframer,
    ) -> Result<(), PoseError> {
        let mut session = Self::init(scene, pose, options, &GestureContext::default(), locks)?;
        session.apply(scene);
        session.confirm(scene, keyframer);
        Ok(())
    }

    pub fn state(&self) -> BlendState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, BlendState::Confirmed | BlendState::Cancelled)
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Bones the blend writes, in pose-action order.
    pub fn bones(&self) -> &[String] {
        &self.bones
    }

    fn assert_running(&self, op: &str) {
        if self.is_finished() {
            panic!("{op} on a pose blend session that already finished ({:?})", self.state);
        }
    }

    fn snapshot(&self) -> &PoseSnapshot {
        match &self.snapshot {
            Some(s) => s,
            None => panic!("pose blend snapshot used after release"),
        }
    }

    /// Set the factor directly (clamped) and redraw.
    pub fn set_factor(&mut self, scene: &mut Scene, factor: f32) {
        self.assert_running("set_factor");
        self.factor = clamp_factor(factor);
        self.apply(scene);
    }

    /// Restore the captured pose, then blend the source on if blending.
    pub fn apply(&self, scene: &mut Scene) {
        self.assert_running("apply");
        self.snapshot().restore(scene);
        if self.state != BlendState::Blending {
            return;
        }
        if let Some(object) = scene.object_mut(self.object) {
            apply_action_blend(object, &self.pose, &self.bones, self.factor);
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
            InputEvent::KeyRelease { key, .. } => {
                if self.release_confirm && Some(key) == self.initiating_key {
                    self.confirm(scene, keyframer);
                    return SessionStatus::Finished(SessionOutcome::Confirmed);
                }
                SessionStatus::Running
            }
            InputEvent::PointerMove { x, .. } => {
                if self.region_width > 0.0 {
                    let origin = if self.release_confirm {
                        self.drag_start_x
                    } else {
                        self.region_xmin
                    };
                    self.factor = clamp_factor((x - origin) / self.region_width);
                    trace!("pose blend factor {:.3}", self.factor);
                    self.apply(scene);
                }
                SessionStatus::Running
            }
            InputEvent::KeyPress { key, .. } => {
                if key.is_confirm() {
                    self.confirm(scene, keyframer);
                    return SessionStatus::Finished(SessionOutcome::Confirmed);
                }
                if key.is_cancel() {
                    self.cancel(scene);
                    return SessionStatus::Finished(SessionOutcome::Cancelled);
                }
                if key == Key::Tab {
                    self.state = match self.state {
                        BlendState::Blending => BlendState::Original,
                        _ => BlendState::Blending,
                    };
                    self.apply(scene);
                }
                SessionStatus::Running
            }
        }
    }

    /// Unlock, key the participating channels and keep the pose as shown.
    pub fn confirm(&mut self, scene: &mut Scene, keyframer: &mut dyn Keyframer) {
        self.assert_running("confirm");
        self.lock = None;

        let channels: Vec<(CurvePath, usize)> = self
            .pose
            .curves
            .iter()
            .filter(|c| self.bones.contains(&c.path.bone))
            .map(|c| (c.path.clone(), c.array_index))
            .collect();
        let frame = scene.current_frame;
        if let Some(object) = scene.object_mut(self.object) {
            if object.action.as_ref().is_some_and(|a| a.linked) {
                warn!("action on '{}' is linked; pose not keyed", object.name);
            } else {
                let keyed = auto_key_channels(keyframer, object, &channels, frame);
                debug!("pose blend confirmed on '{}': keyed {keyed} channels", object.name);
            }
        }

        if let Some(snapshot) = self.snapshot.take() {
            snapshot.release();
        }
        self.state = BlendState::Confirmed;
    }

    /// Unlock and put the captured pose back.
    pub fn cancel(&mut self, scene: &mut Scene) {
        self.assert_running("cancel");
        self.lock = None;
        if let Some(snapshot) = self.snapshot.take() {
            snapshot.restore(scene);
            snapshot.release();
        }
        debug!("pose blend cancelled");
        self.state = BlendState::Cancelled;
    }

    pub fn status_text(&self) -> String {
        let shown = match self.state {
            BlendState::Original => " (showing original)",
            _ => "",
        };
        format!(
            "Blend Pose '{}': {:.0}%{shown} | Tab: toggle original",
            self.pose.name,
            self.factor * 100.0
        )
    }
}
