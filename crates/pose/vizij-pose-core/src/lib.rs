//! Vizij Pose Core (engine-agnostic)
//!
//! Interactive pose editing over keyframed rigs:
//! - slide sessions (push, relax, breakdown, rest-pose push/relax) between the
//!   keyframes around the playhead,
//! - pose-asset blend sessions with release-confirm and left/right flipping,
//! - propagate of the current pose onto later keys.
//!
//! Sessions are previewed non-destructively: every update restores a pose
//! snapshot before re-applying, cancel restores it, confirm auto-keys.

pub mod blend_math;
pub mod blend_session;
pub mod channel_map;
pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod event;
pub mod flip;
pub mod ids;
pub mod keyframe_index;
pub mod keying;
pub mod lock;
pub mod math;
pub mod path;
pub mod pose;
pub mod pose_apply;
pub mod propagate;
pub mod slide;
pub mod snapshot;
pub mod stored_scene;
pub mod value;

// Re-exports for consumers (hosts and adapters)
pub use blend_session::{BlendSession, BlendState, InMemoryLibrary, PoseLibrary, PoseSource};
pub use channel_map::{ChannelCurveMap, ChannelLink, TransformFlags};
pub use config::{
    AxisLock, BlendOptions, ChannelMask, Config, PropagateMode, PropagateOptions, SlideMode, SlideOptions,
};
pub use curve::{Action, FCurve, Interpolation, Keyframe};
pub use engine::PoseEngine;
pub use error::PoseError;
pub use event::{GestureContext, InputEvent, Key, Modifiers, SessionOutcome, SessionStatus};
pub use flip::{flip_action, flip_side_name};
pub use ids::{BoneKey, ObjectId, SessionHandle};
pub use keyframe_index::KeyframeIndex;
pub use keying::{ActionKeyframer, Keyframer};
pub use lock::{EvalLockGuard, EvalLocks};
pub use path::{ChannelProperty, CurvePath};
pub use pose::{BBoneProp, BBoneShape, EulerOrder, FrameRemap, Marker, Pose, PoseBone, PoseObject, Rotation, Scene};
pub use pose_apply::apply_action_blend;
pub use propagate::propagate;
pub use slide::{SlideSession, SlideState};
pub use snapshot::PoseSnapshot;
pub use stored_scene::{parse_action_json, parse_scene_json};
pub use value::PropValue;
