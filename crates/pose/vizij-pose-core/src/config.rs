//! Engine tunables and per-operation settings.

use serde::{Deserialize, Serialize};

use crate::keyframe_index::FRAME_THRESHOLD;

/// Gesture tuning shared by every session of an engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Horizontal pointer travel (pixels) that moves the slide factor from 0 to 1.
    pub slide_pixel_distance: f32,
    /// Pointer deltas are divided by this while Shift is held.
    pub precision_divisor: f32,
    /// Step the factor snaps to while Ctrl is held.
    pub increment: f32,
    /// Frames closer than this are the same keyframe column.
    pub frame_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slide_pixel_distance: 300.0,
            precision_divisor: 8.0,
            increment: 0.1,
            frame_threshold: FRAME_THRESHOLD,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlideMode {
    /// Exaggerate the pose away from the interpolated neighbours.
    Push,
    /// Soften the pose toward the interpolated neighbours.
    Relax,
    /// In-between of the neighbours at the slide percentage.
    Breakdown,
    /// Exaggerate away from the rest pose.
    PushRest,
    /// Move toward the rest pose.
    RelaxRest,
}

impl SlideMode {
    pub fn is_rest(self) -> bool {
        matches!(self, SlideMode::PushRest | SlideMode::RelaxRest)
    }

    pub fn label(self) -> &'static str {
        match self {
            SlideMode::Push => "Push Pose",
            SlideMode::Relax => "Relax Pose",
            SlideMode::Breakdown => "Breakdowner",
            SlideMode::PushRest => "Push Pose (Rest Pose)",
            SlideMode::RelaxRest => "Relax Pose (Rest Pose)",
        }
    }
}

/// Which transform group a slide affects.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelMask {
    #[default]
    All,
    Loc,
    Rot,
    Scale,
    #[serde(rename = "BBONE")]
    BBone,
    Custom,
}

impl ChannelMask {
    /// Axis locks only mean something for the vector transform groups.
    pub fn allows_axis_lock(self) -> bool {
        matches!(self, ChannelMask::Loc | ChannelMask::Rot | ChannelMask::Scale)
    }

    pub fn label(self) -> &'static str {
        match self {
            ChannelMask::All => "All",
            ChannelMask::Loc => "Location",
            ChannelMask::Rot => "Rotation",
            ChannelMask::Scale => "Scale",
            ChannelMask::BBone => "Bendy Bones",
            ChannelMask::Custom => "Custom Properties",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AxisLock {
    #[default]
    Free,
    X,
    Y,
    Z,
}

impl AxisLock {
    /// Whether component `index` of a vector channel passes the lock.
    #[inline]
    pub fn allows(self, index: usize) -> bool {
        match self {
            AxisLock::Free => true,
            AxisLock::X => index == 0,
            AxisLock::Y => index == 1,
            AxisLock::Z => index == 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SlideOptions {
    pub percentage: f32,
    /// Explicit reference frames; searched from the keyframes when absent.
    pub prev_frame: Option<i32>,
    pub next_frame: Option<i32>,
    pub channels: ChannelMask,
    pub axis_lock: AxisLock,
}

impl Default for SlideOptions {
    fn default() -> Self {
        Self {
            percentage: 0.5,
            prev_frame: None,
            next_frame: None,
            channels: ChannelMask::All,
            axis_lock: AxisLock::Free,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlendOptions {
    pub blend_factor: f32,
    /// Mirror the pose left/right before blending.
    pub flipped: bool,
    /// Releasing the initiating button confirms.
    pub release_confirm: bool,
}

impl Default for BlendOptions {
    fn default() -> Self {
        Self {
            blend_factor: 1.0,
            flipped: false,
            release_confirm: false,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropagateMode {
    /// Keys until the end of the static hold the current frame sits in.
    #[default]
    WhileHeld,
    NextKey,
    LastKey,
    /// Keys up to and including `end_frame`.
    BeforeFrame,
    BeforeEnd,
    SelectedKeys,
    SelectedMarkers,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PropagateOptions {
    pub mode: PropagateMode,
    pub end_frame: f32,
}

impl Default for PropagateOptions {
    fn default() -> Self {
        Self {
            mode: PropagateMode::WhileHeld,
            end_frame: 250.0,
        }
    }
}
