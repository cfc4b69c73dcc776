//! Numeric routines behind the slide modes. All functions are pure.
//!
//! Push and relax iterate a weighted average `ceil(10 * percentage)` times. The
//! iteration count sets the convergence rate animators are used to, so it is
//! kept exactly as is.

use crate::config::SlideMode;
use crate::math::{add_scaled4, interp_quat, make_compatible_quat, normalize_quat, sub4};

/// Normalized influence of the previous/next reference frame: `(w1, w2)` where
/// `w1` grows as `cframe` approaches `next` and `w2` as it approaches `prev`.
/// Coincident frames weigh both halves equally.
pub fn frame_weights(cframe: f32, prev: f32, next: f32) -> (f32, f32) {
    let w1 = cframe - prev;
    let w2 = next - cframe;
    let total = w1 + w2;
    if total != 0.0 {
        (w1 / total, w2 / total)
    } else {
        (0.5, 0.5)
    }
}

/// Weights for `mode`: breakdown reads them straight from the percentage.
pub fn mode_weights(mode: SlideMode, percentage: f32, cframe: f32, prev: f32, next: f32) -> (f32, f32) {
    match mode {
        SlideMode::Breakdown => (percentage, 1.0 - percentage),
        _ => frame_weights(cframe, prev, next),
    }
}

#[inline]
pub fn iterations(percentage: f32) -> u32 {
    (10.0 * percentage).ceil().max(0.0) as u32
}

/// Move `v` away from the weighted average of `start`/`end`.
pub fn push_value(start: f32, end: f32, mut v: f32, w1: f32, w2: f32, percentage: f32) -> f32 {
    for _ in 0..iterations(percentage) {
        v = (-(start * w2 + end * w1) + v * 6.0) / 5.0;
    }
    v
}

/// Move `v` toward the weighted average of `start`/`end`.
pub fn relax_value(start: f32, end: f32, mut v: f32, w1: f32, w2: f32, percentage: f32) -> f32 {
    for _ in 0..iterations(percentage) {
        v = ((start * w2 + end * w1) + v * 5.0) / 6.0;
    }
    v
}

#[inline]
pub fn breakdown_value(start: f32, end: f32, percentage: f32) -> f32 {
    start * (1.0 - percentage) + end * percentage
}

/// Scalar result for the neighbour modes. Rest modes leave `v` untouched;
/// see [`rest_value`].
pub fn slide_value(mode: SlideMode, start: f32, end: f32, v: f32, weights: (f32, f32), percentage: f32) -> f32 {
    let (w1, w2) = weights;
    match mode {
        SlideMode::Push => push_value(start, end, v, w1, w2, percentage),
        SlideMode::Relax => relax_value(start, end, v, w1, w2, percentage),
        SlideMode::Breakdown => start * w2 + end * w1,
        SlideMode::PushRest | SlideMode::RelaxRest => v,
    }
}

/// Single-pass move toward (relax) or away from (push) the rest value.
pub fn rest_value(mode: SlideMode, v: f32, rest: f32, percentage: f32) -> f32 {
    let diff = rest - v;
    match mode {
        SlideMode::RelaxRest => v + percentage * diff,
        SlideMode::PushRest => v - percentage * diff,
        _ => v,
    }
}

/// Four-component rest move, used for quaternion and axis-angle rotations.
pub fn rest_vec4(mode: SlideMode, v: [f32; 4], rest: [f32; 4], percentage: f32) -> [f32; 4] {
    [
        rest_value(mode, v[0], rest[0], percentage),
        rest_value(mode, v[1], rest[1], percentage),
        rest_value(mode, v[2], rest[2], percentage),
        rest_value(mode, v[3], rest[3], percentage),
    ]
}

/// Quaternion slide. `interp_t` is the playhead's fraction between the two
/// reference frames (relax only). The result is unit length and lies in the
/// same hemisphere as `current`.
pub fn blend_quat(
    mode: SlideMode,
    start: [f32; 4],
    end: [f32; 4],
    current: [f32; 4],
    percentage: f32,
    interp_t: f32,
) -> [f32; 4] {
    let start = normalize_quat(start);
    let end = normalize_quat(end);
    let curr = normalize_quat(current);

    let out = match mode {
        SlideMode::Breakdown => interp_quat(start, end, percentage),
        SlideMode::Push => {
            let delta = sub4(curr, start);
            add_scaled4(curr, delta, percentage)
        }
        SlideMode::Relax => {
            let reference = interp_quat(start, end, interp_t);
            let mut q = curr;
            for _ in 0..iterations(percentage) {
                q = interp_quat(normalize_quat(q), reference, 1.0 / 6.0);
            }
            q
        }
        SlideMode::PushRest | SlideMode::RelaxRest => curr,
    };

    make_compatible_quat(normalize_quat(out), current)
}
