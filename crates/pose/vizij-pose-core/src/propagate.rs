//! Propagate: copy the current pose value onto later keyframes.
//!
//! One-shot. For every selected, animated bone each curve's keys from the
//! current frame onward are considered; which of them get overwritten depends
//! on [`PropagateMode`]. Overwritten keys take the value the bone has right
//! now, get flat handles and are selected. Keys before the current frame are
//! never touched.
//!
//! Propagate refuses to run while any affected object is held by a live
//! session, since the session's snapshot would be out of date once keys move.

use log::{debug, warn};

use crate::channel_map::{ChannelCurveMap, ChannelLink};
use crate::config::{Config, PropagateMode, PropagateOptions};
use crate::curve::{Action, FCurve};
use crate::error::PoseError;
use crate::ids::ObjectId;
use crate::keyframe_index::KeyframeIndex;
use crate::lock::EvalLocks;
use crate::pose::{FrameRemap, PoseBone, PoseObject, Scene};

/// Propagate the selected bones' current values. Returns the number of keys written.
///
/// Fails with [`PoseError::ObjectBusy`] before touching anything when one of
/// the objects is locked in `locks`.
pub fn propagate(
    scene: &mut Scene,
    options: &PropagateOptions,
    locks: &EvalLocks,
    config: &Config,
) -> Result<usize, PoseError> {
    let ids: Vec<ObjectId> = scene.pose_objects().map(|o| o.id).collect();
    if ids.is_empty() {
        return Err(PoseError::NoPoseContext);
    }
    if let Some(linked) = scene.pose_objects().find(|o| o.linked) {
        return Err(PoseError::LinkedData {
            object: linked.name.clone(),
        });
    }
    let map = ChannelCurveMap::from_selection(scene, &ids);
    if map.is_empty() {
        return Err(PoseError::NoAnimatedBones);
    }
    let mut guards = Vec::new();
    for id in map.objects() {
        let name = scene.object(id).map_or("", |o| o.name.as_str());
        guards.push(locks.try_lock(id, name)?);
    }

    let threshold = config.frame_threshold;
    let current_frame = scene.current_frame;
    let marker_frames: Vec<i32> = scene
        .markers
        .iter()
        .filter(|m| m.selected)
        .map(|m| m.frame)
        .collect();

    let mut written = 0;
    for (key, link) in map.iter() {
        let Some(object) = scene.object_mut(key.object) else {
            continue;
        };
        let remap = object.frame_remap;
        let PoseObject { pose, action, .. } = object;
        let (Some(action), Some(bone)) = (action.as_mut(), pose.bone(&key.bone)) else {
            continue;
        };

        let start = remap.to_action(current_frame);
        let end = match options.mode {
            PropagateMode::WhileHeld => hold_end_frame(action, link, start, threshold),
            PropagateMode::BeforeFrame => remap.to_action(options.end_frame),
            _ => f32::INFINITY,
        };
        let rule = KeyRule {
            mode: options.mode,
            start,
            end,
            remap,
            markers: &marker_frames,
            threshold,
        };
        written += propagate_bone(action, link, bone, &rule);
    }

    drop(guards);
    debug!("propagate {:?}: wrote {written} keys", options.mode);
    Ok(written)
}

struct KeyRule<'a> {
    mode: PropagateMode,
    /// Current frame, action time.
    start: f32,
    /// Last frame that may be written, action time.
    end: f32,
    remap: FrameRemap,
    markers: &'a [i32],
    threshold: f32,
}

fn propagate_bone(action: &mut Action, link: &ChannelLink, bone: &PoseBone, rule: &KeyRule<'_>) -> usize {
    let mut written = 0;
    for &ci in &link.curves {
        let Some(curve) = action.curves.get_mut(ci) else {
            continue;
        };
        if curve.keys.len() < 2 {
            warn!("curve {}[{}] has fewer than two keys; skipping", curve.path, curve.array_index);
            continue;
        }
        let Some(value) = bone.channel_value(&curve.path.property, curve.array_index) else {
            continue;
        };
        written += propagate_curve(curve, value, rule);
    }
    written
}

fn propagate_curve(curve: &mut FCurve, value: f32, rule: &KeyRule<'_>) -> usize {
    let first = curve.keys.partition_point(|k| k.frame < rule.start - rule.threshold);
    let last = curve.keys.len() - 1;
    let mut written = 0;

    for i in first..curve.keys.len() {
        let frame = curve.keys[i].frame;
        match rule.mode {
            PropagateMode::WhileHeld | PropagateMode::BeforeFrame => {
                if frame > rule.end + rule.threshold {
                    break;
                }
            }
            PropagateMode::NextKey => {
                if written > 0 {
                    break;
                }
            }
            PropagateMode::LastKey => {
                if i != last {
                    continue;
                }
            }
            PropagateMode::SelectedMarkers => {
                let scene_frame = rule.remap.to_scene(frame).round() as i32;
                if !rule.markers.contains(&scene_frame) {
                    continue;
                }
            }
            PropagateMode::SelectedKeys => {
                if !curve.keys[i].selected {
                    continue;
                }
            }
            PropagateMode::BeforeEnd => {}
        }

        let key = &mut curve.keys[i];
        key.set_flat(value);
        key.selected = true;
        written += 1;
    }
    written
}

/// Last frame of the static hold containing (or starting at) `start`, across all
/// of the bone's curves. Returns `start` when the bone is moving there.
/// Keys closer than `threshold` count as one column.
pub fn hold_end_frame(action: &Action, link: &ChannelLink, start: f32, threshold: f32) -> f32 {
    let curves: Vec<&FCurve> = link.curves(action).filter(|c| c.keys.len() >= 2).collect();
    let columns = KeyframeIndex::from_curves(curves.iter().copied(), |f| f, threshold);
    let span = Span {
        curves: &curves,
        frames: columns.frames(),
        threshold: columns.threshold(),
    };
    let frames = span.frames;

    let exact = frames.iter().position(|f| (f - start).abs() < span.threshold);
    let block = match exact {
        Some(i) => Some(i),
        None => {
            let next = frames.partition_point(|f| *f < start);
            if next < frames.len() && span.is_hold(next) {
                Some(next)
            } else {
                next.checked_sub(1)
            }
        }
    };

    let Some(mut block) = block.filter(|&b| span.is_hold(b)) else {
        return start;
    };
    while block + 1 < frames.len() && span.is_hold(block + 1) && span.spanning(block) == span.spanning(block + 1) {
        block += 1;
    }
    frames[block + 1]
}

/// A bone's curves against their merged key columns.
struct Span<'a> {
    curves: &'a [&'a FCurve],
    frames: &'a [f32],
    threshold: f32,
}

impl Span<'_> {
    /// Key segment `(a, a + 1)` of `curve` covering the column span `[from, to]`.
    fn segment(&self, curve: &FCurve, from: f32, to: f32) -> Option<usize> {
        let a = curve
            .keys
            .partition_point(|k| k.frame <= from + self.threshold)
            .checked_sub(1)?;
        let b = curve.keys.get(a + 1)?;
        (b.frame >= to - self.threshold).then_some(a)
    }

    fn bounds(&self, block: usize) -> Option<(f32, f32)> {
        Some((*self.frames.get(block)?, *self.frames.get(block + 1)?))
    }

    fn spanning(&self, block: usize) -> usize {
        match self.bounds(block) {
            Some((from, to)) => self
                .curves
                .iter()
                .filter(|c| self.segment(c, from, to).is_some())
                .count(),
            None => 0,
        }
    }

    /// The span from column `block` to the next column holds still on every curve crossing it.
    fn is_hold(&self, block: usize) -> bool {
        let Some((from, to)) = self.bounds(block) else {
            return false;
        };
        let mut spanning = 0;
        for curve in self.curves {
            if let Some(a) = self.segment(curve, from, to) {
                if !curve.segment_is_static(a, a + 1) {
                    return false;
                }
                spanning += 1;
            }
        }
        spanning > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_map::link_bone;
    use crate::curve::Keyframe;
    use crate::keyframe_index::FRAME_THRESHOLD;
    use crate::path::{ChannelProperty, CurvePath};

    fn action(keys: &[(f32, f32)]) -> Action {
        let curve = FCurve::new(CurvePath::new("Arm", ChannelProperty::Location), 0)
            .with_keys(keys.iter().map(|&(f, v)| Keyframe::new(f, v)).collect());
        Action::new("act").with_curve(curve)
    }

    #[test]
    fn hold_end_follows_static_blocks() {
        let act = action(&[(1.0, 0.0), (10.0, 5.0), (20.0, 5.0), (30.0, 5.0), (40.0, 9.0)]);
        let link = link_bone(&act, "Arm");
        assert_eq!(hold_end_frame(&act, &link, 10.0, FRAME_THRESHOLD), 30.0);
        // Between keys inside a hold.
        assert_eq!(hold_end_frame(&act, &link, 15.0, FRAME_THRESHOLD), 30.0);
        // Just before a hold: the hold ahead is used.
        assert_eq!(hold_end_frame(&act, &link, 5.0, FRAME_THRESHOLD), 30.0);
        // Inside a moving segment with no hold ahead.
        assert_eq!(hold_end_frame(&act, &link, 35.0, FRAME_THRESHOLD), 35.0);
    }

    #[test]
    fn hold_needs_every_spanning_curve_static() {
        let mut act = action(&[(0.0, 1.0), (10.0, 1.0)]);
        act.curves.push(
            FCurve::new(CurvePath::new("Arm", ChannelProperty::Location), 1)
                .with_keys(vec![Keyframe::new(0.0, 0.0), Keyframe::new(10.0, 2.0)]),
        );
        let link = link_bone(&act, "Arm");
        assert_eq!(hold_end_frame(&act, &link, 0.0, FRAME_THRESHOLD), 0.0);
    }

    #[test]
    fn wider_threshold_joins_near_columns() {
        // 10 and 10.4 collapse into one column, so the hold runs 10..30.
        let mut act = action(&[(1.0, 0.0), (10.0, 5.0), (30.0, 5.0), (40.0, 9.0)]);
        act.curves.push(
            FCurve::new(CurvePath::new("Arm", ChannelProperty::Location), 1)
                .with_keys(vec![Keyframe::new(10.4, 2.0), Keyframe::new(30.0, 2.0)]),
        );
        let link = link_bone(&act, "Arm");
        assert_eq!(hold_end_frame(&act, &link, 10.0, 1.0), 30.0);
    }
}
