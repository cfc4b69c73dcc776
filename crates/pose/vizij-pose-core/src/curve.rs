//! Keyframed curves and actions.
//!
//! - Keys are kept sorted by frame (validated on load, maintained on insert).
//! - Evaluation clamps outside the key range (constant extrapolation).
//! - Bezier segments: x(t) is inverted numerically, then y(t) is evaluated.
//!   Missing handles are treated as flat "auto" handles at one third of the
//!   segment width.

use serde::{Deserialize, Serialize};

use crate::math::{cubic_bezier, lerp_f32, solve_bezier_x};
use crate::path::CurvePath;

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Constant,
    Linear,
    #[default]
    Bezier,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
    /// Interpolation of the segment leaving this key.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// `[frame, value]` of the incoming handle.
    #[serde(default)]
    pub handle_left: Option<[f32; 2]>,
    /// `[frame, value]` of the outgoing handle.
    #[serde(default)]
    pub handle_right: Option<[f32; 2]>,
    #[serde(default)]
    pub selected: bool,
}

impl Keyframe {
    pub fn new(frame: f32, value: f32) -> Self {
        Self {
            frame,
            value,
            interpolation: Interpolation::Bezier,
            handle_left: None,
            handle_right: None,
            selected: false,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Set the value and flatten both handles onto it.
    pub fn set_flat(&mut self, value: f32) {
        self.value = value;
        if let Some(h) = self.handle_left.as_mut() {
            h[1] = value;
        }
        if let Some(h) = self.handle_right.as_mut() {
            h[1] = value;
        }
    }

    fn right_handle(&self, next: &Keyframe) -> [f32; 2] {
        let auto = [self.frame + (next.frame - self.frame) / 3.0, self.value];
        let h = self.handle_right.unwrap_or(auto);
        [h[0].clamp(self.frame, next.frame), h[1]]
    }

    fn left_handle(&self, prev: &Keyframe) -> [f32; 2] {
        let auto = [self.frame - (self.frame - prev.frame) / 3.0, self.value];
        let h = self.handle_left.unwrap_or(auto);
        [h[0].clamp(prev.frame, self.frame), h[1]]
    }
}

/// Value of one property component over time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FCurve {
    pub path: CurvePath,
    #[serde(default)]
    pub array_index: usize,
    #[serde(default)]
    pub keys: Vec<Keyframe>,
}

impl FCurve {
    pub fn new(path: CurvePath, array_index: usize) -> Self {
        Self {
            path,
            array_index,
            keys: Vec::new(),
        }
    }

    pub fn with_keys(mut self, keys: Vec<Keyframe>) -> Self {
        self.keys = keys;
        self.keys.sort_by(|a, b| a.frame.total_cmp(&b.frame));
        self
    }

    pub fn is_sorted(&self) -> bool {
        self.keys.windows(2).all(|w| w[0].frame <= w[1].frame)
    }

    /// Evaluate at `frame` (action time). An empty curve evaluates to 0.
    pub fn evaluate(&self, frame: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };
        if frame <= first.frame {
            return first.value;
        }
        if frame >= last.frame {
            return last.value;
        }

        // Index of the first key strictly after `frame`; at least 1 here.
        let hi = self.keys.partition_point(|k| k.frame <= frame);
        let k0 = &self.keys[hi - 1];
        let k1 = &self.keys[hi];
        let span = k1.frame - k0.frame;
        if span <= 0.0 {
            return k1.value;
        }

        match k0.interpolation {
            Interpolation::Constant => k0.value,
            Interpolation::Linear => lerp_f32(k0.value, k1.value, (frame - k0.frame) / span),
            Interpolation::Bezier => {
                let h0 = k0.right_handle(k1);
                let h1 = k1.left_handle(k0);
                let t = solve_bezier_x(k0.frame, h0[0], h1[0], k1.frame, frame);
                cubic_bezier(k0.value, h0[1], h1[1], k1.value, t)
            }
        }
    }

    /// Index of the key within `threshold` of `frame`.
    pub fn key_index_at(&self, frame: f32, threshold: f32) -> Option<usize> {
        let start = self.keys.partition_point(|k| k.frame < frame - threshold);
        self.keys
            .get(start)
            .filter(|k| (k.frame - frame).abs() <= threshold)
            .map(|_| start)
    }

    /// Insert a key, or overwrite the value of the key already within `threshold`.
    /// Returns the index of the written key.
    pub fn insert_or_replace(&mut self, frame: f32, value: f32, threshold: f32) -> usize {
        if let Some(idx) = self.key_index_at(frame, threshold) {
            self.keys[idx].set_flat(value);
            return idx;
        }
        let idx = self.keys.partition_point(|k| k.frame < frame);
        self.keys.insert(idx, Keyframe::new(frame, value));
        idx
    }

    /// True when the segment `[a, b]` holds a constant value: equal key values
    /// at both ends and, for bezier segments, handles level with them.
    pub fn segment_is_static(&self, a: usize, b: usize) -> bool {
        let (k0, k1) = match (self.keys.get(a), self.keys.get(b)) {
            (Some(k0), Some(k1)) => (k0, k1),
            _ => return false,
        };
        if k0.value != k1.value {
            return false;
        }
        if k0.interpolation != Interpolation::Bezier {
            return true;
        }
        k0.right_handle(k1)[1] == k0.value && k1.left_handle(k0)[1] == k1.value
    }
}

/// Named collection of curves bound to one armature.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Action {
    pub name: String,
    /// Action datablock comes from a linked library and can't be keyed.
    #[serde(default)]
    pub linked: bool,
    #[serde(default)]
    pub curves: Vec<FCurve>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            linked: false,
            curves: Vec::new(),
        }
    }

    pub fn with_curve(mut self, curve: FCurve) -> Self {
        self.curves.push(curve);
        self
    }

    pub fn find_curve(&self, path: &CurvePath, array_index: usize) -> Option<&FCurve> {
        self.curves
            .iter()
            .find(|c| c.array_index == array_index && &c.path == path)
    }

    pub fn find_curve_mut(&mut self, path: &CurvePath, array_index: usize) -> Option<&mut FCurve> {
        self.curves
            .iter_mut()
            .find(|c| c.array_index == array_index && &c.path == path)
    }

    /// Curves animating `bone`, in action order.
    pub fn curves_for_bone<'a>(&'a self, bone: &'a str) -> impl Iterator<Item = &'a FCurve> + 'a {
        self.curves.iter().filter(move |c| c.path.bone == bone)
    }

    /// Names of every bone with at least one curve, in first-seen order.
    pub fn bone_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for c in &self.curves {
            if !names.contains(&c.path.bone.as_str()) {
                names.push(&c.path.bone);
            }
        }
        names
    }

    /// `(first, last)` key frame over all curves.
    pub fn frame_range(&self) -> Option<(f32, f32)> {
        self.curves
            .iter()
            .filter_map(|c| Some((c.keys.first()?.frame, c.keys.last()?.frame)))
            .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))
    }
}
