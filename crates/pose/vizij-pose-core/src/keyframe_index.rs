//! Sorted keyframe-time index with neighbour lookups.
//!
//! Built once from one or more curves, immutable afterwards. Frames closer than
//! the comparison threshold collapse into one column. Lookups are binary
//! searches over the sorted column list.
//!
//! An index holding fewer than two columns answers every lookup with `None`;
//! callers fall back to `t - 1` / `t + 1`.

use crate::curve::FCurve;

/// Default distance under which two frames are the same keyframe column.
pub const FRAME_THRESHOLD: f32 = 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeIndex {
    frames: Vec<f32>,
    threshold: f32,
}

impl Default for KeyframeIndex {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            threshold: FRAME_THRESHOLD,
        }
    }
}

impl KeyframeIndex {
    /// Build from arbitrary frames (any order, duplicates allowed). Frames
    /// closer than `threshold` merge into the first of them.
    pub fn from_frames<I: IntoIterator<Item = f32>>(frames: I, threshold: f32) -> Self {
        let threshold = if threshold.is_finite() { threshold.max(0.0) } else { FRAME_THRESHOLD };
        let mut frames: Vec<f32> = frames.into_iter().filter(|f| f.is_finite()).collect();
        frames.sort_by(f32::total_cmp);
        frames.dedup_by(|b, a| (*b - *a).abs() < threshold);
        Self { frames, threshold }
    }

    /// Merged columns of several curves, each key frame passed through `map`
    /// (e.g. action time to scene time).
    pub fn from_curves<'a, I, F>(curves: I, map: F, threshold: f32) -> Self
    where
        I: IntoIterator<Item = &'a FCurve>,
        F: Fn(f32) -> f32,
    {
        Self::from_frames(
            curves
                .into_iter()
                .flat_map(|c| c.keys.iter().map(|k| k.frame))
                .map(map),
            threshold,
        )
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[f32] {
        &self.frames
    }

    #[inline]
    fn searchable(&self) -> bool {
        self.frames.len() >= 2
    }

    /// Column at `t` within the threshold.
    pub fn find_exact(&self, t: f32) -> Option<f32> {
        if !self.searchable() {
            return None;
        }
        let idx = self.frames.partition_point(|f| *f < t - self.threshold);
        self.frames
            .get(idx)
            .copied()
            .filter(|f| (f - t).abs() < self.threshold)
    }

    /// Nearest column strictly before `t`.
    pub fn prev(&self, t: f32) -> Option<f32> {
        if !self.searchable() {
            return None;
        }
        let idx = self.frames.partition_point(|f| *f <= t - self.threshold);
        idx.checked_sub(1).map(|i| self.frames[i])
    }

    /// Nearest column strictly after `t`.
    pub fn next(&self, t: f32) -> Option<f32> {
        if !self.searchable() {
            return None;
        }
        let idx = self.frames.partition_point(|f| *f < t + self.threshold);
        self.frames.get(idx).copied()
    }

    /// Reference columns around `t`: the neighbours of the key at `t` when one
    /// exists, otherwise the closest columns on either side.
    pub fn neighbors(&self, t: f32) -> (Option<f32>, Option<f32>) {
        let anchor = self.find_exact(t).unwrap_or(t);
        (self.prev(anchor), self.next(anchor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_around_existing_key() {
        let idx = KeyframeIndex::from_frames([20.0, 1.0, 10.0, 10.004, 30.0], FRAME_THRESHOLD);
        assert_eq!(idx.frames(), &[1.0, 10.0, 20.0, 30.0]);
        assert_eq!(idx.find_exact(10.0), Some(10.0));
        assert_eq!(idx.neighbors(10.0), (Some(1.0), Some(20.0)));
        assert_eq!(idx.neighbors(15.0), (Some(10.0), Some(20.0)));
        assert_eq!(idx.find_exact(15.0), None);
    }

    #[test]
    fn lookups_past_the_ends() {
        let idx = KeyframeIndex::from_frames([5.0, 8.0], FRAME_THRESHOLD);
        assert_eq!(idx.neighbors(2.0), (None, Some(5.0)));
        assert_eq!(idx.neighbors(8.0), (Some(5.0), None));
        assert_eq!(idx.neighbors(50.0), (Some(8.0), None));
    }

    #[test]
    fn single_key_index_fails_gracefully() {
        let idx = KeyframeIndex::from_frames([5.0], FRAME_THRESHOLD);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.find_exact(5.0), None);
        assert_eq!(idx.neighbors(7.0), (None, None));
    }

    #[test]
    fn wider_threshold_merges_near_keys() {
        let idx = KeyframeIndex::from_frames([0.0, 10.0, 10.5, 20.0], 1.0);
        assert_eq!(idx.frames(), &[0.0, 10.0, 20.0]);
        assert_eq!(idx.find_exact(10.4), Some(10.0));
        assert_eq!(idx.neighbors(10.4), (Some(0.0), Some(20.0)));
    }
}
