//! Custom property values.
//!
//! Custom bone properties are a closed set of kinds. Blending always happens in
//! float space; the result is converted back to the property's own kind.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum PropValue {
    Float(f32),
    Int(i32),
    Bool(bool),
}

impl PropValue {
    /// Value as seen by a curve.
    #[inline]
    pub fn as_f32(&self) -> f32 {
        match self {
            PropValue::Float(v) => *v,
            PropValue::Int(v) => *v as f32,
            PropValue::Bool(v) => {
                if *v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Same kind as `self`, holding `v`. Ints truncate toward zero; bools are
    /// true when the truncated value is non-zero.
    #[inline]
    pub fn with_f32(&self, v: f32) -> PropValue {
        match self {
            PropValue::Float(_) => PropValue::Float(v),
            PropValue::Int(_) => PropValue::Int(v as i32),
            PropValue::Bool(_) => PropValue::Bool(v as i32 != 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_follow_property_kind() {
        assert_eq!(PropValue::Int(3).with_f32(4.9), PropValue::Int(4));
        assert_eq!(PropValue::Int(3).with_f32(-1.7), PropValue::Int(-1));
        assert_eq!(PropValue::Bool(true).with_f32(0.6), PropValue::Bool(false));
        assert_eq!(PropValue::Bool(false).with_f32(1.2), PropValue::Bool(true));
        assert_eq!(PropValue::Float(0.0).with_f32(0.25), PropValue::Float(0.25));
        assert_eq!(PropValue::Bool(true).as_f32(), 1.0);
    }
}
