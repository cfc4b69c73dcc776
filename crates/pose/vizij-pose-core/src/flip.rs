//! Left/right mirroring of bone names and pose actions.
//!
//! Values are mirrored across the X = 0 plane, assuming a rig whose rest pose
//! is symmetric about it.

use crate::curve::{Action, FCurve};
use crate::path::{ChannelProperty, CurvePath};

#[inline]
fn is_separator(c: char) -> bool {
    matches!(c, '.' | '_' | '-' | ' ')
}

#[inline]
fn flip_side_char(c: char) -> Option<char> {
    match c {
        'L' => Some('R'),
        'R' => Some('L'),
        'l' => Some('r'),
        'r' => Some('l'),
        _ => None,
    }
}

const SIDE_WORDS: [(&str, &str); 6] = [
    ("Left", "Right"),
    ("Right", "Left"),
    ("left", "right"),
    ("right", "left"),
    ("LEFT", "RIGHT"),
    ("RIGHT", "LEFT"),
];

/// Split a trailing `.001`-style number off `name`.
fn split_number_suffix(name: &str) -> (&str, &str) {
    if let Some(dot) = name.rfind('.') {
        let digits = &name[dot + 1..];
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return name.split_at(dot);
        }
    }
    (name, "")
}

fn flip_base(base: &str) -> Option<String> {
    let chars: Vec<char> = base.chars().collect();
    let n = chars.len();
    if n >= 2 {
        // "Arm.L", "arm_r"
        if is_separator(chars[n - 2]) {
            if let Some(side) = flip_side_char(chars[n - 1]) {
                let mut out: String = chars[..n - 1].iter().collect();
                out.push(side);
                return Some(out);
            }
        }
        // "L.Arm", "r_arm"
        if is_separator(chars[1]) {
            if let Some(side) = flip_side_char(chars[0]) {
                let mut out = String::with_capacity(base.len());
                out.push(side);
                out.extend(&chars[1..]);
                return Some(out);
            }
        }
    }
    for (from, to) in SIDE_WORDS {
        if let Some(rest) = base.strip_prefix(from) {
            return Some(format!("{to}{rest}"));
        }
    }
    for (from, to) in SIDE_WORDS {
        if let Some(rest) = base.strip_suffix(from) {
            return Some(format!("{rest}{to}"));
        }
    }
    None
}

/// Mirror the side marker of a bone name. Names without one come back unchanged.
pub fn flip_side_name(name: &str) -> String {
    let (base, number) = split_number_suffix(name);
    match flip_base(base) {
        Some(flipped) => format!("{flipped}{number}"),
        None => name.to_string(),
    }
}

/// Sign applied to component `index` of `prop` when mirroring across X.
pub fn mirror_sign(prop: &ChannelProperty, index: usize) -> f32 {
    let negate = match prop {
        ChannelProperty::Location => index == 0,
        // [w, x, y, z] and [angle, x, y, z]
        ChannelProperty::RotationQuaternion | ChannelProperty::RotationAxisAngle => {
            index == 2 || index == 3
        }
        ChannelProperty::RotationEuler => index == 1 || index == 2,
        _ => false,
    };
    if negate {
        -1.0
    } else {
        1.0
    }
}

fn flip_curve(curve: &FCurve) -> FCurve {
    let sign = mirror_sign(&curve.path.property, curve.array_index);
    let mut out = FCurve::new(
        CurvePath::new(flip_side_name(&curve.path.bone), curve.path.property.clone()),
        curve.array_index,
    );
    out.keys = curve
        .keys
        .iter()
        .map(|k| {
            let mut k = k.clone();
            k.value *= sign;
            if let Some(h) = k.handle_left.as_mut() {
                h[1] *= sign;
            }
            if let Some(h) = k.handle_right.as_mut() {
                h[1] *= sign;
            }
            k
        })
        .collect();
    out
}

/// Mirrored copy of a pose action.
pub fn flip_action(action: &Action) -> Action {
    Action {
        name: action.name.clone(),
        linked: false,
        curves: action.curves.iter().map(flip_curve).collect(),
    }
}
