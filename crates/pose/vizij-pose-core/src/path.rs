//! Curve path parsing and formatting.
//!
//! Grammar:
//!   pose.bones["<bone>"].<property>
//!   pose.bones["<bone>"]["<custom property>"]
//! - `<property>` is one of the transform arrays (`location`, `rotation_quaternion`,
//!   `rotation_euler`, `rotation_axis_angle`, `scale`) or a bendy-bone scalar
//!   (`bbone_curveinx`, `bbone_easein`, ...).
//! - Quoted segments escape `"` and `\` with a backslash.
//!
//! The component of an array property is not part of the path; curves carry it as
//! `array_index`.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::channel_map::TransformFlags;
use crate::error::PoseError;
use crate::pose::BBoneProp;

const BONES_PREFIX: &str = "pose.bones[";

/// Animatable sub-property of a pose bone.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelProperty {
    Location,
    RotationQuaternion,
    RotationEuler,
    RotationAxisAngle,
    Scale,
    BBone(BBoneProp),
    Custom(String),
}

impl ChannelProperty {
    /// Resolve a built-in property name. Custom properties never resolve here.
    pub fn from_rna_name(name: &str) -> Option<Self> {
        match name {
            "location" => Some(ChannelProperty::Location),
            "rotation_quaternion" => Some(ChannelProperty::RotationQuaternion),
            "rotation_euler" => Some(ChannelProperty::RotationEuler),
            "rotation_axis_angle" => Some(ChannelProperty::RotationAxisAngle),
            "scale" => Some(ChannelProperty::Scale),
            other => BBoneProp::from_name(other).map(ChannelProperty::BBone),
        }
    }

    /// Number of curve components (`array_index` range) for this property.
    pub fn array_len(&self) -> usize {
        match self {
            ChannelProperty::Location | ChannelProperty::RotationEuler | ChannelProperty::Scale => 3,
            ChannelProperty::RotationQuaternion | ChannelProperty::RotationAxisAngle => 4,
            ChannelProperty::BBone(_) | ChannelProperty::Custom(_) => 1,
        }
    }

    pub fn transform_flag(&self) -> TransformFlags {
        match self {
            ChannelProperty::Location => TransformFlags::LOCATION,
            ChannelProperty::RotationQuaternion
            | ChannelProperty::RotationEuler
            | ChannelProperty::RotationAxisAngle => TransformFlags::ROTATION,
            ChannelProperty::Scale => TransformFlags::SCALE,
            ChannelProperty::BBone(_) => TransformFlags::BBONE,
            ChannelProperty::Custom(_) => TransformFlags::CUSTOM,
        }
    }
}

/// Parsed curve path addressing one property of one pose bone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurvePath {
    pub bone: String,
    pub property: ChannelProperty,
}

impl CurvePath {
    pub fn new(bone: impl Into<String>, property: ChannelProperty) -> Self {
        Self {
            bone: bone.into(),
            property,
        }
    }

    /// Parse a path string according to the grammar described above.
    pub fn parse(s: &str) -> Result<Self, PoseError> {
        let err = |reason: &str| PoseError::InvalidPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s
            .strip_prefix(BONES_PREFIX)
            .ok_or_else(|| err("expected pose.bones[\"...\"] prefix"))?;
        let (bone, rest) = read_quoted(rest).ok_or_else(|| err("unterminated bone name"))?;
        if bone.is_empty() {
            return Err(err("empty bone name"));
        }
        let rest = rest
            .strip_prefix(']')
            .ok_or_else(|| err("expected ']' after bone name"))?;

        let property = if let Some(field) = rest.strip_prefix('.') {
            ChannelProperty::from_rna_name(field).ok_or_else(|| err("unknown bone property"))?
        } else if let Some(inner) = rest.strip_prefix('[') {
            let (name, tail) = read_quoted(inner).ok_or_else(|| err("unterminated property name"))?;
            if name.is_empty() {
                return Err(err("empty custom property name"));
            }
            if tail != "]" {
                return Err(err("trailing characters after custom property"));
            }
            ChannelProperty::Custom(name)
        } else {
            return Err(err("missing property"));
        };

        Ok(CurvePath {
            bone,
            property,
        })
    }
}

/// Read a `"..."` segment, returning its unescaped body and the remaining input.
fn read_quoted(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                out.push(escaped);
            }
            '"' => return Some((out, &body[i + 1..])),
            _ => out.push(c),
        }
    }
    None
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

impl fmt::Display for CurvePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(BONES_PREFIX)?;
        write_quoted(f, &self.bone)?;
        f.write_str("]")?;
        match &self.property {
            ChannelProperty::Location => f.write_str(".location"),
            ChannelProperty::RotationQuaternion => f.write_str(".rotation_quaternion"),
            ChannelProperty::RotationEuler => f.write_str(".rotation_euler"),
            ChannelProperty::RotationAxisAngle => f.write_str(".rotation_axis_angle"),
            ChannelProperty::Scale => f.write_str(".scale"),
            ChannelProperty::BBone(prop) => write!(f, ".{}", prop.name()),
            ChannelProperty::Custom(name) => {
                f.write_str("[")?;
                write_quoted(f, name)?;
                f.write_str("]")
            }
        }
    }
}

impl FromStr for CurvePath {
    type Err = PoseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurvePath::parse(s)
    }
}

// Serde support: serialize as string, deserialize from string
impl Serialize for CurvePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CurvePath {
    fn deserialize<D>(deserializer: D) -> Result<CurvePath, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CurvePath::parse(&s).map_err(de::Error::custom)
    }
}
