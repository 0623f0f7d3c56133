use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identity of a live engine object.
///
/// The engine owns the object; miniscroll only keeps the handle around as a
/// registry key and hands it back to engine queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(u64);

impl ObjectHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// Engine-wide unique identifier of an object.
///
/// The string form doubles as the name of the object's instance config
/// section, which is how per-object overrides are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Guid(u64);

impl Guid {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Parse the `0x`-prefixed hexadecimal form produced by `Display`.
    pub fn parse(text: &str) -> Option<Self> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(digits, 16).ok().map(Self)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

/// Handle to an engine clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    pub const ZERO: Vector = Vector::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One side of a physics contact: the object and the name of its body part
/// that touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPart {
    pub object: ObjectHandle,
    pub part: String,
}

impl BodyPart {
    pub fn new(object: ObjectHandle, part: impl Into<String>) -> Self {
        Self {
            object,
            part: part.into(),
        }
    }
}

/// Collision as seen from one of the two objects involved.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    /// Name of the receiving object's body part
    pub body_part_name: String,
    /// The other object
    pub collider: ObjectHandle,
    /// Name of the other object's body part
    pub collider_body_part_name: String,
    /// Contact position in world space
    pub position: Vector,
    /// Contact normal
    pub normal: Vector,
}

impl Collision {
    /// Build the record for `own`, colliding with `other`.
    pub fn seen_from(own: &BodyPart, other: &BodyPart, position: Vector, normal: Vector) -> Self {
        Self {
            body_part_name: own.part.clone(),
            collider: other.object,
            collider_body_part_name: other.part.clone(),
            position,
            normal,
        }
    }
}

/// End of a collision as seen from one of the two objects involved.
#[derive(Debug, Clone, PartialEq)]
pub struct Separation {
    pub body_part_name: String,
    pub collider: ObjectHandle,
    pub collider_body_part_name: String,
}

impl Separation {
    pub fn seen_from(own: &BodyPart, other: &BodyPart) -> Self {
        Self {
            body_part_name: own.part.clone(),
            collider: other.object,
            collider_body_part_name: other.part.clone(),
        }
    }
}

/// Type a shader expects back for a parameter query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderParamType {
    Float,
    Vector,
}

/// Value answered to a shader parameter query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderParam {
    Float(f32),
    Vector(Vector),
}

impl ShaderParam {
    pub fn param_type(&self) -> ShaderParamType {
        match self {
            ShaderParam::Float(_) => ShaderParamType::Float,
            ShaderParam::Vector(_) => ShaderParamType::Vector,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_display_is_instance_section_name() {
        let guid = Guid::new(0x1_0000_002A);
        assert_eq!(guid.to_string(), "0x000000010000002A");
        assert_eq!(Guid::parse(&guid.to_string()), Some(guid));
    }

    #[test]
    fn test_guid_parse_rejects_garbage() {
        assert_eq!(Guid::parse("42"), None);
        assert_eq!(Guid::parse("0xZZ"), None);
        assert_eq!(Guid::parse("0x"), None);
    }

    #[test]
    fn test_guid_parse_rejects_signs() {
        assert_eq!(Guid::parse("0x+1F"), None);
        assert_eq!(Guid::parse("0x-1F"), None);
        assert_eq!(Guid::parse("0x1F"), Some(Guid::new(0x1F)));
    }

    #[test]
    fn test_collision_is_built_from_own_side() {
        let a = BodyPart::new(ObjectHandle::new(1), "body");
        let b = BodyPart::new(ObjectHandle::new(2), "wing");
        let normal = Vector::new(0.0, 1.0, 0.0);

        let seen_by_b = Collision::seen_from(&b, &a, Vector::ZERO, normal);
        assert_eq!(seen_by_b.body_part_name, "wing");
        assert_eq!(seen_by_b.collider, ObjectHandle::new(1));
        assert_eq!(seen_by_b.collider_body_part_name, "body");
        assert_eq!(seen_by_b.normal, normal);
    }

    #[test]
    fn test_shader_param_type() {
        assert_eq!(ShaderParam::Float(1.0).param_type(), ShaderParamType::Float);
        assert_eq!(
            ShaderParam::Vector(Vector::ZERO).param_type(),
            ShaderParamType::Vector
        );
    }
}
