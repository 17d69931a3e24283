pub use glam::{Vec3, vec3};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize)]
struct Xyz {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PointRepr {
    Object(Xyz),
    Array([f32; 3]),
}

impl From<PointRepr> for Vec3 {
    fn from(repr: PointRepr) -> Self {
        match repr {
            PointRepr::Object(Xyz { x, y, z }) => vec3(x, y, z),
            PointRepr::Array(array) => Vec3::from_array(array),
        }
    }
}

/// Serde adapter for points in saved graphs: written as `{x, y, z}`, read from
/// either that object or glam's `[x, y, z]` array.
pub mod point {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Vec3, serializer: S) -> Result<S::Ok, S::Error> {
        Xyz {
            x: value.x,
            y: value.y,
            z: value.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec3, D::Error> {
        PointRepr::deserialize(deserializer).map(Vec3::from)
    }
}

/// [`point`] for optional fields.
pub mod optional_point {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Vec3>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => point::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec3>, D::Error> {
        Ok(Option::<PointRepr>::deserialize(deserializer)?.map(Vec3::from))
    }
}
