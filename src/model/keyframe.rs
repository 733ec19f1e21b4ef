use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::animation::EasingFunction;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Vec2 {
    pub x: OrderedFloat<f64>,
    pub y: OrderedFloat<f64>,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: OrderedFloat(x),
            y: OrderedFloat(y),
        }
    }
}

/// The closed set of clip properties that keyframes may animate.
///
/// Each property has a fixed value shape: `Position` and `Scale` take a
/// two-component vector, the rest take a scalar.
#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
)]
#[serde(rename_all = "lowercase")]
pub enum AnimatedProperty {
    Position,
    Scale,
    Rotation,
    Opacity,
    Volume,
}

impl AnimatedProperty {
    pub fn expects_vec2(&self) -> bool {
        matches!(self, AnimatedProperty::Position | AnimatedProperty::Scale)
    }
}

impl std::fmt::Display for AnimatedProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnimatedProperty::Position => "position",
            AnimatedProperty::Scale => "scale",
            AnimatedProperty::Rotation => "rotation",
            AnimatedProperty::Opacity => "opacity",
            AnimatedProperty::Volume => "volume",
        };
        write!(f, "{}", s)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(untagged)]
pub enum KeyframeValue {
    Scalar(OrderedFloat<f64>),
    Vec2(Vec2),
}

impl KeyframeValue {
    pub fn scalar(v: f64) -> Self {
        KeyframeValue::Scalar(OrderedFloat(v))
    }

    pub fn vec2(x: f64, y: f64) -> Self {
        KeyframeValue::Vec2(Vec2::new(x, y))
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            KeyframeValue::Scalar(v) => Some(v.into_inner()),
            KeyframeValue::Vec2(_) => None,
        }
    }

    pub fn as_vec2(&self) -> Option<(f64, f64)> {
        match self {
            KeyframeValue::Vec2(v) => Some((v.x.into_inner(), v.y.into_inner())),
            KeyframeValue::Scalar(_) => None,
        }
    }

    /// Whether this value has the shape the property expects.
    pub fn matches(&self, property: AnimatedProperty) -> bool {
        match self {
            KeyframeValue::Scalar(_) => !property.expects_vec2(),
            KeyframeValue::Vec2(_) => property.expects_vec2(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Keyframe {
    pub id: Uuid,
    /// Clip-relative time in seconds, within `[0, clip.duration]`.
    pub time: OrderedFloat<f64>,
    pub property: AnimatedProperty,
    pub value: KeyframeValue,
    #[serde(default)]
    pub easing: EasingFunction,
}

impl Keyframe {
    pub fn new(
        property: AnimatedProperty,
        time: f64,
        value: KeyframeValue,
        easing: EasingFunction,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            time: OrderedFloat(time),
            property,
            value,
            easing,
        }
    }
}
