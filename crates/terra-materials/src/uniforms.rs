//! Named uniform values handed to shader materials.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Color;

/// A single uniform value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum UniformValue {
    Float(f32),
    Color(Color),
    Vec3([f32; 3]),
}

/// Ordered map of uniform name to value.
///
/// Callers may mutate values after a material is built to animate an effect;
/// the renderer re-packs them each frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Uniforms(BTreeMap<String, UniformValue>);

impl Uniforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: UniformValue) -> Option<UniformValue> {
        self.0.insert(name.into(), value)
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.0.get(name)
    }

    /// Float value, if present and of float type.
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.0.get(name)? {
            UniformValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Color value, if present and of color type.
    pub fn color(&self, name: &str) -> Option<Color> {
        match self.0.get(name)? {
            UniformValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
