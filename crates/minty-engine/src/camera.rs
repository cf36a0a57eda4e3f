//! Camera component.

use std::fmt;

use minty_serialize::prelude::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Projection::Perspective => "Perspective",
            Projection::Orthographic => "Orthographic",
        })
    }
}

impl NodeValue for Projection {
    fn to_node_string(&self) -> String {
        self.to_string()
    }

    /// Case-insensitive.
    fn from_node_str(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "PERSPECTIVE" => Some(Projection::Perspective),
            "ORTHOGRAPHIC" => Some(Projection::Orthographic),
            _ => None,
        }
    }
}

/// View parameters. `fov` is in degrees and only applies to perspective
/// projection; `size` is the half-height of an orthographic view.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraComponent {
    pub projection: Projection,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub size: f32,
}

impl Default for CameraComponent {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective,
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
            size: 5.0,
        }
    }
}

impl CameraComponent {
    pub fn orthographic(size: f32) -> Self {
        Self {
            projection: Projection::Orthographic,
            size,
            ..Self::default()
        }
    }

    /// Vertical field of view in radians.
    pub fn fov_radians(&self) -> f32 {
        self.fov.to_radians()
    }
}

impl Serializable for CameraComponent {
    fn serialize(&self, writer: &mut Writer<'_>) {
        writer.write("perspective", &self.projection);
        writer.write("fov", &self.fov);
        writer.write("near", &self.near);
        writer.write("far", &self.far);
        writer.write("size", &self.size);
    }

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        reader.try_read("perspective", &mut self.projection);
        reader.try_read("fov", &mut self.fov);
        reader.try_read("near", &mut self.near);
        reader.try_read("far", &mut self.far);
        reader.try_read("size", &mut self.size);
        Ok(())
    }
}
