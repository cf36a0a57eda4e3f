//! Positional audio source component.
//!
//! Playback itself belongs to the audio backend; the component only records
//! which clip to play, the backend's playback handle once playing, and the
//! distance falloff parameters.

use std::fmt;
use std::sync::Arc;

use minty_serialize::prelude::*;

use crate::asset::{Asset, AssetId, AudioClip};
use crate::scene::SerializationData;

/// Distance model applied between `near_distance` and `far_distance`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Attenuation {
    None,
    #[default]
    InverseDistance,
    LinearDistance,
    ExponentialDistance,
}

impl fmt::Display for Attenuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Attenuation::None => "None",
            Attenuation::InverseDistance => "InverseDistance",
            Attenuation::LinearDistance => "LinearDistance",
            Attenuation::ExponentialDistance => "ExponentialDistance",
        })
    }
}

impl NodeValue for Attenuation {
    fn to_node_string(&self) -> String {
        self.to_string()
    }

    fn from_node_str(text: &str) -> Option<Self> {
        Some(match text.trim() {
            "None" => Attenuation::None,
            "InverseDistance" => Attenuation::InverseDistance,
            "LinearDistance" => Attenuation::LinearDistance,
            "ExponentialDistance" => Attenuation::ExponentialDistance,
            _ => return None,
        })
    }
}

/// Backend playback handle. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioHandle(pub u64);

#[derive(Debug, Clone)]
pub struct AudioSourceComponent {
    pub clip: Option<Arc<AudioClip>>,
    pub handle: Option<AudioHandle>,
    pub volume: f32,
    pub attenuation: Attenuation,
    /// Rolloff factor of the attenuation curve.
    pub rolloff: f32,
    pub near_distance: f32,
    pub far_distance: f32,
}

impl Default for AudioSourceComponent {
    fn default() -> Self {
        Self {
            clip: None,
            handle: None,
            volume: 1.0,
            attenuation: Attenuation::default(),
            rolloff: 1.0,
            near_distance: 1.0,
            far_distance: 1000.0,
        }
    }
}

impl AudioSourceComponent {
    pub fn new(clip: Arc<AudioClip>) -> Self {
        Self {
            clip: Some(clip),
            ..Self::default()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.handle.is_some()
    }

    /// Volume heard at `distance` from the source.
    pub fn gain_at(&self, distance: f32) -> f32 {
        let near = self.near_distance.max(f32::EPSILON);
        let far = self.far_distance.max(near);
        let d = distance.clamp(near, far);
        let gain = match self.attenuation {
            Attenuation::None => 1.0,
            Attenuation::InverseDistance => near / (near + self.rolloff * (d - near)),
            Attenuation::LinearDistance => {
                if far == near {
                    1.0
                } else {
                    1.0 - self.rolloff * (d - near) / (far - near)
                }
            }
            Attenuation::ExponentialDistance => (d / near).powf(-self.rolloff),
        };
        self.volume * gain.clamp(0.0, 1.0)
    }
}

impl Serializable for AudioSourceComponent {
    fn serialize(&self, writer: &mut Writer<'_>) {
        if let Some(clip) = &self.clip {
            writer.write("clip", &clip.id());
        }
        writer.write("volume", &self.volume);
        writer.write("attenuation", &self.attenuation);
        writer.write("rolloff", &self.rolloff);
        writer.write("nearDistance", &self.near_distance);
        writer.write("farDistance", &self.far_distance);
    }

    /// Plain fields are read before the clip. A `clip` that is not an asset id
    /// is ignored; one that names no registered clip is an error.
    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        reader.try_read("volume", &mut self.volume);
        reader.try_read("attenuation", &mut self.attenuation);
        reader.try_read("rolloff", &mut self.rolloff);
        reader.try_read("nearDistance", &mut self.near_distance);
        reader.try_read("farDistance", &mut self.far_distance);

        let Some(id) = reader.read::<AssetId>("clip") else {
            return Ok(());
        };
        let data = reader.require_data::<SerializationData>()?;
        let clip = data
            .assets
            .at::<AudioClip>(id)
            .map_err(|e| DeserializeError::Unresolved {
                kind: AudioClip::KIND,
                id: id.to_string(),
                details: e.to_string(),
            })?;
        self.clip = Some(clip);
        Ok(())
    }
}
