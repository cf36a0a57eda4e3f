//! Asset identifiers and the shared [`AssetEngine`].
//!
//! Persisted data never embeds a live reference to an asset. It stores an
//! [`AssetId`], and whoever deserializes the data resolves that id through an
//! `AssetEngine` handed to it in the serialization payload. The engine is
//! shared between scenes behind an `Arc` and guards its table with an
//! `RwLock`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use minty_serialize::prelude::*;
use serde::{Deserialize, Serialize};

use crate::AssetError;

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Opaque 64-bit asset identifier, written as 16 hex digits.
///
/// Zero is reserved for "no asset".
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(u64);

impl AssetId {
    pub const NONE: AssetId = AssetId(0);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Content-addressed id: the first eight bytes of the BLAKE3 hash of
    /// `name`. The same name always yields the same id.
    pub fn from_name(name: &str) -> Self {
        let hash = blake3::hash(name.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        match u64::from_le_bytes(bytes) {
            0 => Self(1),
            raw => Self(raw),
        }
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({:016x})", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl NodeValue for AssetId {
    fn to_node_string(&self) -> String {
        self.to_string()
    }

    fn from_node_str(text: &str) -> Option<Self> {
        let text = text.trim();
        let digits = text.strip_prefix("0x").unwrap_or(text);
        if digits.is_empty() || digits.len() > 16 {
            return None;
        }
        u64::from_str_radix(digits, 16).ok().map(Self)
    }
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// A shareable, immutable engine resource.
pub trait Asset: Any + Send + Sync {
    /// Short type label used in logs and errors.
    const KIND: &'static str;

    fn id(&self) -> AssetId;
}

// ---------------------------------------------------------------------------
// AssetEngine
// ---------------------------------------------------------------------------

type SharedAsset = Arc<dyn Any + Send + Sync>;

/// Resolves [`AssetId`]s to live assets.
///
/// Loading assets from disk is the caller's business; this table only holds
/// what has been registered.
#[derive(Default)]
pub struct AssetEngine {
    assets: RwLock<HashMap<AssetId, SharedAsset>>,
    lookups: AtomicUsize,
}

impl AssetEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `asset` under its own id, replacing any previous entry.
    pub fn register<T: Asset>(&self, asset: T) -> Arc<T> {
        let asset = Arc::new(asset);
        self.register_arc(Arc::clone(&asset));
        asset
    }

    /// Register an already shared asset.
    pub fn register_arc<T: Asset>(&self, asset: Arc<T>) {
        let id = asset.id();
        let previous = self
            .assets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, asset);
        if previous.is_some() {
            tracing::debug!(asset = %id, kind = T::KIND, "replaced asset");
        } else {
            tracing::trace!(asset = %id, kind = T::KIND, "registered asset");
        }
    }

    /// Drop the entry for `id`. Outstanding `Arc`s stay valid.
    pub fn unregister(&self, id: AssetId) -> bool {
        self.assets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// The asset `id` as a `T`, or `None` if absent or of another type.
    pub fn get<T: Asset>(&self, id: AssetId) -> Option<Arc<T>> {
        self.at(id).ok()
    }

    /// The asset `id` as a `T`, for callers that require it to exist.
    pub fn at<T: Asset>(&self, id: AssetId) -> Result<Arc<T>, AssetError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let entry = self
            .assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(AssetError::NotFound { id })?;
        entry.downcast::<T>().map_err(|_| AssetError::WrongType {
            id,
            expected: T::KIND,
        })
    }

    pub fn len(&self) -> usize {
        self.assets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<AssetId> {
        let mut ids: Vec<AssetId> = self
            .assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    /// How many `get`/`at` calls have been made. Diagnostics only.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for AssetEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetEngine")
            .field("assets", &self.len())
            .field("lookups", &self.lookup_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in asset types
// ---------------------------------------------------------------------------

/// A frame-based animation clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    id: AssetId,
    pub frame_count: usize,
    /// Seconds per frame.
    pub frame_duration: f32,
    pub loops: bool,
}

impl Animation {
    pub fn new(id: AssetId, frame_count: usize, frame_duration: f32, loops: bool) -> Self {
        Self {
            id,
            frame_count,
            frame_duration,
            loops,
        }
    }

    /// Total running time in seconds.
    pub fn length(&self) -> f32 {
        self.frame_count as f32 * self.frame_duration
    }

    /// Advance playback by `delta` seconds, updating `time` and the current
    /// frame `index`. Returns `true` once the end has been reached.
    pub fn animate(&self, time: &mut f32, delta: f32, index: &mut usize) -> bool {
        *time += delta;
        if self.frame_count == 0 || self.frame_duration <= 0.0 {
            *index = 0;
            return true;
        }
        let frame = (*time / self.frame_duration) as usize;
        *index = frame.min(self.frame_count - 1);
        *time >= self.length()
    }
}

impl Asset for Animation {
    const KIND: &'static str = "animation";

    fn id(&self) -> AssetId {
        self.id
    }
}

impl Serializable for Animation {
    fn serialize(&self, writer: &mut Writer<'_>) {
        writer.write("id", &self.id);
        writer.write("frames", &self.frame_count);
        writer.write("frameTime", &self.frame_duration);
        writer.write("loops", &self.loops);
    }

    fn deserialize(&mut self, reader: &Reader<'_>) -> Result<(), DeserializeError> {
        reader.try_read("id", &mut self.id);
        reader.try_read("frames", &mut self.frame_count);
        reader.try_read("frameTime", &mut self.frame_duration);
        reader.try_read("loops", &mut self.loops);
        Ok(())
    }
}

/// A decoded sound. The samples themselves belong to the audio backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    id: AssetId,
    pub name: String,
    /// Length in seconds.
    pub duration: f32,
}

impl AudioClip {
    pub fn new(id: AssetId, name: impl Into<String>, duration: f32) -> Self {
        Self {
            id,
            name: name.into(),
            duration,
        }
    }
}

impl Asset for AudioClip {
    const KIND: &'static str = "audio clip";

    fn id(&self) -> AssetId {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
