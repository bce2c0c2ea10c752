use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Object bytes that passed validation, kept in memory so later stages do not
/// fetch the object again. Never persisted.
#[derive(Debug, Clone)]
pub struct ValidatedContent {
    pub bytes: Bytes,
    pub confirmed_mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// A promoted object in the permanent namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermanentAsset {
    pub permanent_key: String,
    pub public_url: String,
}

/// One stored thumbnail rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    pub key: String,
    pub public_url: String,
}

/// Thumbnails of one asset, keyed by size label (`100x100`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThumbnailSet(BTreeMap<String, Thumbnail>);

impl ThumbnailSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: String, thumbnail: Thumbnail) {
        self.0.insert(label, thumbnail);
    }

    pub fn get(&self, label: &str) -> Option<&Thumbnail> {
        self.0.get(label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Thumbnail)> {
        self.0.iter()
    }

    /// Persisted shape: size label to public URL.
    pub fn urls(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(label, thumb)| (label.clone(), thumb.public_url.clone()))
            .collect()
    }
}
