//! Module metadata.
//!
//! Decoders expose metadata as a `;`-delimited key list plus a per-key
//! lookup. [`ModuleMetadata`] collects that into a map with accessors for the
//! common keys.

use crate::decoder::ModuleDecoder;
use serde::Serialize;
use std::collections::BTreeMap;

/// Separator used by decoders between metadata keys.
pub const KEY_SEPARATOR: char = ';';

/// Metadata of the currently loaded module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModuleMetadata {
    entries: BTreeMap<String, String>,
}

impl ModuleMetadata {
    /// Collect every key the decoder advertises.
    pub fn from_decoder<D: ModuleDecoder + ?Sized>(decoder: &D) -> Self {
        let keys = decoder.metadata_keys();
        let entries = split_keys(&keys)
            .map(|key| (key.to_string(), decoder.metadata(key)))
            .collect();
        Self { entries }
    }

    /// Value for `key`, if the decoder provided one.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Song title.
    pub fn title(&self) -> &str {
        self.get("title").unwrap_or_default()
    }

    /// Song artist.
    pub fn artist(&self) -> &str {
        self.get("artist").unwrap_or_default()
    }

    /// Short format identifier, e.g. "xm" or "it".
    pub fn format(&self) -> &str {
        self.get("type").unwrap_or_default()
    }

    /// Tracker that saved the module.
    pub fn tracker(&self) -> &str {
        self.get("tracker").unwrap_or_default()
    }

    /// Song message / comments.
    pub fn message(&self) -> &str {
        self.get("message").unwrap_or_default()
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there is no metadata (also the case with nothing loaded).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn split_keys(keys: &str) -> impl Iterator<Item = &str> {
    keys.split(KEY_SEPARATOR)
        .map(str::trim)
        .filter(|key| !key.is_empty())
}
