//! Timeline persistence.
//!
//! Timelines are stored as indented JSON. Every save replaces the file wholesale via
//! a temporary file in the same directory followed by a rename, so a concurrent
//! reader sees either the previous or the new timeline, never a torn write.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::trace;

use crate::entity::Timeline;
use crate::error::{CodecError, Result};

const INDENT: &[u8] = b"    ";

/// Encode a timeline.
pub fn serialize(timeline: &Timeline) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    timeline.serialize(&mut serializer)?;
    Ok(buf)
}

/// Decode a timeline. Missing fields take their defaults and unknown fields are
/// ignored; anything that is not a timeline object is an error.
pub fn deserialize(bytes: &[u8]) -> Result<Timeline> {
    Ok(serde_json::from_slice(bytes)?)
}

impl Timeline {
    /// Atomically replace the file at `path` with this timeline.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serialize(self)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| CodecError::io("creating temp file in", dir, e))?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| CodecError::io("writing", tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| CodecError::io("replacing", path, e.error))?;

        trace!(path = %path.display(), "timeline saved");
        Ok(())
    }

    /// Load a timeline previously written with [`Timeline::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| CodecError::io("reading", path, e))?;
        deserialize(&bytes)
    }
}
