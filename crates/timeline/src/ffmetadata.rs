//! FFMETADATA rendering.
//!
//! The rendered block is appended to a metadata file that ffmpeg already populated
//! from the recording, then fed back to ffmpeg with `-map_metadata`. It is never
//! read back by this crate, so there is no matching unescape.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use crate::entity::{Chapter, Timeline};
use crate::error::{CodecError, Result};
use crate::resolver::{describe, resolve};

/// Characters with special meaning in FFMETADATA values.
const SPECIAL_CHARS: [char; 5] = ['=', ';', '#', '\\', '\n'];

/// Escape a value for an FFMETADATA file by prefixing special characters with `\`.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if SPECIAL_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl Timeline {
    /// Build the free-text description: the stored description, the stream id and the
    /// clipped category/title history.
    pub fn render_description(&self) -> String {
        let mut description = String::new();
        if let Some(text) = &self.description {
            description.push_str(text);
        }
        if let Some(id) = &self.id {
            description.push_str("\nID: ");
            description.push_str(id);
        }

        if let Some(start_time) = self.start_time {
            push_track(&mut description, "Categories:", &self.categories, start_time);
            push_track(&mut description, "Titles:", &self.titles, start_time);
        }

        description
    }

    /// Write the FFMETADATA block for this timeline to `sink`.
    ///
    /// Unset fields produce no output. Chapters are emitted from `categories` only,
    /// and only once the session window is known.
    pub fn render<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        if let Some(title) = &self.title {
            writeln!(sink, "title={}", escape(title))?;
        }
        if let Some(author) = &self.author {
            writeln!(sink, "author={}", escape(author))?;
        }

        let description = self.render_description();
        if !description.is_empty() {
            writeln!(sink, "description={}", escape(&description))?;
        }

        if let Some((start_time, end_time)) = self.window() {
            for segment in resolve(&self.categories, start_time, end_time) {
                write!(
                    sink,
                    "\n[CHAPTER]\nTIMEBASE=1/1000\nSTART={}\nEND={}\ntitle={}\n",
                    segment.start_ms,
                    segment.end_ms,
                    escape(&segment.title)
                )?;
            }
        }

        Ok(())
    }

    /// Append the FFMETADATA block to the file at `path`, creating it if needed.
    pub fn append_ffmetadata(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "writing metadata");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| CodecError::io("opening", path, e))?;

        let mut block = Vec::new();
        self.render(&mut block)
            .map_err(|e| CodecError::io("rendering", path, e))?;
        file.write_all(&block)
            .map_err(|e| CodecError::io("writing", path, e))
    }
}

fn push_track(description: &mut String, header: &str, track: &[Chapter], start_time: f64) {
    if track.is_empty() {
        return;
    }
    description.push('\n');
    description.push_str(header);
    for line in describe(track, start_time) {
        description.push('\n');
        description.push_str(&line);
    }
}
