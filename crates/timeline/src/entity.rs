//! Timeline entities.

use serde::{Deserialize, Serialize};

/// A titled instant marking the start of a new category or title segment.
///
/// `time` is in seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub time: f64,
}

impl Chapter {
    pub fn new(title: impl Into<String>, time: f64) -> Self {
        Self {
            title: title.into(),
            time,
        }
    }
}

/// Metadata and chapter history for one recording session.
///
/// `categories` and `titles` are append-only and expected to be in chronological
/// order; the resolver does not re-sort them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeline {
    pub id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Session start in epoch seconds.
    pub start_time: Option<f64>,
    /// Session end in epoch seconds.
    pub end_time: Option<f64>,
    pub categories: Vec<Chapter>,
    pub titles: Vec<Chapter>,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Record a category change at `time`.
    pub fn push_category(&mut self, title: impl Into<String>, time: f64) {
        self.categories.push(Chapter::new(title, time));
    }

    /// Record a stream title change at `time`.
    pub fn push_title(&mut self, title: impl Into<String>, time: f64) {
        self.titles.push(Chapter::new(title, time));
    }

    /// Set the session window from the recorded artifact.
    ///
    /// The artifact's modification time is taken as the end of the session and its
    /// measured duration is subtracted to get the start. This overrides any start
    /// time observed while the broadcast was live.
    pub fn set_window_from_artifact(&mut self, modified_at: f64, duration_secs: f64) {
        self.end_time = Some(modified_at);
        self.start_time = Some(modified_at - duration_secs);
    }

    /// Session window `[start_time, end_time]`, if both ends are known.
    pub fn window(&self) -> Option<(f64, f64)> {
        self.start_time.zip(self.end_time)
    }

    /// Most recent category, if any.
    pub fn current_category(&self) -> Option<&str> {
        self.categories.last().map(|c| c.title.as_str())
    }

    /// Most recent stream title, if any.
    pub fn current_title(&self) -> Option<&str> {
        self.titles.last().map(|c| c.title.as_str())
    }
}
