//! Chapter clipping.
//!
//! Both functions walk consecutive chapter pairs, appending a synthetic terminal
//! marker so every real chapter has an end. A chapter whose end falls at or before
//! the session start is pre-roll and is dropped; a chapter that straddles the start
//! is kept and clamped to offset zero.

use crate::entity::Chapter;

/// A resolved chapter, in milliseconds relative to the session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub title: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

fn to_millis(t: f64) -> i64 {
    (1000.0 * t).floor() as i64
}

/// Resolve a track into contiguous chapter segments inside `[start_time, end_boundary]`.
///
/// Segment boundaries are carried forward from the previous kept segment, so
/// `segments[i].end_ms == segments[i + 1].start_ms` always holds. The first kept
/// segment starts at offset 0. Chapters starting at or after `end_boundary` are
/// outside the session and produce no segment.
pub fn resolve(track: &[Chapter], start_time: f64, end_boundary: f64) -> Vec<Segment> {
    let t_start = to_millis(start_time);
    let t_end = to_millis(end_boundary);
    let mut t_curr = t_start;
    let mut segments = Vec::new();

    for (i, chapter) in track.iter().enumerate() {
        let t_next = match track.get(i + 1) {
            Some(next) => to_millis(next.time).min(t_end),
            None => t_end,
        };
        // Pre-roll, including a chapter ending exactly on the start millisecond.
        if t_next <= t_start {
            continue;
        }
        if t_curr >= t_end {
            break;
        }
        segments.push(Segment {
            title: chapter.title.clone(),
            start_ms: t_curr - t_start,
            end_ms: t_next - t_start,
        });
        t_curr = t_next;
    }

    segments
}

/// Render a track as `H:MM:SS: title` lines relative to `start_time`.
///
/// The last chapter is open-ended. Offsets are rounded to the nearest second (ties to
/// even) and chapters straddling the start are shown at `0:00:00`; a chapter that
/// starts later keeps its own offset.
pub fn describe(track: &[Chapter], start_time: f64) -> Vec<String> {
    track
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let next = track.get(i + 1).map_or(f64::INFINITY, |c| c.time);
            next > start_time
        })
        .map(|(_, chapter)| {
            let offset = (chapter.time - start_time).max(0.0).round_ties_even() as u64;
            format!("{}: {}", format_offset(offset), chapter.title)
        })
        .collect()
}

/// Format whole seconds as `H:MM:SS`.
pub fn format_offset(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
