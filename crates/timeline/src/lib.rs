//! Chapter timeline for a single recording session.
//!
//! A [`Timeline`] collects the title/category history of a live broadcast while it
//! is being recorded. It is persisted as JSON after every change (see [`codec`]) and,
//! once the recording's real duration is known, rendered into an FFMETADATA block
//! (see [`ffmetadata`]) that ffmpeg muxes into the final file.
//!
//! ## Core Types
//!
//! - [`Chapter`] - A titled instant marking the start of a segment
//! - [`Timeline`] - Session metadata plus the `categories` and `titles` tracks
//! - [`Segment`] - A resolved, clipped chapter in milliseconds relative to the start
//!
//! ## Resolution
//!
//! - [`resolve`] - Clip a track into contiguous binary chapter segments
//! - [`describe`] - Clip a track into `H:MM:SS: title` description lines

pub mod codec;
pub mod entity;
pub mod error;
pub mod ffmetadata;
pub mod resolver;

pub use entity::{Chapter, Timeline};
pub use error::{CodecError, Result};
pub use ffmetadata::escape;
pub use resolver::{Segment, describe, format_offset, resolve};
