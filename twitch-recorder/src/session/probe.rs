//! Metadata sampler probe.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use poller::Probe;
use timeline::Timeline;
use tracing::{error, info, warn};

use crate::twitch::{BroadcastState, StreamInfo, StreamSource};
use crate::utils::time::now_epoch_secs;
use crate::{Error, Result};

/// Samples the channel and records category and title changes into the session's
/// timeline, saving it after every change.
///
/// The probe owns the timeline while the sampler runs; it is handed back through
/// [`poller::Poller::stop`] and [`MetadataProbe::into_timeline`].
pub struct MetadataProbe {
    source: Arc<dyn StreamSource>,
    channel: String,
    timeline: Timeline,
    timeline_path: PathBuf,
    previous: StreamInfo,
}

impl MetadataProbe {
    pub fn new(
        source: Arc<dyn StreamSource>,
        channel: impl Into<String>,
        timeline: Timeline,
        timeline_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            channel: channel.into(),
            timeline,
            timeline_path: timeline_path.into(),
            previous: StreamInfo::default(),
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn into_timeline(self) -> Timeline {
        self.timeline
    }

    fn persist(&self) -> Result<()> {
        self.timeline.save(&self.timeline_path).map_err(Error::from)
    }

    /// Append chapters for whatever changed since the previous live observation.
    fn record_changes(&mut self, stream: StreamInfo, now: f64) -> Result<()> {
        let mut result = Ok(());

        if self.previous.game_name != stream.game_name {
            info!(category = %stream.game_name, "setting current game");
            self.timeline.push_category(stream.game_name.clone(), now);
            result = result.and(self.persist());
        }
        if self.previous.title != stream.title {
            info!(title = %stream.title, "setting current stream title");
            self.timeline.push_title(stream.title.clone(), now);
            result = result.and(self.persist());
        }

        self.previous = stream;
        result
    }
}

#[async_trait]
impl Probe for MetadataProbe {
    type Error = Error;

    async fn probe(&mut self) -> Result<()> {
        let state = self.source.observe(&self.channel).await;
        let now = now_epoch_secs();

        match state {
            BroadcastState::Live(stream) => self.record_changes(stream, now),
            BroadcastState::AuthExpired => {
                error!("unauthorized, attempting to log back in");
                self.source.refresh_credentials().await;
                Ok(())
            }
            other => {
                warn!(state = %other, "unexpected status while polling metadata");
                Ok(())
            }
        }
    }
}
