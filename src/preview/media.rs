use std::time::{Duration, Instant};

use anyhow::bail;

/// Minimum playback advance between two reported time updates.
pub const TIME_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

/// Events a playback resource reports to its listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// current playback position
    TimeUpdate(Duration),
    /// the resource played to its natural end
    Ended,
}

/// A single playback resource, the equivalent of one `<audio>` element.
///
/// Only the preview controller drives it.
pub trait MediaElement: Send {
    /// points the element at a new source, position 0, paused
    fn load(&mut self, source: &str);

    /// releases the current source
    fn unload(&mut self);

    fn play(&mut self) -> anyhow::Result<()>;

    fn pause(&mut self);

    fn seek(&mut self, position: Duration);

    fn position(&self) -> Duration;

    /// next pending event, if any
    fn poll(&mut self) -> Option<MediaEvent>;
}

/// Wall-clock simulated media element.
///
/// Position advances in real time while playing. Without a known duration
/// the element never reaches its end. Like a browser `timeupdate`, a time
/// update is only reported once playback has moved by
/// [`TIME_UPDATE_INTERVAL`], so a drain of `poll` always terminates.
#[derive(Debug, Default)]
pub struct ClockMedia {
    source: Option<String>,
    duration: Option<Duration>,
    /// position accumulated before the current play run
    offset: Duration,
    /// start of the current play run
    playing_since: Option<Instant>,
    /// position carried by the last time update
    reported: Option<Duration>,
    ended: bool,
}

impl ClockMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    fn at_end(&self) -> bool {
        self.duration.is_some_and(|d| self.position() >= d)
    }
}

impl MediaElement for ClockMedia {
    fn load(&mut self, source: &str) {
        self.source = Some(source.to_string());
        self.offset = Duration::ZERO;
        self.playing_since = None;
        self.reported = None;
        self.ended = false;
    }

    fn unload(&mut self) {
        self.source = None;
        self.offset = Duration::ZERO;
        self.playing_since = None;
        self.reported = None;
        self.ended = false;
    }

    fn play(&mut self) -> anyhow::Result<()> {
        if self.source.is_none() {
            bail!("no media source loaded");
        }
        if self.at_end() {
            self.offset = Duration::ZERO;
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        self.ended = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.offset = self.position();
        self.playing_since = None;
    }

    fn seek(&mut self, position: Duration) {
        self.offset = match self.duration {
            Some(d) => position.min(d),
            None => position,
        };
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        self.reported = None;
        self.ended = false;
    }

    fn position(&self) -> Duration {
        let running = self
            .playing_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        let position = self.offset + running;
        match self.duration {
            Some(d) => position.min(d),
            None => position,
        }
    }

    fn poll(&mut self) -> Option<MediaEvent> {
        self.playing_since?;
        if self.at_end() {
            if self.ended {
                return None;
            }
            self.pause();
            self.ended = true;
            return Some(MediaEvent::Ended);
        }
        let position = self.position();
        if self
            .reported
            .is_some_and(|last| position < last + TIME_UPDATE_INTERVAL)
        {
            return None;
        }
        self.reported = Some(position);
        Some(MediaEvent::TimeUpdate(position))
    }
}
