use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::{
    domain::track::{Track, TrackId},
    preview::media::{MediaElement, MediaEvent},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewState {
    Idle,
    Playing,
    Paused,
}

/// Progress of the active preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// always below the preview limit
    Elapsed(Duration),
    /// playback was cut at the preview limit
    LimitReached,
}

/// Listener registration for one preview session.
///
/// Starting a preview of another track retires the previous token, so late
/// events from the old source can never touch the new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

#[derive(Debug, Clone, Copy)]
pub struct PreviewEvent {
    pub subscription: Subscription,
    pub kind: MediaEvent,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewStatus {
    pub state: PreviewState,
    pub track_id: Option<TrackId>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub cover_url: Option<String>,
    pub progress_secs: f64,
    pub limit_secs: f64,
    pub limit_reached: bool,
}

/// Plays at most one track at a time, never past the preview limit.
pub struct PreviewController<M: MediaElement> {
    media: M,
    limit: Duration,
    active: Option<Track>,
    state: PreviewState,
    progress: Progress,
    subscription: Option<Subscription>,
    next_subscription: u64,
}

impl<M: MediaElement> PreviewController<M> {
    pub fn new(media: M, limit: Duration) -> Self {
        Self {
            media,
            limit,
            active: None,
            state: PreviewState::Idle,
            progress: Progress::Elapsed(Duration::ZERO),
            subscription: None,
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn active_track(&self) -> Option<&Track> {
        self.active.as_ref()
    }

    pub fn subscription(&self) -> Option<Subscription> {
        self.subscription
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    /// Starts previewing `track` from the beginning.
    ///
    /// If `track` is already the active preview this toggles play/pause
    /// instead of restarting.
    pub fn start_preview(&mut self, track: &Track) -> Subscription {
        if let Some(subscription) = self.subscription {
            if self.active.as_ref().is_some_and(|t| t.id == track.id) {
                self.toggle_play();
                return subscription;
            }
        }

        self.teardown();

        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;

        self.media.load(&track.audio_url);
        self.media.seek(Duration::ZERO);
        self.progress = Progress::Elapsed(Duration::ZERO);
        self.subscription = Some(subscription);
        self.active = Some(track.clone());
        self.begin_playback();

        debug!("preview started: track {} ({:?})", track.id, subscription);
        subscription
    }

    pub fn toggle_play(&mut self) {
        match self.state {
            PreviewState::Idle => {}
            PreviewState::Playing => {
                self.media.pause();
                self.state = PreviewState::Paused;
            }
            PreviewState::Paused => {
                if self.progress == Progress::LimitReached || self.media.position() >= self.limit {
                    self.media.seek(Duration::ZERO);
                    self.progress = Progress::Elapsed(Duration::ZERO);
                }
                self.begin_playback();
            }
        }
    }

    /// stops playback and releases the resource
    pub fn stop_preview(&mut self) {
        self.teardown();
        self.media.unload();
        self.progress = Progress::Elapsed(Duration::ZERO);
    }

    /// Stops the preview if it is playing `id`; returns whether it did.
    pub fn stop_if_active(&mut self, id: &TrackId) -> bool {
        if self.active.as_ref().is_some_and(|t| &t.id == id) {
            self.stop_preview();
            true
        } else {
            false
        }
    }

    /// Applies an event delivered by the host; stale subscriptions are ignored.
    pub fn handle(&mut self, event: PreviewEvent) -> bool {
        if self.subscription != Some(event.subscription) {
            debug!("dropping event for retired {:?}", event.subscription);
            return false;
        }
        self.apply(event.kind);
        true
    }

    /// drains the media element's pending events into the current session
    pub fn pump(&mut self) {
        if self.subscription.is_none() {
            return;
        }
        while let Some(kind) = self.media.poll() {
            self.apply(kind);
        }
    }

    pub fn status(&self) -> PreviewStatus {
        let progress = match self.progress {
            Progress::Elapsed(d) => d,
            Progress::LimitReached => self.limit,
        };
        PreviewStatus {
            state: self.state,
            track_id: self.active.as_ref().map(|t| t.id.clone()),
            title: self.active.as_ref().map(|t| t.title.clone()),
            artist: self.active.as_ref().map(|t| t.artist.clone()),
            cover_url: self.active.as_ref().map(|t| t.cover_url.clone()),
            progress_secs: progress.as_secs_f64(),
            limit_secs: self.limit.as_secs_f64(),
            limit_reached: self.progress == Progress::LimitReached,
        }
    }

    fn begin_playback(&mut self) {
        if let Err(e) = self.media.play() {
            warn!("preview playback failed to start: {e:#}");
        }
        self.state = PreviewState::Playing;
    }

    fn teardown(&mut self) {
        if self.state == PreviewState::Playing {
            self.media.pause();
        }
        self.subscription = None;
        self.active = None;
        self.state = PreviewState::Idle;
    }

    fn apply(&mut self, kind: MediaEvent) {
        match kind {
            MediaEvent::TimeUpdate(current) => {
                if self.state != PreviewState::Playing {
                    return;
                }
                if current >= self.limit {
                    self.media.pause();
                    self.media.seek(Duration::ZERO);
                    self.state = PreviewState::Paused;
                    self.progress = Progress::LimitReached;
                } else {
                    self.progress = Progress::Elapsed(current);
                }
            }
            MediaEvent::Ended => {
                self.media.seek(Duration::ZERO);
                self.state = PreviewState::Paused;
                self.progress = Progress::Elapsed(Duration::ZERO);
            }
        }
    }
}
