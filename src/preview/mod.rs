//! Time-limited preview playback

pub mod controller;
pub mod media;

pub use controller::{
    PreviewController, PreviewEvent, PreviewState, PreviewStatus, Progress, Subscription,
};
pub use media::{ClockMedia, MediaElement, MediaEvent};
