use serde::Serialize;

use crate::domain::{price::Price, track::Track};

/// Single-slot cart: holds at most one track pending checkout.
///
/// Adding a track replaces whatever was there. The cart never touches the
/// catalog; only a completed purchase removes a track from sale.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Cart {
    slot: Option<Track>,
    /// whether the cart drawer is shown
    open: bool,
}

impl Cart {
    /// returns the track now in the slot
    pub fn add(&mut self, track: Track) -> &Track {
        self.open = true;
        self.slot.insert(track)
    }

    pub fn remove(&mut self) {
        self.slot = None;
    }

    pub fn contents(&self) -> Option<&Track> {
        self.slot.as_ref()
    }

    pub fn total(&self) -> Price {
        self.slot.as_ref().map(|t| t.price).unwrap_or_default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle_open(&mut self) {
        self.open = !self.open;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// hands the slot over to checkout and hides the drawer
    ///
    /// the slot itself stays filled until the purchase completes
    pub fn checkout(&mut self) -> Option<Track> {
        let track = self.slot.clone()?;
        self.open = false;
        Some(track)
    }
}
