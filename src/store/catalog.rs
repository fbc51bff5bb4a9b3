use std::{collections::HashSet, sync::Arc};

use log::debug;

use crate::{
    domain::track::{Track, TrackId},
    store::error::CatalogError,
};

/// Immutable copy of the catalog as it was when the session started.
///
/// Purchase history resolves tracks through this snapshot, because the live
/// catalog drops every track once it is bought.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    tracks: Arc<[Track]>,
}

impl CatalogSnapshot {
    pub fn lookup(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }
}

/// Live listing of purchasable tracks, in insertion order.
#[derive(Debug, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    /// rejects duplicate ids and zero tempo
    pub fn new(tracks: Vec<Track>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for track in &tracks {
            if !seen.insert(&track.id) {
                return Err(CatalogError::DuplicateId(track.id.clone()));
            }
            if track.bpm == 0 {
                return Err(CatalogError::InvalidBpm(track.id.clone()));
            }
        }
        Ok(Self { tracks })
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            tracks: self.tracks.clone().into(),
        }
    }

    /// Tracks whose title, artist or genre contains `query`, ignoring case.
    ///
    /// An empty query means no filter; whitespace is matched like any other text.
    pub fn list(&self, query: &str) -> Vec<&Track> {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return self.tracks.iter().collect();
        }
        self.tracks.iter().filter(|t| t.matches(&needle)).collect()
    }

    pub fn get(&self, id: &TrackId) -> Result<&Track, CatalogError> {
        self.tracks
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| CatalogError::TrackNotFound(id.clone()))
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.iter().any(|t| &t.id == id)
    }

    /// no-op when the track is absent
    pub fn remove(&mut self, id: &TrackId) {
        let before = self.tracks.len();
        self.tracks.retain(|t| &t.id != id);
        if self.tracks.len() == before {
            debug!("catalog remove: track {id} already absent");
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
