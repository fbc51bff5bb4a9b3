use serde::Serialize;

use crate::{
    domain::{
        purchase::{Purchase, PurchaseId},
        track::Track,
    },
    store::catalog::CatalogSnapshot,
};

/// Append-only log of completed purchases.
#[derive(Debug, Default)]
pub struct PurchaseHistory {
    /// insertion order, oldest first
    purchases: Vec<Purchase>,
}

/// Track fields a history row needs for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackSummary {
    pub title: String,
    pub artist: String,
    pub cover_url: String,
    pub audio_url: String,
}

impl From<&Track> for TrackSummary {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            cover_url: track.cover_url.clone(),
            audio_url: track.audio_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRow {
    /// 1-based position in the newest-first listing
    pub index: usize,
    pub purchase: Purchase,
    /// `None` when the purchased track is unknown even to the snapshot
    pub track: Option<TrackSummary>,
}

impl PurchaseHistory {
    pub fn append(&mut self, purchase: Purchase) {
        self.purchases.push(purchase);
    }

    /// newest first
    pub fn list(&self) -> impl Iterator<Item = &Purchase> {
        self.purchases.iter().rev()
    }

    pub fn get(&self, id: &PurchaseId) -> Option<&Purchase> {
        self.purchases.iter().find(|p| &p.id == id)
    }

    pub fn len(&self) -> usize {
        self.purchases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.purchases.is_empty()
    }

    /// Resolves each purchase against the catalog as loaded at startup, never the live one.
    pub fn rows(&self, snapshot: &CatalogSnapshot) -> Vec<HistoryRow> {
        self.list()
            .enumerate()
            .map(|(i, purchase)| HistoryRow {
                index: i + 1,
                track: snapshot.lookup(&purchase.music_id).map(TrackSummary::from),
                purchase: purchase.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;

    use super::*;
    use crate::{
        domain::{
            price::Price,
            purchase::{PurchaseIds, PurchaseStatus},
            track::TrackId,
        },
        store::{catalog::Catalog, seed::seed_tracks},
    };

    fn purchase(ids: &mut PurchaseIds, track: &str) -> Purchase {
        Purchase {
            id: ids.next(Local::now()),
            music_id: TrackId::new(track),
            date: Local::now(),
            amount: Price(1000),
            reference: "100000000".into(),
            buyer_name: "Cliente Muvuka".into(),
            status: PurchaseStatus::Completed,
        }
    }

    #[test]
    fn lists_newest_first() {
        let mut ids = PurchaseIds::default();
        let mut history = PurchaseHistory::default();
        history.append(purchase(&mut ids, "1"));
        history.append(purchase(&mut ids, "2"));
        history.append(purchase(&mut ids, "3"));

        let order = history
            .list()
            .map(|p| p.music_id.0.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["3", "2", "1"]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn rows_resolve_removed_tracks_through_snapshot() -> anyhow::Result<()> {
        let mut catalog = Catalog::new(seed_tracks())?;
        let snapshot = catalog.snapshot();
        catalog.remove(&TrackId::new("2"));

        let mut ids = PurchaseIds::default();
        let mut history = PurchaseHistory::default();
        history.append(purchase(&mut ids, "2"));

        let rows = history.rows(&snapshot);
        let track = rows[0].track.as_ref().expect("resolved from snapshot");

        assert_eq!(rows[0].index, 1);
        assert_eq!(track.title, "Afrobeat Vibe");
        assert_eq!(track.artist, "Dread Beats");
        assert_eq!(track.cover_url, "https://picsum.photos/seed/afro/400/400");
        Ok(())
    }

    #[test]
    fn unknown_track_degrades_to_empty_row() -> anyhow::Result<()> {
        let snapshot = Catalog::new(seed_tracks())?.snapshot();
        let mut ids = PurchaseIds::default();
        let mut history = PurchaseHistory::default();
        history.append(purchase(&mut ids, "ghost"));
        history.append(purchase(&mut ids, "1"));

        let rows = history.rows(&snapshot);

        assert_eq!(rows.len(), 2);
        assert!(rows[0].track.is_some());
        assert!(rows[1].track.is_none());
        assert_eq!(rows[1].index, 2);
        Ok(())
    }
}
