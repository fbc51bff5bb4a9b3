use std::fmt::Display;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::{price::Price, track::TrackId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(pub String);

impl PurchaseId {
    pub fn from_millis(millis: i64) -> Self {
        Self(format!("PUR-{millis}"))
    }
}

impl Display for PurchaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
}

/// Immutable record of a completed, simulated transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub music_id: TrackId,
    pub date: DateTime<Local>,
    /// copied from the track price at purchase time
    pub amount: Price,
    pub reference: String,
    pub buyer_name: String,
    pub status: PurchaseStatus,
}

impl Purchase {
    /// date as shown on receipts, e.g. `18/10/2026, 15:01:02`
    pub fn display_date(&self) -> String {
        self.date.format("%d/%m/%Y, %H:%M:%S").to_string()
    }
}

/// Hands out purchase ids that keep increasing even when
/// two purchases land in the same millisecond.
#[derive(Debug, Default)]
pub struct PurchaseIds {
    last_millis: Option<i64>,
}

impl PurchaseIds {
    pub fn next(&mut self, now: DateTime<Local>) -> PurchaseId {
        let mut millis = now.timestamp_millis();
        if let Some(last) = self.last_millis {
            if millis <= last {
                millis = last + 1;
            }
        }
        self.last_millis = Some(millis);
        PurchaseId::from_millis(millis)
    }
}
