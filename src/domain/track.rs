use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::price::Price;

/// Opaque catalog identifier of a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represent a purchasable music track.
///
/// Tracks are never mutated once they enter a catalog;
/// purchasing one only removes it from the live listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub price: Price,
    pub cover_url: String,
    pub audio_url: String,
    pub bpm: u32,
    pub key: String,
}

impl Track {
    /// case-insensitive substring match against title, artist or genre
    ///
    /// `needle` must already be lowercase
    pub fn matches(&self, needle: &str) -> bool {
        [&self.title, &self.artist, &self.genre]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[cfg(test)]
pub(crate) fn mock_track(id: &str, title: &str, artist: &str, genre: &str, price: u64) -> Track {
    Track {
        id: TrackId::new(id),
        title: title.to_string(),
        artist: artist.to_string(),
        genre: genre.to_string(),
        price: Price(price),
        cover_url: format!("https://covers.test/{id}.jpg"),
        audio_url: format!("https://audio.test/{id}.mp3"),
        bpm: 100,
        key: "C".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::mock_track;

    #[test]
    fn matches_any_text_field() {
        let track = mock_track("1", "Kizomba Nights", "Producer Pro", "Kizomba", 15000);

        assert!(track.matches("nights"));
        assert!(track.matches("producer"));
        assert!(track.matches("kiz"));
        assert!(!track.matches("trap"));
    }

    #[test]
    fn id_serializes_as_plain_string() -> anyhow::Result<()> {
        let track = mock_track("7", "T", "A", "G", 1);
        let json = serde_json::to_value(&track)?;

        assert_eq!(json["id"], "7");
        assert_eq!(json["price"], 1);
        Ok(())
    }
}
