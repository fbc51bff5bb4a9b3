//! Catalog sources: the built-in seed and an optional TOML catalog file

use std::path::Path;

use serde::Deserialize;

use crate::{
    domain::{
        price::Price,
        track::{Track, TrackId},
    },
    store::error::CatalogError,
};

#[allow(clippy::too_many_arguments)]
fn seed(
    id: &str,
    title: &str,
    artist: &str,
    genre: &str,
    price: u64,
    cover_seed: &str,
    song: u32,
    bpm: u32,
    key: &str,
) -> Track {
    Track {
        id: TrackId::new(id),
        title: title.to_string(),
        artist: artist.to_string(),
        genre: genre.to_string(),
        price: Price(price),
        cover_url: format!("https://picsum.photos/seed/{cover_seed}/400/400"),
        audio_url: format!("https://www.soundhelix.com/examples/mp3/SoundHelix-Song-{song}.mp3"),
        bpm,
        key: key.to_string(),
    }
}

/// The catalog the store ships with.
pub fn seed_tracks() -> Vec<Track> {
    vec![
        seed("1", "Kizomba Nights", "Producer Pro", "Kizomba", 15000, "kiz", 1, 95, "Cm"),
        seed("2", "Afrobeat Vibe", "Dread Beats", "Afrobeat", 25000, "afro", 2, 110, "Am"),
        seed("3", "Semba Roots", "Ngola Beats", "Semba", 12000, "semba", 3, 120, "G"),
        seed("4", "Trap do Gueto", "LS Producer", "Trap", 30000, "trap", 4, 140, "D#m"),
        seed("5", "Kuduro Energy", "Viana Beats", "Kuduro", 10000, "kud", 5, 135, "E"),
        seed("6", "Ghetto Zouk Love", "Romantic Beats", "Ghetto Zouk", 18000, "zouk", 8, 88, "F"),
    ]
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tracks: Vec<Track>,
}

pub fn parse_catalog(contents: &str) -> Result<Vec<Track>, CatalogError> {
    let file: CatalogFile = toml::from_str(contents)?;
    Ok(file.tracks)
}

/// reads `[[tracks]]` entries from a TOML file
pub fn load_catalog(path: &Path) -> Result<Vec<Track>, CatalogError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_has_six_unique_tracks() {
        let tracks = seed_tracks();
        assert_eq!(tracks.len(), 6);
        assert_eq!(tracks[0].title, "Kizomba Nights");
        assert_eq!(tracks[0].price, Price(15000));
        assert_eq!(
            tracks[5].audio_url,
            "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-8.mp3"
        );
    }

    #[test]
    fn test_parse_catalog_toml() -> anyhow::Result<()> {
        let toml_str = r#"
[[tracks]]
id = "b1"
title = "Luanda Sunset"
artist = "Ilha Beats"
genre = "Semba"
price = 9000
cover_url = "https://covers.test/b1.jpg"
audio_url = "https://audio.test/b1.mp3"
bpm = 101
key = "Dm"
"#;

        let tracks = parse_catalog(toml_str)?;

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, TrackId::new("b1"));
        assert_eq!(tracks[0].price, Price(9000));
        assert_eq!(tracks[0].bpm, 101);
        Ok(())
    }

    #[test]
    fn load_catalog_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        assert!(matches!(
            load_catalog(&missing),
            Err(CatalogError::Read { .. })
        ));
    }

    #[test]
    fn load_catalog_reads_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, "tracks = []\n")?;

        assert!(load_catalog(&path)?.is_empty());
        Ok(())
    }
}
