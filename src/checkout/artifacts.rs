//! Files handed to the buyer: audio, receipt and license

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{error, info};
use serde::Serialize;

use crate::{
    checkout::receipt::render_receipt,
    domain::{purchase::Purchase, track::Track},
    license::LicenseText,
    store::history::TrackSummary,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ArtifactBody {
    /// fetched from where the catalog points
    Remote { url: String },
    /// synthesized locally
    Text { content: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub filename: String,
    pub body: ArtifactBody,
}

/// Host-side file save.
pub trait ArtifactSink: Send + Sync {
    fn deliver(&self, artifact: &Artifact) -> anyhow::Result<()>;
}

/// Delivers every artifact; failures are logged and otherwise ignored.
pub fn deliver_all(sink: &dyn ArtifactSink, artifacts: &[Artifact]) {
    for artifact in artifacts {
        match sink.deliver(artifact) {
            Ok(()) => info!("artifact delivered: {}", artifact.filename),
            Err(e) => error!("failed to deliver {}: {e:#}", artifact.filename),
        }
    }
}

/// replaces characters that cannot appear in a file name
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

pub fn audio_artifact(track: &Track) -> Artifact {
    Artifact {
        filename: sanitize_filename(&format!("{} - {}.mp3", track.title, track.artist)),
        body: ArtifactBody::Remote {
            url: track.audio_url.clone(),
        },
    }
}

pub fn receipt_artifact(purchase: &Purchase, track: &Track, entity: &str) -> Artifact {
    Artifact {
        filename: sanitize_filename(&format!("Comprovativo_Muvuka_{}.txt", purchase.id)),
        body: ArtifactBody::Text {
            content: render_receipt(purchase, track, entity),
        },
    }
}

pub fn license_artifact(track: &Track, license: &LicenseText) -> Artifact {
    Artifact {
        filename: sanitize_filename(&format!("Licenca_Muvuka_{}.txt", track.title)),
        body: ArtifactBody::Text {
            content: license.text.clone(),
        },
    }
}

/// audio download offered next to a purchase history row
pub fn history_audio_artifact(track: &TrackSummary) -> Artifact {
    Artifact {
        filename: sanitize_filename(&format!("{}.mp3", track.title)),
        body: ArtifactBody::Remote {
            url: track.audio_url.clone(),
        },
    }
}

/// The two downloads fired automatically once a payment completes.
pub fn post_purchase_artifacts(purchase: &Purchase, track: &Track, entity: &str) -> Vec<Artifact> {
    vec![
        audio_artifact(track),
        receipt_artifact(purchase, track, entity),
    ]
}

/// Saves artifacts into a local directory.
pub struct DownloadDir {
    dir: PathBuf,
    http_client: reqwest::blocking::Client,
}

impl DownloadDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            http_client: reqwest::blocking::Client::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self
                .http_client
                .get(url)
                .send()
                .with_context(|| format!("failed to fetch {url}"))?
                .error_for_status()?;
            Ok(response.bytes()?.to_vec())
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            fs::read(path).with_context(|| format!("failed to read {path}"))
        }
    }
}

impl ArtifactSink for DownloadDir {
    fn deliver(&self, artifact: &Artifact) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.to_string_lossy()))?;
        let target = self.dir.join(&artifact.filename);

        let bytes = match &artifact.body {
            ArtifactBody::Text { content } => content.as_bytes().to_vec(),
            ArtifactBody::Remote { url } => self.fetch(url)?,
        };

        fs::write(&target, bytes)
            .with_context(|| format!("failed to write {}", target.to_string_lossy()))
    }
}
