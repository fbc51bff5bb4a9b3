use anyhow::Context;
use clap::{Parser, Subcommand};
use log::warn;
use std::{path::PathBuf, sync::Arc, sync::Mutex};

use crate::checkout::artifacts::{ArtifactSink, DownloadDir, deliver_all};
use crate::checkout::flow::{CheckoutStep, SuccessDownload};
use crate::checkout::payment::PaymentSimulator;
use crate::clipboard::MemoryClipboard;
use crate::config::{self, LicenseConfig};
use crate::domain::track::TrackId;
use crate::license::{GeminiLicenseClient, LicenseGenerator, Unconfigured};
use crate::preview::{ClockMedia, MediaElement};
use crate::session::{Storefront, complete_payment, lock_store};
use crate::store::seed::{load_catalog, seed_tracks};

#[derive(Parser)]
#[command(name = "muvuka")]
#[command(version = "0.1")]
#[command(about = "Muvuka music storefront")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run http server hosting the storefront
    Serve,
    /// List tracks for sale
    Catalog {
        /// Only show tracks whose title, artist or genre contain this text
        #[arg(short, long, default_value = "")]
        query: String,
    },
    /// Buy a track and save its files in the downloads directory
    Buy {
        /// Id of the track to buy
        track_id: String,
    },
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::Config::load(&cli.config.to_string_lossy())?;

    match &cli.command {
        Commands::Serve => {
            println!("Starting HTTP server...");

            let store = open_store(&cfg, ClockMedia::new())?;
            let payments = payment_simulator(&cfg);
            let sink: Arc<dyn ArtifactSink> = Arc::new(DownloadDir::new(&cfg.downloads.dir));

            let http_server = crate::http::server::HttpServer::new(
                store,
                payments,
                sink,
                Arc::new(MemoryClipboard::default()),
                cfg.http,
            );

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }

        Commands::Catalog { query } => {
            let store = open_store(&cfg, ClockMedia::new())?;
            let tracks = store.list_tracks(query);

            if tracks.is_empty() {
                println!("No tracks match \"{}\"", query);
            }
            for track in tracks {
                println!("[{}] {} - {}", track.id, track.title, track.artist);
                println!(
                    "    {} | {} BPM | {} | {}",
                    track.genre, track.bpm, track.key, track.price
                );
            }
        }

        Commands::Buy { track_id } => {
            let mut store = open_store(&cfg, ClockMedia::new())?;
            let downloads = DownloadDir::new(&cfg.downloads.dir);

            let track = store.add_to_cart(&TrackId::new(track_id.as_str()))?.clone();
            store.open_checkout()?;
            println!("{} - {} ({})", track.title, track.artist, track.price);

            let details = store.advance_checkout(&mut rand::thread_rng())?;
            println!("Pagamento por referência");
            println!("  ENTIDADE:   {}", details.entity);
            println!("  REFERÊNCIA: {}", details.reference);
            println!("  MONTANTE:   {}", track.price);

            let pending = store.begin_payment()?;
            println!("A processar pagamento...");

            let shared = Mutex::new(store);
            let purchase = complete_payment(&shared, pending, &payment_simulator(&cfg), &downloads)
                .context("payment was not applied")?;

            let store = lock_store(&shared);
            println!("Compra concluída: {}", purchase.id);
            if let Some(CheckoutStep::Success(completion)) = store.checkout().map(|f| f.step()) {
                if !completion.license.generated {
                    warn!("license generation failed, saving fallback text");
                }
            }
            let license = store.success_artifact(SuccessDownload::License)?;
            deliver_all(&downloads, &[license]);

            println!(
                "Ficheiros guardados em {}",
                downloads.dir().to_string_lossy()
            );

            println!("Histórico de compras:");
            for row in store.history_rows() {
                let (title, artist) = row
                    .track
                    .as_ref()
                    .map(|t| (t.title.as_str(), t.artist.as_str()))
                    .unwrap_or_default();
                println!(
                    "  {}. {} | {} - {} | {} | {}",
                    row.index,
                    row.purchase.id,
                    title,
                    artist,
                    row.purchase.display_date(),
                    row.purchase.amount
                );
            }
        }
    }

    Ok(())
}

fn open_store<M: MediaElement>(cfg: &config::Config, media: M) -> anyhow::Result<Storefront<M>> {
    let tracks = match &cfg.store.catalog {
        Some(path) => load_catalog(path)?,
        None => seed_tracks(),
    };
    Ok(Storefront::new(tracks, media, cfg.store.clone())?)
}

fn payment_simulator(cfg: &config::Config) -> PaymentSimulator {
    PaymentSimulator::new(
        cfg.store.payment_delay(),
        cfg.store.buyer_name.clone(),
        license_generator(&cfg.license),
    )
}

/// Gemini when an API key is set, otherwise every purchase gets the fallback text
fn license_generator(cfg: &LicenseConfig) -> Arc<dyn LicenseGenerator> {
    let Some(api_key) = cfg.api_key() else {
        warn!(
            "{} is not set, licenses will use the fallback text",
            cfg.api_key_env
        );
        return Arc::new(Unconfigured);
    };

    match GeminiLicenseClient::new(cfg, api_key) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("could not create license client: {e}");
            Arc::new(Unconfigured)
        }
    }
}
