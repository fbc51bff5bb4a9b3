//! The storefront session: every piece of mutable state, owned in one place

use std::sync::{Mutex, MutexGuard};

use log::{info, warn};
use rand::Rng;

use crate::{
    checkout::{
        artifacts::{
            Artifact, ArtifactSink, deliver_all, history_audio_artifact, post_purchase_artifacts,
        },
        error::CheckoutError,
        flow::{FlowId, PaymentField, PurchaseFlow, SuccessDownload},
        payment::{PaymentDetails, PaymentSimulator, PendingPayment, SettledPayment},
    },
    clipboard::Clipboard,
    config::StoreConfig,
    domain::{
        purchase::{Purchase, PurchaseId},
        track::{Track, TrackId},
    },
    preview::{MediaElement, PreviewController, PreviewEvent, PreviewStatus, Subscription},
    store::{
        cart::Cart,
        catalog::{Catalog, CatalogSnapshot},
        error::CatalogError,
        history::{HistoryRow, PurchaseHistory, TrackSummary},
    },
};

/// One shopper's storefront.
///
/// Starts from a seed catalog with an empty cart, history and preview.
pub struct Storefront<M: MediaElement> {
    settings: StoreConfig,
    snapshot: CatalogSnapshot,
    catalog: Catalog,
    cart: Cart,
    history: PurchaseHistory,
    preview: PreviewController<M>,
    checkout: Option<PurchaseFlow>,
    next_flow: u64,
}

impl<M: MediaElement> Storefront<M> {
    pub fn new(tracks: Vec<Track>, media: M, settings: StoreConfig) -> Result<Self, CatalogError> {
        let catalog = Catalog::new(tracks)?;
        let snapshot = catalog.snapshot();
        let preview = PreviewController::new(media, settings.preview_limit());
        info!("storefront opened with {} tracks", catalog.len());

        Ok(Self {
            settings,
            snapshot,
            catalog,
            cart: Cart::default(),
            history: PurchaseHistory::default(),
            preview,
            checkout: None,
            next_flow: 0,
        })
    }

    pub fn settings(&self) -> &StoreConfig {
        &self.settings
    }

    // ------------------------------------------------------------------
    // catalog
    // ------------------------------------------------------------------

    pub fn list_tracks(&self, query: &str) -> Vec<&Track> {
        self.catalog.list(query)
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }

    // ------------------------------------------------------------------
    // cart
    // ------------------------------------------------------------------

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// puts an available track in the cart, replacing what was there
    pub fn add_to_cart(&mut self, id: &TrackId) -> Result<&Track, CatalogError> {
        let track = self.catalog.get(id)?.clone();
        Ok(self.cart.add(track))
    }

    pub fn remove_from_cart(&mut self) {
        self.cart.remove();
    }

    pub fn toggle_cart(&mut self) {
        self.cart.toggle_open();
    }

    // ------------------------------------------------------------------
    // preview
    // ------------------------------------------------------------------

    pub fn preview(&self) -> &PreviewController<M> {
        &self.preview
    }

    /// Starts, or toggles if already active, the preview of an available track.
    pub fn start_preview(&mut self, id: &TrackId) -> Result<Subscription, CatalogError> {
        let track = self.catalog.get(id)?;
        Ok(self.preview.start_preview(track))
    }

    pub fn toggle_preview(&mut self) {
        self.preview.toggle_play();
    }

    pub fn stop_preview(&mut self) {
        self.preview.stop_preview();
    }

    pub fn handle_preview_event(&mut self, event: PreviewEvent) -> bool {
        self.preview.handle(event)
    }

    /// current preview state, after draining pending media events
    pub fn preview_status(&mut self) -> PreviewStatus {
        self.preview.pump();
        self.preview.status()
    }

    /// the player bar's "buy" button
    pub fn add_preview_to_cart(&mut self) -> Option<&Track> {
        let track = self.preview.active_track()?.clone();
        Some(self.cart.add(track))
    }

    // ------------------------------------------------------------------
    // checkout
    // ------------------------------------------------------------------

    pub fn checkout(&self) -> Option<&PurchaseFlow> {
        self.checkout.as_ref()
    }

    fn active_flow(&mut self) -> Result<&mut PurchaseFlow, CheckoutError> {
        self.checkout.as_mut().ok_or(CheckoutError::NoActiveFlow)
    }

    /// Opens the wizard for the cart's track, discarding any previous flow.
    pub fn open_checkout(&mut self) -> Result<&PurchaseFlow, CheckoutError> {
        let track = self.cart.checkout().ok_or(CheckoutError::EmptyCart)?;
        if let Some(previous) = &self.checkout {
            warn!("discarding unfinished checkout {:?}", previous.id());
        }

        let id = FlowId(self.next_flow);
        self.next_flow += 1;
        info!("checkout {id:?} opened for track {}", track.id);

        let flow = PurchaseFlow::new(id, track, self.settings.entity.clone());
        Ok(self.checkout.insert(flow))
    }

    pub fn advance_checkout<R: Rng>(&mut self, rng: &mut R) -> Result<PaymentDetails, CheckoutError> {
        self.active_flow()?.advance(rng)
    }

    pub fn checkout_back(&mut self) -> Result<(), CheckoutError> {
        self.active_flow()?.back()
    }

    /// Copies the entity or the reference; a failing clipboard is only logged.
    pub fn copy_payment_field(
        &self,
        field: PaymentField,
        clipboard: &dyn Clipboard,
    ) -> Result<String, CheckoutError> {
        let flow = self.checkout.as_ref().ok_or(CheckoutError::NoActiveFlow)?;
        let value = flow.copy_value(field)?;
        if let Err(e) = clipboard.copy(&value) {
            warn!("clipboard copy failed: {e:#}");
        }
        Ok(value)
    }

    pub fn begin_payment(&mut self) -> Result<PendingPayment, CheckoutError> {
        self.active_flow()?.begin_payment()
    }

    /// Applies a settled payment to the flow it was started from.
    ///
    /// Returns `None` without touching anything when that flow has been
    /// closed or replaced in the meantime.
    pub fn finish_payment(&mut self, settled: SettledPayment) -> Option<Purchase> {
        let Some(flow) = self.checkout.as_mut().filter(|f| f.id() == settled.flow) else {
            warn!(
                "payment for closed checkout {:?} ignored ({})",
                settled.flow, settled.purchase.id
            );
            return None;
        };

        if let Err(e) = flow.complete(settled.purchase.clone(), settled.license) {
            warn!("payment for checkout {:?} ignored: {e}", settled.flow);
            return None;
        }

        self.apply_purchase(settled.purchase.clone());
        Some(settled.purchase)
    }

    /// History, cart, catalog and preview move together in one step.
    fn apply_purchase(&mut self, purchase: Purchase) {
        let id = purchase.music_id.clone();
        self.history.append(purchase);
        self.cart.remove();
        self.catalog.remove(&id);
        if self.preview.stop_if_active(&id) {
            info!("preview of purchased track {id} stopped");
        }
    }

    /// Downloads fired right after payment; empty when disabled in settings.
    pub fn auto_downloads(&self, purchase: &Purchase, track: &Track) -> Vec<Artifact> {
        if !self.settings.auto_download {
            return Vec::new();
        }
        post_purchase_artifacts(purchase, track, &self.settings.entity)
    }

    pub fn success_artifact(&self, kind: SuccessDownload) -> Result<Artifact, CheckoutError> {
        self.checkout
            .as_ref()
            .ok_or(CheckoutError::NoActiveFlow)?
            .success_artifact(kind)
    }

    pub fn close_checkout(&mut self) {
        if let Some(flow) = self.checkout.take() {
            info!("checkout {:?} closed", flow.id());
        }
    }

    // ------------------------------------------------------------------
    // history
    // ------------------------------------------------------------------

    pub fn history(&self) -> &PurchaseHistory {
        &self.history
    }

    pub fn history_rows(&self) -> Vec<HistoryRow> {
        self.history.rows(&self.snapshot)
    }

    /// audio download for a past purchase, resolved through the snapshot
    pub fn history_artifact(&self, id: &PurchaseId) -> Option<Artifact> {
        let purchase = self.history.get(id)?;
        let track = self.snapshot.lookup(&purchase.music_id)?;
        Some(history_audio_artifact(&TrackSummary::from(track)))
    }
}

/// Locks the shared storefront, recovering the state if a holder panicked.
pub fn lock_store<M: MediaElement>(store: &Mutex<Storefront<M>>) -> MutexGuard<'_, Storefront<M>> {
    store
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Processes a confirmed payment end to end.
///
/// The lock is released while the simulated gateway and the license service
/// run, and taken once to apply the result. The automatic downloads happen
/// afterwards, outside the lock.
pub fn complete_payment<M: MediaElement>(
    store: &Mutex<Storefront<M>>,
    pending: PendingPayment,
    payments: &PaymentSimulator,
    sink: &dyn ArtifactSink,
) -> Option<Purchase> {
    let settled = payments.settle(pending);
    let track = settled.track.clone();

    let (purchase, downloads) = {
        let mut store = lock_store(store);
        let purchase = store.finish_payment(settled)?;
        let downloads = store.auto_downloads(&purchase, &track);
        (purchase, downloads)
    };

    deliver_all(sink, &downloads);
    Some(purchase)
}
