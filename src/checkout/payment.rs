//! Simulated payment: synthetic references and artificial processing latency

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Local;
use log::info;
use rand::Rng;
use serde::Serialize;

use crate::{
    checkout::flow::FlowId,
    domain::{
        purchase::{Purchase, PurchaseIds, PurchaseStatus},
        track::Track,
    },
    license::{LicenseGenerator, LicenseRequest, LicenseText, license_or_fallback},
};

/// Bank-payment style details shown on the payment step.
///
/// Display only: nothing validates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentDetails {
    pub entity: String,
    pub reference: String,
}

/// nine random digits, never starting with zero
pub fn generate_reference<R: Rng>(rng: &mut R) -> String {
    rng.gen_range(100_000_000u32..=999_999_999).to_string()
}

/// Ticket for a payment that has been confirmed but not yet settled.
#[derive(Debug, Clone)]
pub struct PendingPayment {
    pub flow: FlowId,
    pub track: Track,
    pub details: PaymentDetails,
}

/// Outcome of the simulated processing, ready to be applied to the session.
#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub flow: FlowId,
    pub track: Track,
    pub purchase: Purchase,
    pub license: LicenseText,
}

/// Stands in for a payment gateway: waits, then always succeeds.
pub struct PaymentSimulator {
    delay: Duration,
    buyer_name: String,
    license: Arc<dyn LicenseGenerator>,
    ids: Mutex<PurchaseIds>,
}

impl PaymentSimulator {
    pub fn new(delay: Duration, buyer_name: String, license: Arc<dyn LicenseGenerator>) -> Self {
        Self {
            delay,
            buyer_name,
            license,
            ids: Mutex::new(PurchaseIds::default()),
        }
    }

    pub fn buyer_name(&self) -> &str {
        &self.buyer_name
    }

    /// Blocks for the processing delay, records the purchase, then asks for
    /// the license. License failures never fail the payment.
    pub fn settle(&self, pending: PendingPayment) -> SettledPayment {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let now = Local::now();
        let id = {
            let mut ids = self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            ids.next(now)
        };
        let purchase = Purchase {
            id,
            music_id: pending.track.id.clone(),
            date: now,
            amount: pending.track.price,
            reference: pending.details.reference.clone(),
            buyer_name: self.buyer_name.clone(),
            status: PurchaseStatus::Completed,
        };
        info!(
            "payment settled: {} for track {} ({})",
            purchase.id, purchase.music_id, purchase.amount
        );

        let license = license_or_fallback(
            self.license.as_ref(),
            &LicenseRequest {
                track_title: pending.track.title.clone(),
                artist_name: pending.track.artist.clone(),
                buyer_name: self.buyer_name.clone(),
            },
        );

        SettledPayment {
            flow: pending.flow,
            track: pending.track,
            purchase,
            license,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        domain::{price::Price, track::mock_track},
        license::{LICENSE_FALLBACK, tests::FakeGenerator},
    };

    fn pending(track: Track) -> PendingPayment {
        PendingPayment {
            flow: FlowId(3),
            track,
            details: PaymentDetails {
                entity: "00342".into(),
                reference: "555666777".into(),
            },
        }
    }

    #[test]
    fn references_are_nine_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let reference = generate_reference(&mut rng);
            assert_eq!(reference.len(), 9);
            assert!(reference.chars().all(|c| c.is_ascii_digit()));
            assert!(!reference.starts_with('0'));
        }
    }

    #[test]
    fn settle_builds_completed_purchase() {
        let generator = Arc::new(FakeGenerator::ok("CONTRATO"));
        let simulator = PaymentSimulator::new(Duration::ZERO, "Cliente Muvuka".into(), generator.clone());
        let track = mock_track("9", "Semba Roots", "Ngola Beats", "Semba", 12000);

        let settled = simulator.settle(pending(track));

        assert_eq!(settled.flow, FlowId(3));
        assert_eq!(settled.purchase.music_id.as_str(), "9");
        assert_eq!(settled.purchase.amount, Price(12000));
        assert_eq!(settled.purchase.reference, "555666777");
        assert_eq!(settled.purchase.buyer_name, "Cliente Muvuka");
        assert_eq!(settled.purchase.status, PurchaseStatus::Completed);
        assert!(settled.purchase.id.0.starts_with("PUR-"));
        assert_eq!(settled.license.text, "CONTRATO");

        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests[0].track_title, "Semba Roots");
        assert_eq!(requests[0].artist_name, "Ngola Beats");
        assert_eq!(requests[0].buyer_name, "Cliente Muvuka");
    }

    #[test]
    fn license_failure_still_settles() {
        let simulator = PaymentSimulator::new(
            Duration::ZERO,
            "Cliente Muvuka".into(),
            Arc::new(FakeGenerator::failing()),
        );

        let settled = simulator.settle(pending(mock_track("1", "A", "B", "C", 1)));

        assert_eq!(settled.purchase.status, PurchaseStatus::Completed);
        assert_eq!(settled.license.text, LICENSE_FALLBACK);
        assert!(!settled.license.generated);
    }

    #[test]
    fn consecutive_purchases_get_distinct_ids() {
        let simulator = PaymentSimulator::new(
            Duration::ZERO,
            "Cliente Muvuka".into(),
            Arc::new(FakeGenerator::ok("x")),
        );

        let a = simulator.settle(pending(mock_track("1", "A", "B", "C", 1)));
        let b = simulator.settle(pending(mock_track("2", "A", "B", "C", 1)));

        assert_ne!(a.purchase.id, b.purchase.id);
    }

    #[test]
    fn settle_waits_for_the_delay() {
        let simulator = PaymentSimulator::new(
            Duration::from_millis(30),
            "Cliente Muvuka".into(),
            Arc::new(FakeGenerator::ok("x")),
        );
        let started = std::time::Instant::now();

        simulator.settle(pending(mock_track("1", "A", "B", "C", 1)));

        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
