use std::{fmt::Display, str::FromStr};

use log::debug;
use rand::Rng;
use serde::Serialize;

use crate::{
    checkout::{
        artifacts::{Artifact, audio_artifact, license_artifact},
        error::CheckoutError,
        payment::{PaymentDetails, PendingPayment, generate_reference},
    },
    domain::{purchase::Purchase, track::Track},
    license::LicenseText,
};

/// Identifies one opening of the checkout wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FlowId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepName {
    Info,
    Payment,
    Success,
}

impl Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepName::Info => f.write_str("info"),
            StepName::Payment => f.write_str("payment"),
            StepName::Success => f.write_str("success"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub purchase: Purchase,
    pub license: LicenseText,
}

#[derive(Debug, Clone)]
pub enum CheckoutStep {
    Info,
    Payment(PaymentDetails),
    Success(Completion),
}

impl CheckoutStep {
    pub fn name(&self) -> StepName {
        match self {
            CheckoutStep::Info => StepName::Info,
            CheckoutStep::Payment(_) => StepName::Payment,
            CheckoutStep::Success(_) => StepName::Success,
        }
    }
}

/// Values the payment step lets the buyer copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentField {
    Entity,
    Reference,
}

impl FromStr for PaymentField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entity" => Ok(PaymentField::Entity),
            "reference" => Ok(PaymentField::Reference),
            other => Err(format!("unknown payment field '{other}'")),
        }
    }
}

/// Downloads offered on the success step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessDownload {
    Audio,
    License,
}

impl FromStr for SuccessDownload {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(SuccessDownload::Audio),
            "license" => Ok(SuccessDownload::License),
            other => Err(format!("unknown download '{other}'")),
        }
    }
}

/// Three-step checkout wizard: info, payment, success.
///
/// Payment may go back to info; success is terminal. Closing the wizard
/// simply drops it.
#[derive(Debug, Clone)]
pub struct PurchaseFlow {
    id: FlowId,
    track: Track,
    entity: String,
    step: CheckoutStep,
    processing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub id: FlowId,
    pub step: StepName,
    pub track: Track,
    pub price: String,
    pub processing: bool,
    pub payment: Option<PaymentDetails>,
    pub purchase: Option<Purchase>,
    pub license_generated: Option<bool>,
}

impl PurchaseFlow {
    pub fn new(id: FlowId, track: Track, entity: String) -> Self {
        Self {
            id,
            track,
            entity,
            step: CheckoutStep::Info,
            processing: false,
        }
    }

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn step(&self) -> &CheckoutStep {
        &self.step
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    fn expect_step(&self, expected: StepName) -> Result<(), CheckoutError> {
        let actual = self.step.name();
        if actual == expected {
            Ok(())
        } else {
            Err(CheckoutError::WrongStep { expected, actual })
        }
    }

    /// info -> payment, with a freshly generated reference
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> Result<PaymentDetails, CheckoutError> {
        self.expect_step(StepName::Info)?;
        let details = PaymentDetails {
            entity: self.entity.clone(),
            reference: generate_reference(rng),
        };
        self.step = CheckoutStep::Payment(details.clone());
        Ok(details)
    }

    pub fn back(&mut self) -> Result<(), CheckoutError> {
        self.expect_step(StepName::Payment)?;
        if self.processing {
            return Err(CheckoutError::AlreadyProcessing);
        }
        self.step = CheckoutStep::Info;
        Ok(())
    }

    /// Confirms the payment. Disabled while a confirmation is in flight.
    pub fn begin_payment(&mut self) -> Result<PendingPayment, CheckoutError> {
        let details = match &self.step {
            CheckoutStep::Payment(details) => details.clone(),
            other => {
                return Err(CheckoutError::WrongStep {
                    expected: StepName::Payment,
                    actual: other.name(),
                });
            }
        };
        if self.processing {
            return Err(CheckoutError::AlreadyProcessing);
        }
        self.processing = true;
        debug!("flow {:?}: payment processing", self.id);

        Ok(PendingPayment {
            flow: self.id,
            track: self.track.clone(),
            details,
        })
    }

    /// payment -> success
    pub fn complete(&mut self, purchase: Purchase, license: LicenseText) -> Result<(), CheckoutError> {
        self.expect_step(StepName::Payment)?;
        self.processing = false;
        self.step = CheckoutStep::Success(Completion { purchase, license });
        Ok(())
    }

    pub fn copy_value(&self, field: PaymentField) -> Result<String, CheckoutError> {
        match (&self.step, field) {
            (CheckoutStep::Payment(details), PaymentField::Entity) => Ok(details.entity.clone()),
            (CheckoutStep::Payment(details), PaymentField::Reference) => {
                Ok(details.reference.clone())
            }
            (other, _) => Err(CheckoutError::WrongStep {
                expected: StepName::Payment,
                actual: other.name(),
            }),
        }
    }

    /// Re-download of the audio, or the license text (the fallback message
    /// when generation failed).
    pub fn success_artifact(&self, kind: SuccessDownload) -> Result<Artifact, CheckoutError> {
        match &self.step {
            CheckoutStep::Success(completion) => Ok(match kind {
                SuccessDownload::Audio => audio_artifact(&self.track),
                SuccessDownload::License => license_artifact(&self.track, &completion.license),
            }),
            other => Err(CheckoutError::WrongStep {
                expected: StepName::Success,
                actual: other.name(),
            }),
        }
    }

    pub fn view(&self) -> CheckoutView {
        let (payment, purchase, license_generated) = match &self.step {
            CheckoutStep::Info => (None, None, None),
            CheckoutStep::Payment(details) => (Some(details.clone()), None, None),
            CheckoutStep::Success(completion) => (
                None,
                Some(completion.purchase.clone()),
                Some(completion.license.generated),
            ),
        };
        CheckoutView {
            id: self.id,
            step: self.step.name(),
            track: self.track.clone(),
            price: self.track.price.to_string(),
            processing: self.processing,
            payment,
            purchase,
            license_generated,
        }
    }
}
