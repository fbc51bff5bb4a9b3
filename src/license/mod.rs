//! License text generation, an external and failure-prone collaborator

use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

pub mod gemini;

pub use gemini::GeminiLicenseClient;

/// Shown (and downloaded) in place of the license when generation fails.
pub const LICENSE_FALLBACK: &str =
    "Falha ao gerar o documento de licença automatizado. Entre em contacto com o suporte.";

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("license generator is not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("license service returned {0}: {1}")]
    Api(u16, String),

    #[error("malformed license response: {0}")]
    Parse(String),

    #[error("license service returned no text")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRequest {
    pub track_title: String,
    pub artist_name: String,
    pub buyer_name: String,
}

/// License document attached to a completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseText {
    pub text: String,
    /// false when `text` is the fallback message
    pub generated: bool,
}

impl LicenseText {
    pub fn fallback() -> Self {
        Self {
            text: LICENSE_FALLBACK.to_string(),
            generated: false,
        }
    }
}

pub trait LicenseGenerator: Send + Sync {
    fn generate(&self, request: &LicenseRequest) -> Result<String, LicenseError>;
}

/// Generator used when no API key is available.
#[derive(Debug, Default)]
pub struct Unconfigured;

impl LicenseGenerator for Unconfigured {
    fn generate(&self, _request: &LicenseRequest) -> Result<String, LicenseError> {
        Err(LicenseError::NotConfigured)
    }
}

/// Single attempt; any failure is logged and replaced by [`LICENSE_FALLBACK`].
pub fn license_or_fallback(
    generator: &dyn LicenseGenerator,
    request: &LicenseRequest,
) -> LicenseText {
    match generator.generate(request) {
        Ok(text) => {
            info!("license generated for \"{}\"", request.track_title);
            LicenseText {
                text,
                generated: true,
            }
        }
        Err(e) => {
            warn!(
                "license generation failed for \"{}\": {e}",
                request.track_title
            );
            LicenseText::fallback()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Generator returning a canned result and remembering its requests.
    pub(crate) struct FakeGenerator {
        pub result: Result<String, fn() -> LicenseError>,
        pub requests: Mutex<Vec<LicenseRequest>>,
    }

    impl FakeGenerator {
        pub fn ok(text: &str) -> Self {
            Self {
                result: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                result: Err(|| LicenseError::Network("connection reset".into())),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl LicenseGenerator for FakeGenerator {
        fn generate(&self, request: &LicenseRequest) -> Result<String, LicenseError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.result {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn request() -> LicenseRequest {
        LicenseRequest {
            track_title: "Semba Roots".into(),
            artist_name: "Ngola Beats".into(),
            buyer_name: "Cliente Muvuka".into(),
        }
    }

    #[test]
    fn success_is_marked_generated() {
        let generator = FakeGenerator::ok("CONTRATO");

        let license = license_or_fallback(&generator, &request());

        assert_eq!(license.text, "CONTRATO");
        assert!(license.generated);
        assert_eq!(generator.requests.lock().unwrap()[0], request());
    }

    #[test]
    fn failure_yields_fallback() {
        let license = license_or_fallback(&FakeGenerator::failing(), &request());

        assert_eq!(license, LicenseText::fallback());
        assert_eq!(license.text, LICENSE_FALLBACK);
    }

    #[test]
    fn unconfigured_yields_fallback() {
        let license = license_or_fallback(&Unconfigured, &request());

        assert!(!license.generated);
    }
}
