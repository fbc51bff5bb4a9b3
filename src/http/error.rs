use rouille::Response;
use thiserror::Error;

use crate::{checkout::error::CheckoutError, store::error::CatalogError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TrackNotFound(id) => ApiError::NotFound(format!("track {} not found", id)),

            CatalogError::DuplicateId(_)
            | CatalogError::InvalidBpm(_)
            | CatalogError::Read { .. }
            | CatalogError::Parse(_) => ApiError::Internal("internal server error".into()),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::NoActiveFlow => ApiError::NotFound(err.to_string()),

            CheckoutError::EmptyCart
            | CheckoutError::WrongStep { .. }
            | CheckoutError::AlreadyProcessing => ApiError::Conflict(err.to_string()),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Conflict(_) => 409,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        Response::text(self.to_string()).with_status_code(status)
    }
}
