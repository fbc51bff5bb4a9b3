use thiserror::Error;

use crate::checkout::flow::StepName;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("the cart is empty")]
    EmptyCart,

    #[error("no checkout in progress")]
    NoActiveFlow,

    #[error("checkout is at step {actual}, expected {expected}")]
    WrongStep { expected: StepName, actual: StepName },

    #[error("payment is already being processed")]
    AlreadyProcessing,
}
