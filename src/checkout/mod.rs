//! Checkout wizard, simulated payment and post-purchase artifacts

pub mod artifacts;
pub mod error;
pub mod flow;
pub mod payment;
pub mod receipt;
