//! In-memory state of the storefront: catalog, cart and purchase history

pub mod cart;
pub mod catalog;
pub mod error;
pub mod history;
pub mod seed;
