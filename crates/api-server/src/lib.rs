#![warn(clippy::unwrap_used)]

pub mod checkout_rest;
pub mod loyalty_rest;
pub mod rest;
pub mod server;

pub use rest::AppState;
pub use server::{router, ApiServer};
