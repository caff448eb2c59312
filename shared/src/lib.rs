//! Shared types and models for the Sage 100 stock lookup platform
//!
//! This crate contains the read-model of the ERP (articles, warehouses, families),
//! the stock classifier and the exclusion policy. It is used by the backend and by
//! the browser helpers compiled to WASM.

pub mod exclusion;
pub mod models;
pub mod types;
pub mod validation;

pub use exclusion::*;
pub use models::*;
pub use types::*;
pub use validation::*;
