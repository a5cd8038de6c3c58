//! Core types and constants for the patient route harness

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
