//! CSV input and output adapters.

pub mod export;
pub mod import;
