//! Common infrastructure shared by the certaudit crates
//!
//! This crate provides:
//! - Logging bootstrap and structured audit log lines
//! - The fault taxonomy used by every pipeline stage

pub mod error;

pub use error::*;
