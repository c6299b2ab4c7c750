//! Fault classification and logging
//!
//! Provides:
//! - `FaultScope`, the granularity at which a failure is recovered
//! - `LoggingTransformer`, the `env_logger` bootstrap and audit log helpers

pub mod logging;
pub mod types;

pub use logging::{metrics, LoggingTransformer};
pub use types::FaultScope;
