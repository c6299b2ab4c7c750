//! SHA-1 collision-attack detection for certificate records
//!
//! Two interchangeable strategies share the [`CollisionAnalyzer`] contract:
//! - [`InProcessAnalyzer`] drives a collision-detecting SHA-1 state machine
//!   directly, one fresh context per record
//! - [`IsolatedAnalyzer`] runs an external detection tool per record, so a crash
//!   or hang in detection cannot take the host process down

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod analyzer;
pub mod context;
pub mod error;
pub mod in_process;
pub mod isolated;

// Re-export error types
pub use error::{DetectError, Result};

pub use analyzer::{Analyzer, AnalyzerMode, CollisionAnalyzer};
pub use context::{Finalized, Sha1DcContext};
pub use in_process::{InProcessAnalyzer, DEFAULT_CHUNK_SIZE};
pub use isolated::{scan_output, IsolatedAnalyzer, COLLISION_SENTINEL, DEFAULT_TIMEOUT, DEFAULT_TOOL};
