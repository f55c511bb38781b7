//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No field values or key material** may appear in any span attribute or
//!   log field. User ids and field slugs are fine.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), overridden by
//!   `RUST_LOG` when set.

pub mod init;

pub use init::init_telemetry;
