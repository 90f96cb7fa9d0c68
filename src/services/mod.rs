pub mod identity;
pub mod telemetry;

pub use identity::{HttpIdentityVerifier, IdentityError, IdentityVerifier};
pub use telemetry::TelemetryService;
