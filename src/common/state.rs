use std::sync::Arc;

use crate::config::Config;
use crate::services::{IdentityVerifier, TelemetryService};

/// Shared context handed to every request. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub telemetry: TelemetryService,
    /// `None` when no identity service is configured; requests then pass
    /// unauthenticated.
    pub identity: Option<Arc<dyn IdentityVerifier>>,
}

impl AppState {
    pub fn new(
        config: Config,
        telemetry: TelemetryService,
        identity: Option<Arc<dyn IdentityVerifier>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            telemetry,
            identity,
        }
    }
}
