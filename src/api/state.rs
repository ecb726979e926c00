use std::sync::Arc;
use std::time::Duration;

use crate::services::{Deadline, Distiller};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub distiller: Arc<Distiller>,
    /// Budget for one distillation; `None` runs without a deadline
    pub request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(distiller: Distiller, request_timeout: Option<Duration>) -> Self {
        Self {
            distiller: Arc::new(distiller),
            request_timeout,
        }
    }

    /// Deadline for a request starting now
    pub fn deadline(&self) -> Deadline {
        self.request_timeout
            .map(Deadline::after)
            .unwrap_or_default()
    }
}
