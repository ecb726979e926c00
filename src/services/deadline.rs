use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{AppError, AppResult};

/// Point in time after which a distillation must stop issuing storage calls
///
/// `Deadline::none()` never expires. Otherwise every guarded call is refused
/// once the instant has passed and is cut short if it overruns it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Runs one storage call under the deadline
    ///
    /// `stage` names the pipeline step in the resulting [`AppError::Cancelled`].
    pub async fn guard<T, F>(&self, stage: &'static str, call: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let Some(at) = self.0 else {
            return call.await;
        };

        if Instant::now() >= at {
            tracing::warn!(stage, "Deadline passed before storage call");
            return Err(AppError::Cancelled(stage));
        }

        match tokio::time::timeout_at(at, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(stage, "Storage call overran deadline");
                Err(AppError::Cancelled(stage))
            }
        }
    }
}
