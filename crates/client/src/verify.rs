use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use satya_core::{Session, VerdictResult};

use crate::error::{ClientError, Result};
use crate::ports::VerdictService;

/// Submits claims to the verdict service, one request at a time, no retry.
pub struct ClaimSubmitter {
    service: Arc<dyn VerdictService>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the request settles or is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ClaimSubmitter {
    pub fn new(service: Arc<dyn VerdictService>) -> Self {
        Self {
            service,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn submit(&self, session: Option<&Session>, claim_text: &str) -> Result<VerdictResult> {
        let Some(session) = session else {
            return Err(ClientError::Unauthenticated("verify claims"));
        };
        let claim_text = claim_text.trim();
        if claim_text.is_empty() {
            return Err(ClientError::EmptyInput("claim"));
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ClientError::InFlight("verification"));
        }
        let _guard = InFlightGuard(&self.in_flight);

        match self.service.verify(claim_text, &session.user_id).await {
            Ok(result) => {
                info!("claim verified as {}", result.verdict);
                Ok(result)
            }
            Err(e) => {
                warn!("verification failed: {e:#}");
                Err(ClientError::mutation("verify", &e))
            }
        }
    }
}
