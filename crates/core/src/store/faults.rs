//! Probabilistic fault injection for store mutations.

use rand::Rng;
use tracing::debug;

use super::StoreError;

/// Fails store mutations at random with a configured probability.
///
/// Models network/storage flakiness. A rate of `0.0` never fails and
/// `1.0` always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultInjector {
    failure_rate: f64,
}

impl FaultInjector {
    /// Create an injector failing with the given probability.
    pub fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    /// An injector that never fails.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Configured failure probability.
    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    /// Roll the dice for `operation`.
    pub fn check(&self, operation: &str) -> Result<(), StoreError> {
        if self.failure_rate <= 0.0 {
            return Ok(());
        }
        if rand::thread_rng().gen_bool(self.failure_rate) {
            debug!("Injected transient fault in {}", operation);
            crate::metrics::TRANSIENT_FAULTS
                .with_label_values(&[operation])
                .inc();
            return Err(StoreError::TransientFault(operation.to_string()));
        }
        Ok(())
    }
}
