//! Holds the active collection strategy.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::model::CollectionResult;
use crate::strategy::{CollectResult, CollectionStrategy};

/// Owns exactly one [`CollectionStrategy`] and forwards passes to it.
pub struct CollectionCoordinator {
    strategy: Box<dyn CollectionStrategy>,
}

impl CollectionCoordinator {
    pub fn new(strategy: Box<dyn CollectionStrategy>) -> Self {
        Self { strategy }
    }

    /// Replaces the active strategy.
    pub fn set_strategy(&mut self, strategy: Box<dyn CollectionStrategy>) {
        info!(
            "Switching collection strategy from {} to {}",
            self.strategy.name(),
            strategy.name()
        );
        self.strategy = strategy;
    }

    pub fn strategy(&self) -> &dyn CollectionStrategy {
        self.strategy.as_ref()
    }

    /// Runs one pass with the active strategy.
    pub async fn collect(
        &self,
        interpreter: &str,
        cancel: &CancellationToken,
    ) -> CollectResult<CollectionResult> {
        info!("Collecting with the {} strategy", self.strategy.name());
        self.strategy.collect(interpreter, cancel).await
    }
}
