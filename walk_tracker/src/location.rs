use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use walk_tracker_lib::location_sample::LocationSample;

use crate::LocationError;

pub type LocationUpdate = Result<LocationSample, LocationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// An open stream of updates from a provider. Errors arrive on the same
/// channel as fixes.
#[derive(Debug)]
pub struct LocationSubscription {
    pub id: SubscriptionId,
    pub updates: mpsc::UnboundedReceiver<LocationUpdate>,
}

/// The device positioning service.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// A single fix, as soon as one is available.
    async fn request_once(&self) -> Result<LocationSample, LocationError>;

    fn subscribe(&self) -> Result<LocationSubscription, LocationError>;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// Holds a subscription open and unsubscribes when dropped, so every exit
/// path releases it.
pub(crate) struct SubscriptionGuard {
    provider: Arc<dyn LocationProvider>,
    subscription: LocationSubscription,
}

impl SubscriptionGuard {
    pub(crate) fn open(provider: &Arc<dyn LocationProvider>) -> Result<Self, LocationError> {
        let subscription = provider.subscribe()?;
        tracing::debug!(id = subscription.id.0, "Subscribed to location updates");
        Ok(Self {
            provider: provider.clone(),
            subscription,
        })
    }

    pub(crate) async fn next(&mut self) -> Option<LocationUpdate> {
        self.subscription.updates.recv().await
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.provider.unsubscribe(self.subscription.id);
        tracing::debug!(id = self.subscription.id.0, "Unsubscribed from location updates");
    }
}
