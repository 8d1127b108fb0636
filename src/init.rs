use crate::error::{Error, Result};
use crate::layer::ChainLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Install a global `tracing` subscriber that forwards every event to the
/// process-wide logger.
///
/// **Behavior**
///
/// Equivalent to [`init_tracing_with_layer`] with [`ChainLayer::global`].
/// Reconfiguring the process-wide logger later is picked up automatically.
///
/// **Errors**
///
/// [`Error::Subscriber`] if a global subscriber is already installed.
pub fn init_tracing() -> Result<()> {
    init_tracing_with_layer(ChainLayer::global())
}

/// Install a [`Registry`] combined with `layer` as the global default
/// subscriber.
pub fn init_tracing_with_layer(layer: ChainLayer) -> Result<()> {
    let subscriber = Registry::default().with(layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Subscriber(e.to_string()))
}
