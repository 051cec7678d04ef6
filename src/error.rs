//! Error types of the controller core

use thiserror::Error;

/// Errors surfaced by [`ControllerRegistry`](crate::registry::ControllerRegistry)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A wireless discovery started earlier has not completed yet
    #[error("An operation is already in progress: wireless discovery")]
    DiscoveryInProgress,

    /// The device layer released the discovery without completing it
    #[error("Wireless discovery was abandoned by the device layer")]
    DiscoveryAbandoned,
}

/// Errors raised while bringing up a device layer
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to initialize device layer: {0}")]
    InitializationError(String),
}
