//! Controller identity as reported by the device layer
//!
//! A [`ControllerId`] is the opaque token the device layer assigns to one
//! physical device. It is stable while the device stays known to the OS and may
//! come back unchanged when the same device reconnects.
//!
//! A [`ControllerHandle`] pairs the identity with whatever metadata the device
//! layer could report at the time of the notification. The registry keeps the
//! latest handle it has seen for every tracked identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque per-device identity, used as the registry key
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerId(String);

impl ControllerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ControllerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ControllerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identity plus descriptive metadata for one controller
///
/// The discovery path and the connection callbacks do not always report the same
/// amount of detail, so the metadata is optional and gets refreshed whenever a
/// newer notification for the same identity arrives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerHandle {
    pub id: ControllerId,
    pub vendor_name: Option<String>,
    pub product_category: Option<String>,
}

impl ControllerHandle {
    /// Handle carrying only an identity
    pub fn new(id: impl Into<ControllerId>) -> Self {
        Self {
            id: id.into(),
            vendor_name: None,
            product_category: None,
        }
    }

    pub fn with_vendor_name(mut self, vendor_name: impl Into<String>) -> Self {
        self.vendor_name = Some(vendor_name.into());
        self
    }

    pub fn with_product_category(mut self, product_category: impl Into<String>) -> Self {
        self.product_category = Some(product_category.into());
        self
    }
}

impl fmt::Display for ControllerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.vendor_name {
            Some(name) if !name.trim().is_empty() => write!(f, "{} ({})", name.trim(), self.id),
            _ => write!(f, "({})", self.id),
        }
    }
}
