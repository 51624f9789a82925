//! Services module - business logic and the Pterodactyl integration.
//!
//! This module contains:
//! - `panel_config`: Layered panel configuration (order, global settings, defaults)
//! - `panel`: Pterodactyl API client
//! - `resolvers`: Find-or-create for users, allocations and eggs; server payloads
//! - `provisioner`: Lifecycle orchestration over service records
//! - `token`: JWT handling for the admin and client APIs

pub mod panel;
pub mod panel_config;
pub mod provisioner;
pub mod resolvers;
pub mod token;

// Re-export commonly used types for convenience
pub use panel::{PanelApiError, PanelClient};
pub use panel_config::{ConfigurationError, PanelConfig, PanelConfigLayer, PanelConfigResolver};
pub use provisioner::{Provisioner, ProvisioningError, ProvisioningFailure};
pub use resolvers::ResolveError;
pub use token::{Claims, Role};
