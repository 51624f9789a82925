//! Data models for the provisioner.
//!
//! - [`ServiceRecord`] - persisted per-order server state
//! - [`Order`] / [`Client`] - billing entities read from the billing store
//! - request bodies accepted by the HTTP handlers

pub mod billing;
pub mod requests;
pub mod service;

pub use billing::{Client, Order, FALLBACK_EMAIL};
pub use requests::{
    AdminChangePasswordRequest, ClientChangePasswordRequest, OrderRequest, PanelSettings,
    PasswordChange, ServerQuery, SuccessResponse, UpdateServiceRequest,
};
pub use service::{NewServiceRecord, ServiceRecord, ServiceRow, ServiceStatus, ServiceView};
