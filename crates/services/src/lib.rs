//! Services domain module.
//!
//! This crate contains the customer-facing service catalog types read by the
//! billing core: purchased hosting/domain services and their plans. It is pure
//! domain data (no IO, no HTTP, no storage); provisioning flows that create and
//! mutate services live outside this workspace.

pub mod plan;
pub mod service;

pub use plan::Plan;
pub use service::{Service, ServiceStatus, ServiceType};
