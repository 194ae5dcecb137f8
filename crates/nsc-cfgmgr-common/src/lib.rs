//! Common infrastructure for network-service configuration renderers.
//!
//! This crate provides shared functionality for the controller's
//! rendering daemons (l2ppmgrd today):
//!
//! - [`Orch`]: Reconciliation trait driven once per pass by the daemon loop
//! - [`error`]: The [`RenderError`] taxonomy shared by every renderer
//! - [`ModelType`]: Key prefixes for entries owned by a model object
//! - [`FieldValues`]: Field/value helpers used by emitted config entries
//!
//! # Architecture
//!
//! Renderers follow this pattern:
//!
//! 1. Read the declarative network service from the configuration snapshot
//! 2. Gather placement and registry facts through injected collaborators
//! 3. Decide the realization and emit key/value configuration entries
//! 4. Record entries and diagnostics on the owning service's status
//!
//! # Example
//!
//! ```ignore
//! use nsc_cfgmgr_common::{error::RenderResult, ModelType, RenderError};
//!
//! fn owner_key(service: &str) -> RenderResult<String> {
//!     if service.is_empty() {
//!         return Err(RenderError::config("service", "empty service name"));
//!     }
//!     Ok(ModelType::NetworkService.key(service))
//! }
//! ```

pub mod error;
pub mod manager;

// Re-export commonly used items at crate root
pub use error::{RenderError, RenderResult};
pub use manager::{FieldValue, FieldValues, FieldValuesExt, ModelType, Orch};
