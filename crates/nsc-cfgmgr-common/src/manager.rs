//! Reconciliation trait and common abstractions.
//!
//! This module provides the base trait driven by the daemon loop, the
//! model-type key prefixes used to scope rendered entries, and field/value
//! helpers shared by the configuration entry builders.

use async_trait::async_trait;

/// Model object kinds that own rendered configuration entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    /// A declarative network service.
    NetworkService,
    /// A host running a virtual switch.
    NetworkNode,
    /// A cross-host overlay definition.
    NetworkNodeOverlay,
}

impl ModelType {
    /// Returns the model type name used as a key prefix.
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::NetworkService => "NetworkService",
            ModelType::NetworkNode => "NetworkNode",
            ModelType::NetworkNodeOverlay => "NetworkNodeOverlay",
        }
    }

    /// Builds the owner key `<kind>/<name>` for an object of this type.
    pub fn key(&self, name: &str) -> String {
        format!("{}/{}", self.name(), name)
    }
}

/// Base trait for reconciliation agents.
///
/// The daemon calls [`Orch::do_task`] once per reconciliation pass when
/// [`Orch::has_pending_tasks`] reports work. There is no retry inside a
/// pass; failed work is picked up again on the next pass.
#[async_trait]
pub trait Orch: Send + Sync {
    /// Returns the name of this Orch (for logging and debugging).
    fn name(&self) -> &str;

    /// Processes all pending work.
    async fn do_task(&mut self);

    /// Returns true if this Orch has pending work.
    fn has_pending_tasks(&self) -> bool {
        false
    }

    /// Dumps pending tasks for debugging.
    fn dump_pending_tasks(&self) -> Vec<String> {
        vec![]
    }
}

/// Key-value tuple representing a field and its value.
pub type FieldValue = (String, String);

/// Collection of field-value pairs for a configuration entry.
pub type FieldValues = Vec<FieldValue>;

/// Helper trait for working with field-value collections.
pub trait FieldValuesExt {
    /// Gets the value for a field, if present.
    fn get_field(&self, field: &str) -> Option<&str>;
}

impl FieldValuesExt for FieldValues {
    fn get_field(&self, field: &str) -> Option<&str> {
        self.iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }
}

/// Builds a FieldValues collection from key-value pairs.
#[macro_export]
macro_rules! field_values {
    ($($field:expr => $value:expr),* $(,)?) => {
        vec![
            $(($field.to_string(), $value.to_string()),)*
        ]
    };
}
