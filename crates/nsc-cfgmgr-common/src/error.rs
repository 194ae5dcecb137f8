//! Error types for rendering operations.
//!
//! Every fatal-connection error carries enough context (service name,
//! endpoints, overlay) that its `Display` output doubles as the status
//! message appended to the owning network service.

use std::io;
use thiserror::Error;

/// Result type alias for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while rendering a connection.
#[derive(Debug, Error)]
pub enum RenderError {
    /// More than two endpoint references were declared for an L2PP connection.
    #[error("network-service: {service}, too many connection segments specified for a l2pp connection ({count} > 2)")]
    TooManySegments {
        /// Owning network service.
        service: String,
        /// Number of endpoint candidates seen.
        count: usize,
    },

    /// At least one workload is unplaced or placed on an unknown host.
    #[error("network-service: {service}, not all workloads in this connection are mapped to hosts: {}", .unplaced.join(", "))]
    PlacementIncomplete {
        /// Owning network service.
        service: String,
        /// The workload references that failed placement.
        unplaced: Vec<String>,
    },

    /// A referenced interface does not exist on its workload or host.
    #[error("network-service: {service}, interface {interface} not found on {parent}")]
    UnknownInterface {
        /// Owning network service.
        service: String,
        /// Workload or host that was searched.
        parent: String,
        /// The interface name.
        interface: String,
    },

    /// A host-interface label selector did not match exactly one interface.
    #[error("network-service: {service}, host interface labels {labels:?} on host {host} must match only 1 interface, matched {matched}")]
    AmbiguousLabel {
        /// Owning network service.
        service: String,
        /// Host the labels were resolved against.
        host: String,
        /// The label selector.
        labels: Vec<String>,
        /// Number of matching interfaces.
        matched: usize,
    },

    /// A label selector was used without exactly one resolved endpoint and one label.
    #[error("network-service: {service}, need 1 interface in conn and 1 host interface label, found {resolved} interface(s) and {labels} label(s)")]
    InvalidLabelSelector {
        /// Owning network service.
        service: String,
        /// Endpoints resolved before the label stage.
        resolved: usize,
        /// Number of label entries.
        labels: usize,
    },

    /// Fewer than two endpoints remained after resolution.
    #[error("network-service: {service}, l2pp connection needs 2 endpoints, found {found}")]
    IncompleteConnection {
        /// Owning network service.
        service: String,
        /// Number of endpoints resolved.
        found: usize,
    },

    /// Static host endpoints resolved to different hosts.
    #[error("network-service: {service}, hosts {host_a}/{host_b} must be the same")]
    HostMismatch {
        /// Owning network service.
        service: String,
        /// Host of the first endpoint.
        host_a: String,
        /// Host of the second endpoint.
        host_b: String,
    },

    /// Endpoints are on different hosts and no overlay was named.
    #[error("network-service: {service}, {endpoint_a} to {endpoint_b} no host overlay specified")]
    MissingOverlay {
        /// Owning network service.
        service: String,
        /// First endpoint as `parent/interface`.
        endpoint_a: String,
        /// Second endpoint as `parent/interface`.
        endpoint_b: String,
    },

    /// The named overlay is not present in the overlay registry.
    #[error("network-service: {service}, {endpoint_a} to {endpoint_b} referencing a missing host overlay: {overlay}")]
    UnknownOverlay {
        /// Owning network service.
        service: String,
        /// First endpoint as `parent/interface`.
        endpoint_a: String,
        /// Second endpoint as `parent/interface`.
        endpoint_b: String,
        /// Overlay name.
        overlay: String,
    },

    /// The overlay's service-mesh topology cannot carry an L2PP connection.
    #[error("network-service: {service}, conn: {conn_index}, {endpoint_a} to {endpoint_b} host overlay: {overlay} topology {topology} not supported for l2pp")]
    UnsupportedOverlayTopology {
        /// Owning network service.
        service: String,
        /// Connection index inside the service.
        conn_index: u32,
        /// First endpoint as `parent/interface`.
        endpoint_a: String,
        /// Second endpoint as `parent/interface`.
        endpoint_b: String,
        /// Overlay name.
        overlay: String,
        /// The rejected topology.
        topology: String,
    },

    /// The overlay's connection transport is not implemented.
    #[error("network-service: {service}, conn: {conn_index}, {endpoint_a} to {endpoint_b} host overlay: {overlay} transport {transport} not implemented")]
    UnsupportedOverlayTransport {
        /// Owning network service.
        service: String,
        /// Connection index inside the service.
        conn_index: u32,
        /// First endpoint as `parent/interface`.
        endpoint_a: String,
        /// Second endpoint as `parent/interface`.
        endpoint_b: String,
        /// Overlay name.
        overlay: String,
        /// The rejected transport.
        transport: String,
    },

    /// No switch-facing interface can be built for this interface type.
    #[error("network-service: {service}, interface {parent}/{interface} of type {if_type} cannot be attached to the vswitch")]
    UnsupportedInterfaceType {
        /// Owning network service.
        service: String,
        /// Workload or host owning the interface.
        parent: String,
        /// The interface name.
        interface: String,
        /// The interface type.
        if_type: String,
    },

    /// A non-L2PP connection was handed to the L2PP renderer.
    #[error("network-service: {service}, conn: {conn_index}, connection type {conn_type} not supported")]
    UnsupportedConnectionType {
        /// Owning network service.
        service: String,
        /// Connection index inside the service.
        conn_index: u32,
        /// The connection type.
        conn_type: String,
    },

    /// The overlay mesh builder failed.
    #[error("host overlay {overlay}: {message}")]
    Overlay {
        /// Overlay name.
        overlay: String,
        /// Error message.
        message: String,
    },

    /// Configuration or snapshot validation error.
    #[error("Invalid configuration for {field}: {message}")]
    Config {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Reading configuration from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RenderError {
    /// Creates an unknown interface error.
    pub fn unknown_interface(
        service: impl Into<String>,
        parent: impl Into<String>,
        interface: impl Into<String>,
    ) -> Self {
        Self::UnknownInterface {
            service: service.into(),
            parent: parent.into(),
            interface: interface.into(),
        }
    }

    /// Creates an overlay builder error.
    pub fn overlay(overlay: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Overlay {
            overlay: overlay.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error aborts only the connection being rendered.
    pub fn is_fatal_connection(&self) -> bool {
        !matches!(self, RenderError::Config { .. } | RenderError::Io(_))
    }
}
