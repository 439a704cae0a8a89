//! Error types for the instancing subsystem

use crate::assets::ImportError;
use thiserror::Error;

/// Errors raised by transform pools, mesh resources and the model repository
#[derive(Error, Debug)]
pub enum InstancingError {
    /// Operation referenced an unknown or already destroyed handle
    #[error("Invalid handle: {handle}")]
    InvalidHandle {
        /// Display form of the offending handle
        handle: String,
    },

    /// No free transform slot is left
    #[error("Transform pool exhausted: capacity {capacity}, {requested} slot(s) requested")]
    PoolExhausted {
        /// Total slots in the pool
        capacity: u32,
        /// Slots the failed call needed
        requested: u32,
    },

    /// Slot index out of range, or freed while not in use
    #[error("Invalid slot {index}: {reason}")]
    InvalidSlot {
        /// Slot index
        index: u32,
        /// Why the slot was rejected
        reason: &'static str,
    },

    /// Host or device allocation failed
    #[error("Allocation failed: {reason}")]
    Allocation {
        /// Description of the failed allocation
        reason: String,
    },

    /// Geometry upload could not be performed
    #[error("Upload failed: {reason}")]
    Upload {
        /// Description of the failure
        reason: String,
    },

    /// Mesh import failed
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    /// The identifier counter wrapped around
    #[error("Identifier space exhausted for {kind} ids")]
    IdentifierSpaceExhausted {
        /// Which kind of id ran out
        kind: &'static str,
    },

    /// A resource cannot be removed while instances reference it
    #[error("Resource {resource} still has {live_instances} live instance(s)")]
    ResourceInUse {
        /// Display form of the resource id
        resource: String,
        /// Instances still bound to it
        live_instances: usize,
    },

    /// Rotation requested about a zero-length axis
    #[error("Rotation axis has zero length")]
    DegenerateAxis,
}

impl InstancingError {
    /// Build an `InvalidHandle` error for any displayable id
    pub fn invalid_handle(handle: impl std::fmt::Display) -> Self {
        Self::InvalidHandle {
            handle: handle.to_string(),
        }
    }
}

/// Result type for instancing operations
pub type InstancingResult<T> = Result<T, InstancingError>;
