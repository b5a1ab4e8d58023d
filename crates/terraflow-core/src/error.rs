//! Engine error taxonomy
//!
//! Everything here is a local, recoverable condition reported back to the
//! caller; nothing in the simulation core is allowed to crash the tick
//! loop. Out-of-domain queries return `None` instead of an error.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A quality change requested an unsupported grid size. The prior
    /// resolution is retained.
    #[error("unsupported grid resolution {0}")]
    InvalidResolution(usize),

    /// Pickup rejected: the hand is at capacity. No grid mutation occurred.
    #[error("hand is full")]
    HandFull,

    /// Deposit rejected: the hand has nothing to place. No grid mutation
    /// occurred.
    #[error("hand is empty")]
    HandEmpty,

    /// Removal of a source id that is not registered.
    #[error("no source with id {0}")]
    SourceNotFound(u64),
}
