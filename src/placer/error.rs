//! Errors that abort a placement run.

use thiserror::Error;

/// A fatal placement error. Nothing is written back when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaceError {
    #[error("component {reference} has an invalid footprint size ({width} x {height})")]
    InvalidGeometry {
        reference: String,
        width: f64,
        height: f64,
    },

    #[error("component {reference} has a non-finite position")]
    InvalidPosition { reference: String },

    #[error("component reference {0} appears more than once")]
    DuplicateReference(String),
}
