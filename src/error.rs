//! Crate-wide error taxonomy.
//!
//! Four kinds, matching the policy table: malformed input and missing
//! resources are recoverable (the caller gets an `Err` and decides what to
//! do — abort the tile, skip a feature); numerical degeneracy is *not*
//! surfaced as an error at all, since the documented policy is to apply a
//! fallback and log, not fail. Programmer-error invariant violations are
//! not part of this enum — they panic, per [`crate::diagnostics`]'s
//! module docs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeomError {
    #[error("input malformed: {0}")]
    InputMalformed(String),

    #[error("missing resource: {0}")]
    MissingResource(String),

    #[error("numerical degeneracy could not be resolved: {0}")]
    NumericalDegenerate(String),

    #[error("internal invariant violation: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GeomError>;
