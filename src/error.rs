//! Error types for the FURIA engine.
//!
//! Mirrors the plain, per-kind `thiserror` enums used throughout the
//! numerical crates this engine is built from: one variant per failure
//! kind, a human-readable message, no hidden panics on well-formed input.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FuriaError {
    #[error("unknown option or unparsable value: {0}")]
    Config(String),

    #[error("capability violated: {0}")]
    Capability(String),

    #[error("description length computation produced a non-finite value: {0}")]
    Numerical(String),
}
