#![deny(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # objmap-value
//!
//! Generic value tree consumed by the objmap mapping engine.
//!
//! A [`Value`] is what a parsing layer hands over after reading a JSON (or
//! any serde-compatible) payload: nulls, booleans, numbers, strings,
//! sequences and insertion-ordered maps. The tree carries no type
//! information beyond that; the mapping engine decides what each node
//! becomes.

/// JSON bridge between `serde_json` and the generic tree.
pub mod json;
/// Field paths used for lookups and error reporting.
pub mod path;
/// Core generic value model.
pub mod value;

/// Field path primitives.
pub use path::{Path, Segment};
/// Generic value primitives.
pub use value::{Map, Number, Value};

use thiserror::Error;

/// Errors that can occur when working with generic values
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for value operations.
pub type Result<T> = std::result::Result<T, Error>;
