//! # AutoDiag Common Library
//!
//! Shared code for AutoDiag services:
//! - Error types
//! - Bootstrap configuration loading (TOML)
//! - HTTP client identification

pub mod config;
pub mod error;

pub use error::{Error, Result};
