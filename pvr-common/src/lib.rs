//! # PVR Common Library
//!
//! Shared code for the PVR (Property Value Resolver) services:
//! - Error and result types
//! - TOML configuration loading
//! - Provider credential resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
