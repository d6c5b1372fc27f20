//! Infrastructure layer.
//!
//! Provides technical concerns that support the storage core without
//! containing storage semantics.
//!
//! # Submodules
//!
//! - [`config`] - Configuration loading and validation
//! - [`factory`] - Storage backend factory

pub mod config;
pub mod factory;
