//! Factories that build infrastructure components from configuration.
//!
//! # Submodules
//!
//! - [`storage`] - Storage backend selection and construction

pub mod storage;

pub use storage::{AnyStorage, StorageFactory, StorageType};
