//! SQLite database modules.
//!
//! Provides connection management, schema initialisation and the model
//! trait rows implement to be stored by the relational backend.

pub mod connection;
pub mod model;
