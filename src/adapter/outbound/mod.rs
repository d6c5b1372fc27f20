//! Outbound adapters (driven side).

pub mod mongo;
pub mod sqlite;
