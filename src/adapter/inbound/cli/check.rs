//! `polystore check`.

use std::path::Path;

use crate::adapter::inbound::cli::output;
use crate::error::{Error, Result};
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::factory::StorageFactory;

/// Load the configuration, connect the configured backend and run its
/// health check.
///
/// # Errors
/// Returns the configuration or factory error, or [`Error::Storage`] when
/// the backend is unreachable.
pub fn execute_check<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    let config = Config::load(path)?;
    config.init_logging();

    output::section("Storage Check");
    output::field("Config", path.display());
    output::field("Kind", &config.storage.kind);

    if StorageFactory::probe(&config.storage)? {
        output::success("Storage is healthy");
        Ok(())
    } else {
        output::error("Storage health check failed");
        Err(Error::Storage("health check failed".to_string()))
    }
}
