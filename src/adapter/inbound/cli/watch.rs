//! `polystore watch`.

use std::path::Path;
use std::thread;

use mongodb::bson::Bson;
use tracing::{info, warn};

use crate::adapter::inbound::cli::output;
use crate::adapter::outbound::mongo::InterruptHandle;
use crate::error::{ConfigError, Error, Result};
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::factory::{StorageFactory, StorageType};
use crate::port::outbound::store::StorageWatcher;

/// Print every document inserted into the collection until Ctrl-C.
///
/// # Errors
/// Returns an error if the configured backend is not the document store,
/// no collection is named, or the watch fails. Interruption ends the
/// command successfully.
pub fn execute_watch<P: AsRef<Path>>(config_path: P, collection: Option<&str>) -> Result<()> {
    let config = Config::load(config_path)?;
    config.init_logging();

    if config.storage.kind.parse::<StorageType>()? != StorageType::Mongo {
        return Err(ConfigError::InvalidValue {
            field: "storage.kind",
            reason: "watch requires the MONGO backend".to_string(),
        }
        .into());
    }
    let mongo = config.storage.mongo.as_ref().ok_or(ConfigError::MissingField {
        field: "storage.mongo",
    })?;
    let collection = collection
        .or(mongo.collection.as_deref())
        .ok_or(ConfigError::MissingField { field: "collection" })?;

    let storage = StorageFactory::mongo(mongo)?;
    storage.set_collection(collection);

    let inserts = storage.consume_inserts()?;
    interrupt_on_ctrl_c(inserts.interrupt_handle());
    output::success(&format!("Watching {collection}"));

    for insert in inserts {
        match insert {
            Ok(document) => output::document(&Bson::Document(document).into_relaxed_extjson()),
            Err(Error::Interrupted) => {
                info!("watch interrupted");
                return Ok(());
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Trip `handle` on Ctrl-C. The signal is awaited on a dedicated runtime
/// so the blocking driver calls stay off any async executor.
fn interrupt_on_ctrl_c(handle: InterruptHandle) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!(error = %err, "signal runtime unavailable");
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            handle.interrupt();
        }
    });
}
