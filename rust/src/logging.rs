use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Mutex, Once};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "shopfloor.log";

static INIT: Once = Once::new();

/// Installs the process-wide subscriber. Later calls (another `FfiApp`, tests) are no-ops.
pub(crate) fn init_logging(data_dir: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let stderr = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);

        let file_layer = match open_log_file(data_dir) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(err) => {
                eprintln!("log file in {data_dir} unavailable: {err}");
                None
            }
        };

        // Another subscriber may already be installed by the embedding process.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stderr)
            .with(file_layer)
            .try_init();
    });
}

fn open_log_file(data_dir: &str) -> std::io::Result<File> {
    std::fs::create_dir_all(data_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(Path::new(data_dir).join(LOG_FILE_NAME))
}
