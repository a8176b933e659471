// In: src/logging.rs

//! One-time installation of the `env_logger` backend behind the `log` facade.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::error::EaggrError;

static INIT_LOGGER: Once = Once::new();

/// Installs a logger printing `[LEVEL] message` lines at `level`, either to
/// stderr or appended to `log_file`.
///
/// Only the first call in a process has any effect. If another logger was
/// already installed by the host application it is left in place.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), EaggrError> {
    // Open the file up front so a bad path surfaces as an error instead of
    // being swallowed inside `call_once`.
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
