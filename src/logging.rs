use std::fs::File;
use std::str::FromStr;

use config::Config;
use env_logger::{Builder, WriteStyle};
use log::LevelFilter;

use crate::error::{PacServeError, Result};

/// Initializes logging at the given level.
///
/// Output goes to stderr unless a `logging.log_file` key is present in an
/// optional `config`/`config.local` file, in which case log lines are piped
/// there instead. A log file that cannot be created falls back to stderr.
pub fn init_logging(level: &str) -> Result<()> {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);

    let mut builder = Builder::new();
    builder.filter_level(level);
    builder.write_style(WriteStyle::Always);

    if let Some(path) = log_file_from_config()? {
        match File::create(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Could not open log file {}: {}. Logging to stderr.", path, e);
            }
        }
    }

    builder.init();
    Ok(())
}

fn log_file_from_config() -> Result<Option<String>> {
    let config = Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::File::with_name("config.local").required(false))
        .build()
        .map_err(|e| PacServeError::Logging(format!("failed to build config: {}", e)))?;

    Ok(config.get::<String>("logging.log_file").ok())
}
