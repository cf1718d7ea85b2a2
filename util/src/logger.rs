//! Logger setup
//!
//! The console only ever shows `INFO` and above, the 20 Hz cycle traces go to
//! the session log file alone.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info, Record};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Most verbose level written to stdout.
const CONSOLE_LEVEL: LevelFilter = LevelFilter::Info;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The file log level must include INFO, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Could not open the session log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("Could not install the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Install the logger for this run.
///
/// `file_level` applies to the session log file. It must be at least as
/// verbose as `INFO` since hazard latches and mode changes are logged at info
/// and warn. Can only be called once per process.
pub fn logger_init(
    file_level: LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if file_level < LevelFilter::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(file_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let console = fern::Dispatch::new()
        .level(CONSOLE_LEVEL)
        .chain(std::io::stdout());

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{} {}", prefix(record), message))
        })
        .level(file_level)
        .chain(console)
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logger up, file level {:?}, console level {:?}", file_level, CONSOLE_LEVEL);
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log file: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// `[elapsed LVL]`, plus the module path for debug and trace records.
fn prefix(record: &Record) -> String {
    let stamp = format!(
        "[{:10.6} {}]",
        session::get_elapsed_seconds(),
        level_tag(record.level())
    );

    if record.level() > log::Level::Info {
        format!("{} {}:", stamp, record.target())
    }
    else {
        stamp
    }
}

fn level_tag(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info  => "INF".normal(),
        log::Level::Warn  => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold()
    }
}
