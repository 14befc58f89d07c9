//! Subscriber setup for the demo binary: a `fern` + `tracing-appender`
//! pairing giving a daily-rolling file sink plus a colored stderr sink for
//! warnings and above. Library code never calls this — it only ever logs
//! through the bare `log` facade — so this lives in `demos`, the one
//! place a concrete subscriber gets installed.

use std::io::Write;
use std::str::FromStr;

use log::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

const MAX_LOG_FILES: usize = 10;

pub fn init_logging(dir: &str, level: &str) -> Result<Vec<Box<dyn Drop + Send + Sync>>, Box<dyn std::error::Error>> {
    let mut guards: Vec<Box<dyn Drop + Send + Sync>> = Vec::new();

    let rolling = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("schema-manager-demo.log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)?;
    let (non_blocking, flush_guard) = tracing_appender::non_blocking(rolling);
    guards.push(Box::new(flush_guard));

    let dispatch_file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] - {} - [{}] {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::from_str(level)?)
        .chain(Box::new(non_blocking) as Box<dyn Write + Send>);

    let dispatch_stderr = fern::Dispatch::new()
        .level(LevelFilter::Warn)
        .format(|out, message, _| {
            out.finish(format_args!("\x1B[{}m{}\x1B[0m", fern::colors::Color::Yellow.to_fg_str(), message))
        })
        .chain(std::io::stderr());

    fern::Dispatch::new().chain(dispatch_file).chain(dispatch_stderr).apply()?;

    Ok(guards)
}
