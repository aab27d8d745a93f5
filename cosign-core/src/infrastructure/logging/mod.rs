//! Logging setup on `log` + `log4rs`.

mod consts;

pub use consts::*;

use crate::foundation::{CosignError, Result};
use crate::infrastructure::config::LoggingConfig;
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            policy::compound::{roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
    },
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::io::IsTerminal;
use std::path::Path;

const CONSOLE_APPENDER: &str = "stderr";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

pub fn init_from_config(config: &LoggingConfig) -> Result<()> {
    init_logger(config.log_dir.as_deref(), &config.filters.join(","))
}

/// Install the global logger. Console output goes to stderr; with `log_dir` set,
/// `cosign.log` and `cosign_err.log` roll in that directory.
///
/// `filters` is a comma list: a bare level sets the app level (default INFO),
/// `<module>=<level>` opts a module in, `root=<level>` opts in every crate.
///
/// Repeated calls keep the first logger.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<()> {
    let app_level = parse_app_level(filters);
    let root_level = parse_root_override(filters).unwrap_or(LevelFilter::Off);
    let module_levels = parse_module_levels(filters);

    let console_pattern = if std::io::stderr().is_terminal() { LOG_LINE_PATTERN_COLORED } else { LOG_LINE_PATTERN };
    let console =
        ConsoleAppender::builder().target(Target::Stderr).encoder(Box::new(PatternEncoder::new(console_pattern))).build();

    let mut builder = Config::builder().appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(console)));
    let mut appenders: Vec<String> = vec![CONSOLE_APPENDER.to_string()];

    if let Some(dir) = log_dir.map(str::trim).filter(|s| !s.is_empty()) {
        let dir = Path::new(dir);
        builder = builder.appender(Appender::builder().build(LOG_FILE_APPENDER, Box::new(rolling_file(dir, LOG_FILE_NAME)?)));
        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Warn)))
                .build(ERR_LOG_FILE_APPENDER, Box::new(rolling_file(dir, ERR_LOG_FILE_NAME)?)),
        );
        appenders.push(LOG_FILE_APPENDER.to_string());
        appenders.push(ERR_LOG_FILE_APPENDER.to_string());
    }

    for crate_name in WHITELISTED_CRATES {
        if !module_levels.iter().any(|(m, _)| m == crate_name) {
            builder = builder.logger(Logger::builder().appenders(appenders.clone()).additive(false).build(*crate_name, app_level));
        }
    }
    // explicit module levels win over the whitelist
    for (module, level) in &module_levels {
        builder = builder.logger(Logger::builder().appenders(appenders.clone()).additive(false).build(module, *level));
    }

    let config = builder
        .build(Root::builder().appenders(appenders).build(root_level))
        .map_err(|err| CosignError::ConfigError(format!("invalid logger config: {err}")))?;
    let _ = log4rs::init_config(config);
    Ok(())
}

fn rolling_file(dir: &Path, file_name: &str) -> Result<RollingFileAppender> {
    let archive_pattern = dir.join(format!("{file_name}.{{}}.gz"));
    let archive_pattern = archive_pattern
        .to_str()
        .ok_or_else(|| CosignError::ConfigError(format!("log directory is not valid UTF-8: {}", dir.display())))?;
    let roller = FixedWindowRoller::builder()
        .base(1)
        .build(archive_pattern, LOG_FILE_MAX_ROLLS)
        .map_err(|err| CosignError::ConfigError(format!("log roller: {err}")))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(LOG_FILE_MAX_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN)))
        .build(dir.join(file_name), Box::new(policy))
        .map_err(|err| CosignError::StorageError { operation: "open_log_file".to_string(), details: err.to_string() })
}

fn parse_app_level(filters: &str) -> LevelFilter {
    filters
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty() && !part.contains('='))
        .find_map(|part| part.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

fn parse_root_override(filters: &str) -> Option<LevelFilter> {
    filters.split(',').find_map(|part| {
        let (module, level) = part.trim().split_once('=')?;
        if module.trim() != "root" {
            return None;
        }
        level.trim().parse().ok()
    })
}

fn parse_module_levels(filters: &str) -> Vec<(String, LevelFilter)> {
    filters
        .split(',')
        .filter_map(|part| {
            let (module, level) = part.trim().split_once('=')?;
            let module = module.trim();
            if module.is_empty() || module == "root" {
                return None;
            }
            Some((module.to_string(), level.trim().parse().ok()?))
        })
        .collect()
}
