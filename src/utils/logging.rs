use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::LoggingConfig;
use crate::utils::timing::TIMING_TARGET;

const GENERAL_LOG: &str = "headshot.log";
const GENERAL_JSON_LOG: &str = "headshot.jsonl";
const TIMING_LOG: &str = "timing.log";
const TIMING_JSON_LOG: &str = "timing.jsonl";

/// Flushes the background log writers when dropped; hold it for the life of `main`.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

fn parse_log_level(value: &str) -> LevelFilter {
    match value.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Application events at `level`, with noisy HTTP and bot-framework crates held at WARN.
fn general_targets(level: LevelFilter) -> Targets {
    ["hyper", "hyper_util", "reqwest", "teloxide"]
        .into_iter()
        .fold(Targets::new().with_default(level), |targets, noisy| {
            targets.with_target(noisy, LevelFilter::WARN)
        })
        .with_target(TIMING_TARGET, LevelFilter::OFF)
}

fn timing_targets() -> Targets {
    Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target(TIMING_TARGET, LevelFilter::INFO)
}

fn daily_writer(dir: &Path, file_name: &str, guards: &mut Vec<WorkerGuard>) -> NonBlocking {
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name));
    guards.push(guard);
    writer
}

/// Installs stdout plus daily-rolling text and JSON sinks under `config.logs_dir`.
/// Call before `Config::load` so its warnings are kept.
/// Timing events only reach the timing sinks.
pub fn init_logging(config: &LoggingConfig) -> LoggingGuards {
    let logs_dir = config.logs_dir.as_path();
    if let Err(err) = fs::create_dir_all(logs_dir) {
        eprintln!("Failed to create logs directory {}: {err}", logs_dir.display());
    }

    let mut guards = Vec::with_capacity(4);
    let general = general_targets(parse_log_level(&config.log_level));
    let timing = timing_targets();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(general.clone());
    let general_layer = tracing_subscriber::fmt::layer()
        .with_writer(daily_writer(logs_dir, GENERAL_LOG, &mut guards))
        .with_ansi(false)
        .with_filter(general.clone());
    let general_json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(daily_writer(logs_dir, GENERAL_JSON_LOG, &mut guards))
        .with_filter(general);
    let timing_layer = tracing_subscriber::fmt::layer()
        .with_writer(daily_writer(logs_dir, TIMING_LOG, &mut guards))
        .with_ansi(false)
        .with_filter(timing.clone());
    let timing_json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(daily_writer(logs_dir, TIMING_JSON_LOG, &mut guards))
        .with_filter(timing);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(general_layer)
        .with(general_json_layer)
        .with(timing_layer)
        .with(timing_json_layer)
        .init();

    LoggingGuards { _guards: guards }
}
