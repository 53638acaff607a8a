use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub fn tracing_log_path() -> PathBuf {
    env::var("WAVREC_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("wavrec_trace.jsonl"))
}

/// Install the global subscriber once. `--logs` writes JSON lines to
/// [`tracing_log_path`]; `--verbose` writes human-readable lines to stderr.
pub fn init_tracing(config: &AppConfig) {
    if config.no_logs || (!config.logs && config.verbose == 0) {
        return;
    }
    // --logs alone records debug detail.
    let level = match config.verbose {
        0 | 2 => Level::DEBUG,
        1 => Level::INFO,
        _ => Level::TRACE,
    };

    let _ = TRACING_INIT.get_or_init(|| {
        if config.logs {
            let path = tracing_log_path();
            let file = match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => file,
                Err(_) => return,
            };
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_max_level(level)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        } else {
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_timer(UtcTime::rfc_3339())
                .with_target(false)
                .with_writer(io::stderr)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    });
}
