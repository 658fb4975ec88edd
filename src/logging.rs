use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

/// Log file used by the interactive client so output does not interleave
/// with the rendered conversation
pub fn default_log_file() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("oswald-client")
        .join("client.log")
}

pub fn setup_logging(verbose_level: u8, log_file: Option<PathBuf>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let filter_str = match verbose_level {
            0 => "warn,oswald_client=info",
            1 => "info,oswald_client=debug",
            _ => "debug,oswald_client=trace",
        };
        tracing_subscriber::EnvFilter::new(filter_str)
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true);

    let file = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!(
                    "Warning: Could not open log file {:?} ({}), logging to stderr",
                    path, e
                );
                None
            }
        }
    });

    match file {
        Some(file) => subscriber
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        None => subscriber.with_writer(io::stderr).init(),
    }
}
