use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber. `RUST_LOG` overrides `verbosity`
/// (0 = info, 1 = debug, 2+ = trace). Returns false if one was already installed.
pub fn init(verbosity: u8, ansi: bool) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_target(false)
        .with_ansi(ansi)
        .try_init()
        .is_ok()
}

/// Same as [`init`] but emitting one JSON object per event.
pub fn init_json(verbosity: u8) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(verbosity))
        .try_init()
        .is_ok()
}

fn filter(verbosity: u8) -> EnvFilter {
    let log_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}
