use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DISCO_LOG";

/// Install a stderr fmt subscriber.
///
/// `-v`/`-vv` select `info`/`debug`. Without them the `DISCO_LOG` directive
/// is honoured first, then `RUST_LOG`, then `warn`.
pub fn init(verbosity: u8) {
    let filter = match verbosity {
        0 => match std::env::var(LOG_ENV) {
            Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
                eprintln!("invalid {LOG_ENV} directive ({err}); defaulting to warn");
                EnvFilter::new("warn")
            }),
            Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        },
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}
