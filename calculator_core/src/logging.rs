use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVES: &str = "calculator_gui=info,calculator_core=info";

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides
/// `default_directives`. Later calls are no-ops.
pub fn init(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init(DEFAULT_DIRECTIVES);
        init("debug");
        tracing::info!("logging initialized");
    }
}
