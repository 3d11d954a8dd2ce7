pub mod core;

use tracing_subscriber::EnvFilter;

/// Install the global log subscriber. `RUST_LOG` overrides the default
/// filter. Calling it again is a no-op.
pub fn init_tracing() {
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,interface_core=debug")),
        )
        .try_init();

    if result.is_ok() {
        tracing::info!("InterfaceOficial core starting...");
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_tracing_twice_is_harmless() {
        super::init_tracing();
        super::init_tracing();
    }
}
