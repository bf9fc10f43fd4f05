pub mod artifacts;
pub mod config;
pub mod encoding;
pub mod engine;
pub mod forest;
pub mod interpret;
pub mod model;
pub mod pages;
pub mod pipeline;
pub mod server;
pub mod synth;
pub mod training;
pub mod tree;
pub mod types;

/// Installs the fmt subscriber used by both binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,animal_health=debug".into()),
        )
        .init();
}
