pub mod block_classifier;
pub mod error;
pub mod geometry;
pub mod model;

pub use error::{PipelineError, Stage};

/// Installs the global tracing subscriber.
///
/// Logs go to stderr so JSON written to stdout stays machine-readable. The
/// filter defaults to `info` and honours `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
