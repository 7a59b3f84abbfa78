use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, filter, fmt};

/// Installs the stderr subscriber for the playground crates.
///
/// `verbose` lowers the threshold from `WARN` to `DEBUG`, which shows every
/// external command line and the boot poll ticks.
pub fn init(verbose: bool) {
    let max_level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = tracing_subscriber::Registry::default().with(
        fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter::filter_fn(move |metadata| {
                metadata.target().starts_with("playground") && *metadata.level() <= max_level
            })),
    );

    // Only fails if a subscriber is already installed.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
