use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber writing to stdout. `RUST_LOG` wins over
/// `default_filter`.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init(default_filter: &str) {
    install(default_filter, std::io::stdout);
}

/// Same as [`init`] but logs to stderr, for binaries whose stdout is data
pub fn init_stderr(default_filter: &str) {
    install(default_filter, std::io::stderr);
}

fn install<W>(default_filter: &str, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let layer = fmt::layer().with_writer(writer).with_target(false);

    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
